//! Postgres-backed dedup mark storage.
//!
//! Registered customers get a durable row in `followup.customer_meta`;
//! guest marks live inside the platform's persisted session blob, keyed by
//! the guest email, through [`PgSessionStore`]. Both sides read corrupt
//! stored sets as empty.

use async_trait::async_trait;
use sqlx::PgPool;

use followup_core::CartIdentity;

use super::RepositoryError;
use super::sessions::PgSessionStore;
use crate::dedup::{DedupSet, DedupStore, MARKS_SESSION_KEY};

/// Meta key under which a customer's marks are stored.
const MARKS_META_KEY: &str = "cart_email_marks";

/// Dedup store routing registered customers to `followup.customer_meta`
/// and guests to their persisted session row.
#[derive(Clone)]
pub struct PgDedupStore {
    pool: PgPool,
}

impl PgDedupStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn guest_session(&self, email: &followup_core::Email) -> PgSessionStore {
        PgSessionStore::new(self.pool.clone(), email.as_str().to_owned())
    }
}

#[async_trait]
impl DedupStore for PgDedupStore {
    async fn load(&self, identity: &CartIdentity) -> Result<DedupSet, RepositoryError> {
        match identity {
            CartIdentity::Customer(user_id) => {
                let row: Option<(String,)> = sqlx::query_as(
                    r"
                    SELECT meta_value FROM followup.customer_meta
                    WHERE user_id = $1 AND meta_key = $2
                    ",
                )
                .bind(user_id.get())
                .bind(MARKS_META_KEY)
                .fetch_optional(&self.pool)
                .await?;

                Ok(row
                    .and_then(|(raw,)| serde_json::from_str(&raw).ok())
                    .unwrap_or_default())
            }
            CartIdentity::Guest(email) => {
                use crate::sessions::SessionStore;

                let value = self.guest_session(email).get(MARKS_SESSION_KEY).await?;
                Ok(value
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default())
            }
        }
    }

    async fn save(&self, identity: &CartIdentity, marks: &DedupSet) -> Result<(), RepositoryError> {
        match identity {
            CartIdentity::Customer(user_id) => {
                let raw = serde_json::to_string(marks)
                    .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

                sqlx::query(
                    r"
                    INSERT INTO followup.customer_meta (user_id, meta_key, meta_value)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (user_id, meta_key) DO UPDATE SET meta_value = EXCLUDED.meta_value
                    ",
                )
                .bind(user_id.get())
                .bind(MARKS_META_KEY)
                .bind(&raw)
                .execute(&self.pool)
                .await?;

                Ok(())
            }
            CartIdentity::Guest(email) => {
                use crate::sessions::SessionStore;

                let value = serde_json::to_value(marks)
                    .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
                self.guest_session(email).set(MARKS_SESSION_KEY, value).await
            }
        }
    }
}
