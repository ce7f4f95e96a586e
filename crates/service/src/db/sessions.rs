//! Postgres view of the platform's persisted sessions.
//!
//! The platform serializes each visitor session into one row of
//! `platform.sessions` (`session_key`, `session_value`). This store gives
//! the service the same visitor-scoped get/set contract the live session
//! offers, by reading and rewriting the JSON blob. Writes touch only the
//! requested key; everything else in the blob is carried through untouched.

use async_trait::async_trait;
use sqlx::PgPool;

use super::RepositoryError;
use crate::sessions::SessionStore;

/// Session access scoped to one session key.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
    session_key: String,
}

impl PgSessionStore {
    #[must_use]
    pub const fn new(pool: PgPool, session_key: String) -> Self {
        Self { pool, session_key }
    }

    /// The decoded session blob, or `None` when the row is missing or the
    /// blob does not parse as a JSON object.
    async fn blob(&self) -> Result<Option<serde_json::Map<String, serde_json::Value>>, sqlx::Error>
    {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT session_value FROM platform.sessions WHERE session_key = $1")
                .bind(&self.session_key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.and_then(|(raw,)| match serde_json::from_str(&raw) {
            Ok(serde_json::Value::Object(map)) => Some(map),
            _ => None,
        }))
    }

    async fn write_blob(
        &self,
        blob: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), RepositoryError> {
        let raw = serde_json::to_string(blob)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO platform.sessions (session_key, session_value)
            VALUES ($1, $2)
            ON CONFLICT (session_key) DO UPDATE SET session_value = EXCLUDED.session_value
            ",
        )
        .bind(&self.session_key)
        .bind(&raw)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, RepositoryError> {
        Ok(self.blob().await?.and_then(|map| map.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), RepositoryError> {
        let mut blob = self.blob().await?.unwrap_or_default();
        blob.insert(key.to_owned(), value);
        self.write_blob(&blob).await
    }
}
