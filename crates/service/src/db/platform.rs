//! Reads and narrow mutations against platform-owned tables.
//!
//! Orders, their annotations, and the per-customer cart remnants all belong
//! to the commerce platform; this module touches exactly the rows these
//! operations need and nothing else.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{instrument, warn};

use followup_core::{Email, EmailId, OrderId, UserId};

use super::RepositoryError;
use crate::orders::{OrderCustomer, OrderDirectory};
use crate::platform::PlatformStore;

/// Order meta key flagging a subscription renewal.
const RENEWAL_META_KEY: &str = "subscription_renewal";

/// Order meta key holding the credited follow-up email id.
const CONVERSION_META_KEY: &str = "conversion_email";

/// Customer meta key for the platform's remembered-cart marker.
const REMEMBERED_CART_META_KEY: &str = "remembered_cart";

/// Order lookups over `platform.orders` / `platform.order_meta`.
#[derive(Clone)]
pub struct PgOrderDirectory {
    pool: PgPool,
}

impl PgOrderDirectory {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn order_meta(
        &self,
        order_id: OrderId,
        meta_key: &str,
    ) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT meta_value FROM platform.order_meta WHERE order_id = $1 AND meta_key = $2",
        )
        .bind(order_id.get())
        .bind(meta_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(value,)| value))
    }
}

#[async_trait]
impl OrderDirectory for PgOrderDirectory {
    async fn resolve_customer(
        &self,
        order_id: OrderId,
    ) -> Result<Option<OrderCustomer>, RepositoryError> {
        let row: Option<(Option<i64>, Option<String>)> =
            sqlx::query_as("SELECT user_id, billing_email FROM platform.orders WHERE id = $1")
                .bind(order_id.get())
                .fetch_optional(&self.pool)
                .await?;

        let Some((user_id, billing_email)) = row else {
            return Ok(None);
        };

        let user_id = user_id.filter(|id| *id > 0).map(UserId::new);
        // An unparseable stored address is an unresolvable customer, not a
        // fatal error.
        let billing_email = billing_email.as_deref().and_then(|raw| {
            Email::parse(raw)
                .map_err(|e| warn!(%order_id, error = %e, "order billing email is invalid"))
                .ok()
        });

        Ok(Some(OrderCustomer {
            user_id,
            billing_email,
        }))
    }

    async fn is_subscription_renewal(&self, order_id: OrderId) -> Result<bool, RepositoryError> {
        let value = self.order_meta(order_id, RENEWAL_META_KEY).await?;
        Ok(value.is_some_and(|v| !v.is_empty() && v != "0"))
    }

    async fn conversion_email(
        &self,
        order_id: OrderId,
    ) -> Result<Option<EmailId>, RepositoryError> {
        let value = self.order_meta(order_id, CONVERSION_META_KEY).await?;
        Ok(value.and_then(|v| v.parse::<i64>().ok()).map(EmailId::new))
    }

    #[instrument(skip(self))]
    async fn record_conversion(
        &self,
        order_id: OrderId,
        email_id: EmailId,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO platform.order_meta (order_id, meta_key, meta_value)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_id, meta_key) DO UPDATE SET meta_value = EXCLUDED.meta_value
            ",
        )
        .bind(order_id.get())
        .bind(CONVERSION_META_KEY)
        .bind(email_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Platform customer-state mutations over `platform.customer_meta` and
/// `platform.sessions`.
#[derive(Clone)]
pub struct PgPlatformStore {
    pool: PgPool,
}

impl PgPlatformStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlatformStore for PgPlatformStore {
    async fn clear_remembered_cart(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM platform.customer_meta WHERE user_id = $1 AND meta_key = $2")
            .bind(user_id.get())
            .bind(REMEMBERED_CART_META_KEY)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn clear_session_cart(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let session_key = user_id.to_string();

        let row: Option<(String,)> =
            sqlx::query_as("SELECT session_value FROM platform.sessions WHERE session_key = $1")
                .bind(&session_key)
                .fetch_optional(&self.pool)
                .await?;

        let Some((raw,)) = row else {
            return Ok(());
        };

        // Only rewrite blobs we can actually decode, and only the cart key.
        let Ok(serde_json::Value::Object(mut blob)) = serde_json::from_str(&raw) else {
            warn!(%user_id, "session blob failed to decode; leaving it alone");
            return Ok(());
        };

        if !blob.contains_key("cart") {
            return Ok(());
        }

        blob.insert("cart".to_owned(), serde_json::json!({}));
        let rewritten = serde_json::to_string(&blob)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        sqlx::query("UPDATE platform.sessions SET session_value = $2 WHERE session_key = $1")
            .bind(&session_key)
            .bind(&rewritten)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
