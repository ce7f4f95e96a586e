//! Postgres-backed cart snapshot store.
//!
//! One row per identity in `followup.customer_carts`. Registered customers
//! are keyed by `user_id`, guests by `user_email`; the unused key column
//! holds its zero value (`0` / `''`) for the other kind. The upsert is a
//! read-then-write sequence: under concurrent updates of the same identity
//! last-write-wins, which is acceptable for an advisory snapshot.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{instrument, warn};

use followup_core::CartIdentity;

use super::RepositoryError;
use crate::models::cart::{decode_items, encode_items};
use crate::models::{CartContents, CartSnapshot, VisitorContext};
use crate::snapshot::CartSnapshotStore;

/// Snapshot store over `followup.customer_carts`.
#[derive(Clone)]
pub struct PgCartSnapshotStore {
    pool: PgPool,
}

impl PgCartSnapshotStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn existing_row_id(&self, identity: &CartIdentity) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = match identity {
            CartIdentity::Customer(user_id) => {
                sqlx::query_as("SELECT id FROM followup.customer_carts WHERE user_id = $1")
                    .bind(user_id.get())
                    .fetch_optional(&self.pool)
                    .await?
            }
            CartIdentity::Guest(email) => {
                sqlx::query_as("SELECT id FROM followup.customer_carts WHERE user_email = $1")
                    .bind(email.as_str())
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(row.map(|(id,)| id))
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    first_name: String,
    last_name: String,
    cart_items: String,
    cart_total: Decimal,
    date_updated: DateTime<Utc>,
}

#[async_trait]
impl CartSnapshotStore for PgCartSnapshotStore {
    #[instrument(skip(self, visitor, cart), fields(identity = ?visitor.identity()))]
    async fn upsert(
        &self,
        visitor: &VisitorContext,
        cart: &CartContents,
    ) -> Result<(), RepositoryError> {
        let Some(identity) = visitor.identity() else {
            return Ok(());
        };

        let user_id = identity.user_id().map_or(0, followup_core::UserId::get);
        let user_email = identity.guest_email().map_or("", followup_core::Email::as_str);
        let cart_items = encode_items(&cart.items)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let now = Utc::now();

        match self.existing_row_id(&identity).await? {
            Some(row_id) => {
                sqlx::query(
                    r"
                    UPDATE followup.customer_carts
                    SET user_id = $2, user_email = $3, first_name = $4, last_name = $5,
                        cart_items = $6, cart_total = $7, date_updated = $8
                    WHERE id = $1
                    ",
                )
                .bind(row_id)
                .bind(user_id)
                .bind(user_email)
                .bind(&visitor.first_name)
                .bind(&visitor.last_name)
                .bind(&cart_items)
                .bind(cart.total)
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
            None => {
                sqlx::query(
                    r"
                    INSERT INTO followup.customer_carts
                        (user_id, user_email, first_name, last_name, cart_items, cart_total, date_updated)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    ",
                )
                .bind(user_id)
                .bind(user_email)
                .bind(&visitor.first_name)
                .bind(&visitor.last_name)
                .bind(&cart_items)
                .bind(cart.total)
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    async fn fetch(
        &self,
        identity: &CartIdentity,
    ) -> Result<Option<CartSnapshot>, RepositoryError> {
        let row: Option<CartRow> = match identity {
            CartIdentity::Customer(user_id) => {
                sqlx::query_as(
                    r"
                    SELECT first_name, last_name, cart_items, cart_total, date_updated
                    FROM followup.customer_carts
                    WHERE user_id = $1
                    ",
                )
                .bind(user_id.get())
                .fetch_optional(&self.pool)
                .await?
            }
            CartIdentity::Guest(email) => {
                sqlx::query_as(
                    r"
                    SELECT first_name, last_name, cart_items, cart_total, date_updated
                    FROM followup.customer_carts
                    WHERE user_email = $1
                    ",
                )
                .bind(email.as_str())
                .fetch_optional(&self.pool)
                .await?
            }
        };

        let Some(row) = row else {
            return Ok(None);
        };

        // Undecodable items read as no snapshot, not as a failure.
        let Some(items) = decode_items(&row.cart_items) else {
            warn!(%identity, "stored cart items failed to decode; treating as absent");
            return Ok(None);
        };

        Ok(Some(CartSnapshot {
            identity: identity.clone(),
            first_name: row.first_name,
            last_name: row.last_name,
            items,
            total: row.cart_total,
            date_updated: row.date_updated,
        }))
    }

    async fn touch(
        &self,
        identity: &CartIdentity,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        match identity {
            CartIdentity::Customer(user_id) => {
                sqlx::query(
                    "UPDATE followup.customer_carts SET date_updated = $2 WHERE user_id = $1",
                )
                .bind(user_id.get())
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
            CartIdentity::Guest(email) => {
                sqlx::query(
                    "UPDATE followup.customer_carts SET date_updated = $2 WHERE user_email = $1",
                )
                .bind(email.as_str())
                .bind(now)
                .execute(&self.pool)
                .await?;
            }
        }
        Ok(())
    }
}
