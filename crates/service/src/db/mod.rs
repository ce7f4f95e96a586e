//! Database operations for the follow-up `PostgreSQL` store.
//!
//! # Tables
//!
//! Owned by this service (see `migrations/`):
//!
//! - `followup.customer_carts` - one durable cart snapshot per identity
//! - `followup.customer_meta` - per-customer key/value state (dedup marks)
//!
//! Owned by the commerce platform and only read or narrowly mutated here:
//!
//! - `platform.sessions` - serialized visitor sessions, keyed by session key
//! - `platform.customer_meta` - customer profile state (remembered cart)
//! - `platform.orders` / `platform.order_meta` - orders and their
//!   annotations (renewal flag, conversion credit)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/service/migrations/` and run via
//! `sqlx migrate run` against the service database. They are NOT run
//! automatically on startup.

pub mod carts;
pub mod meta;
pub mod platform;
pub mod sessions;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
