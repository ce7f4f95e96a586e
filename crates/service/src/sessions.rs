//! Visitor-scoped session storage contract.
//!
//! The commerce platform owns the live session; this service only needs a
//! narrow JSON get/set view of it to persist guest-side state (the dedup
//! marks). The framework-integration layer hands the core an implementation
//! scoped to the current visitor; the service's own Postgres-backed view of
//! the persisted session rows lives in [`crate::db::sessions`].

use async_trait::async_trait;

use crate::db::RepositoryError;

/// JSON key/value access scoped to one visitor's session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a value from the session. Absent keys - and corrupt session
    /// blobs - read as `None`.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, RepositoryError>;

    /// Write a value into the session, leaving unrelated keys untouched.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), RepositoryError>;
}
