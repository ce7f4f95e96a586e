//! Durable cart snapshot storage contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use followup_core::CartIdentity;

use crate::db::RepositoryError;
use crate::models::{CartContents, CartSnapshot, VisitorContext};

/// One stored cart per identity: overwritten on every mutation, never
/// appended, never automatically deleted.
#[async_trait]
pub trait CartSnapshotStore: Send + Sync {
    /// Insert or overwrite the visitor's snapshot with the given cart,
    /// stamping a fresh `date_updated`. Silently does nothing when the
    /// visitor has no identity - there is nothing addressable to store.
    async fn upsert(
        &self,
        visitor: &VisitorContext,
        cart: &CartContents,
    ) -> Result<(), RepositoryError>;

    /// Exact lookup by identity. A missing row - or one whose stored items
    /// fail to decode - reads as `None`.
    async fn fetch(&self, identity: &CartIdentity)
    -> Result<Option<CartSnapshot>, RepositoryError>;

    /// Record a fresh `date_updated` without touching the stored items.
    /// Does nothing when no snapshot exists.
    async fn touch(
        &self,
        identity: &CartIdentity,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;
}
