//! Duplicate-send gate for cart follow-up emails.
//!
//! Once an email referencing a product has been queued for a cart, the
//! `(email, product)` pair is marked against the cart's identity and never
//! queued again for the same cart state. The set is a gate only: membership
//! means "the scheduler already has this one" - it is never read to decide
//! what to schedule, only what to skip.
//!
//! Guests keep their marks in the visitor session; registered customers in
//! durable per-user storage. Both sit behind the same [`DedupStore`]
//! contract so the orchestrator does not care which backs a given identity.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use followup_core::{CartIdentity, EmailId, ProductId};

use crate::db::RepositoryError;
use crate::sessions::SessionStore;

/// Session key holding the guest-side marks.
pub const MARKS_SESSION_KEY: &str = "cart_email_marks";

/// One already-queued (follow-up email, product) combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub email_id: EmailId,
    pub product_id: ProductId,
}

impl DedupKey {
    #[must_use]
    pub const fn new(email_id: EmailId, product_id: ProductId) -> Self {
        Self {
            email_id,
            product_id,
        }
    }
}

/// The full mark set for one identity.
pub type DedupSet = HashSet<DedupKey>;

/// Get/set contract for an identity's mark set.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Load the mark set. A missing or corrupt stored set reads as empty.
    async fn load(&self, identity: &CartIdentity) -> Result<DedupSet, RepositoryError>;

    /// Replace the mark set wholesale.
    async fn save(&self, identity: &CartIdentity, marks: &DedupSet) -> Result<(), RepositoryError>;
}

/// Mark bookkeeping over a [`DedupStore`].
#[derive(Clone)]
pub struct DedupTracker {
    store: Arc<dyn DedupStore>,
}

impl DedupTracker {
    #[must_use]
    pub fn new(store: Arc<dyn DedupStore>) -> Self {
        Self { store }
    }

    /// The identity's current marks.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backing store fails.
    pub async fn marks(&self, identity: &CartIdentity) -> Result<DedupSet, RepositoryError> {
        self.store.load(identity).await
    }

    /// Record one queued pair.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backing store fails.
    pub async fn mark(&self, identity: &CartIdentity, key: DedupKey) -> Result<(), RepositoryError> {
        self.mark_all(identity, std::iter::once(key)).await
    }

    /// Record a batch of queued pairs in one load/save round trip.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backing store fails.
    pub async fn mark_all<I>(&self, identity: &CartIdentity, keys: I) -> Result<(), RepositoryError>
    where
        I: IntoIterator<Item = DedupKey> + Send,
    {
        let mut marks = self.store.load(identity).await?;
        marks.extend(keys);
        self.store.save(identity, &marks).await
    }

    /// Has this pair already been queued for this cart?
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backing store fails.
    pub async fn already_marked(
        &self,
        identity: &CartIdentity,
        key: DedupKey,
    ) -> Result<bool, RepositoryError> {
        Ok(self.store.load(identity).await?.contains(&key))
    }

    /// Clear the identity's whole set (cart emptied, checkout, operator).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the backing store fails.
    pub async fn reset(&self, identity: &CartIdentity) -> Result<(), RepositoryError> {
        self.store.save(identity, &DedupSet::new()).await
    }
}

/// Guest-side store: marks live under [`MARKS_SESSION_KEY`] in the visitor's
/// session. Corrupt session values read as an empty set.
pub struct SessionDedupStore<S> {
    session: S,
}

impl<S: SessionStore> SessionDedupStore<S> {
    #[must_use]
    pub const fn new(session: S) -> Self {
        Self { session }
    }
}

#[async_trait]
impl<S: SessionStore> DedupStore for SessionDedupStore<S> {
    async fn load(&self, _identity: &CartIdentity) -> Result<DedupSet, RepositoryError> {
        let value = self.session.get(MARKS_SESSION_KEY).await?;
        Ok(value
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default())
    }

    async fn save(&self, _identity: &CartIdentity, marks: &DedupSet) -> Result<(), RepositoryError> {
        let value = serde_json::to_value(marks)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        self.session.set(MARKS_SESSION_KEY, value).await
    }
}
