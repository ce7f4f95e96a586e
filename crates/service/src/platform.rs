//! Narrow mutations against platform-owned customer state.
//!
//! Used only by the operator-clear path: the platform keeps a "remembered
//! cart" marker on the customer profile and an embedded cart inside its
//! serialized session row; clearing a customer's cart emails also wipes
//! both so the cart does not resurrect on the next visit.

use async_trait::async_trait;

use followup_core::UserId;

use crate::db::RepositoryError;

/// Platform-owned per-customer cart remnants.
#[async_trait]
pub trait PlatformStore: Send + Sync {
    /// Delete the customer's remembered-cart marker, if present.
    async fn clear_remembered_cart(&self, user_id: UserId) -> Result<(), RepositoryError>;

    /// Rewrite the `cart` field of the customer's persisted session row to
    /// empty, in place, leaving every other session key untouched. Missing
    /// or undecodable session rows are skipped silently.
    async fn clear_session_cart(&self, user_id: UserId) -> Result<(), RepositoryError>;
}
