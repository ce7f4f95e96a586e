//! Cart lifecycle orchestration.
//!
//! One method per lifecycle event the platform relays: cart updated, cart
//! emptied, order finalized, operator clear. Each takes an explicit visitor
//! or identity plus the cart contents in play; nothing is read from ambient
//! state. Unidentified visitors short-circuit every path - anonymous carts
//! are never tracked.
//!
//! Every handler is idempotent: re-running one with the same inputs
//! converges to the same stored state, at worst repeating a delete call to
//! the scheduler.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument};

use followup_core::{CartIdentity, Email, OrderId, UserId};

use crate::abandonment::{AbandonmentThreshold, CartStatus, classify};
use crate::dedup::{DedupStore, DedupTracker};
use crate::error::FollowupError;
use crate::events::{CartEvent, EventBus};
use crate::models::{CartContents, CartEmptiedReason, CartUpdateTrigger, VisitorContext};
use crate::orders::OrderDirectory;
use crate::platform::PlatformStore;
use crate::scheduler::{EmailScheduler, QueueCartEmails};
use crate::snapshot::CartSnapshotStore;

/// The external collaborators the orchestrator drives.
#[derive(Clone)]
pub struct Collaborators {
    pub snapshots: Arc<dyn CartSnapshotStore>,
    pub dedup: Arc<dyn DedupStore>,
    pub scheduler: Arc<dyn EmailScheduler>,
    pub orders: Arc<dyn OrderDirectory>,
    pub platform: Arc<dyn PlatformStore>,
}

/// Reacts to cart lifecycle events.
#[derive(Clone)]
pub struct LifecycleOrchestrator {
    snapshots: Arc<dyn CartSnapshotStore>,
    dedup: DedupTracker,
    scheduler: Arc<dyn EmailScheduler>,
    orders: Arc<dyn OrderDirectory>,
    platform: Arc<dyn PlatformStore>,
    bus: EventBus,
    abandonment: AbandonmentThreshold,
}

impl LifecycleOrchestrator {
    #[must_use]
    pub fn new(
        collaborators: Collaborators,
        bus: EventBus,
        abandonment: AbandonmentThreshold,
    ) -> Self {
        Self {
            snapshots: collaborators.snapshots,
            dedup: DedupTracker::new(collaborators.dedup),
            scheduler: collaborators.scheduler,
            orders: collaborators.orders,
            platform: collaborators.platform,
            bus,
            abandonment,
        }
    }

    /// The visitor's cart changed.
    ///
    /// Persists a snapshot and asks the scheduler to queue follow-up emails
    /// for the new cart state, passing the current dedup marks so already
    /// notified products are skipped. An empty cart is handled as a
    /// cart-emptied event instead.
    ///
    /// # Errors
    ///
    /// Returns [`FollowupError`] when a store or the scheduler fails.
    #[instrument(skip(self, visitor, cart), fields(identity = ?visitor.identity()))]
    pub async fn cart_updated(
        &self,
        visitor: &VisitorContext,
        cart: &CartContents,
        trigger: CartUpdateTrigger,
    ) -> Result<(), FollowupError> {
        let Some(identity) = visitor.identity() else {
            debug!("unidentified visitor; cart not tracked");
            return Ok(());
        };

        if cart.is_empty() {
            return self.cart_emptied(visitor, CartEmptiedReason::Cleared).await;
        }

        self.snapshots.upsert(visitor, cart).await?;

        let already_queued = self.dedup.marks(&identity).await?;
        let queued = self
            .scheduler
            .queue_cart_emails(QueueCartEmails {
                items: cart.items.clone(),
                user_id: visitor.user_id,
                email: visitor.email.clone(),
                added_product: trigger.added_product(),
                already_queued,
            })
            .await?;

        if !queued.is_empty() {
            self.dedup.mark_all(&identity, queued).await?;
        }

        Ok(())
    }

    /// The visitor's cart was emptied.
    ///
    /// Drops the identity's unsent cart emails, records the empty state with
    /// a fresh timestamp, resets the dedup set, and announces the event.
    /// Logout-driven empties are skipped wholesale: the persistent cart
    /// comes back on the next login and the queued emails must survive it.
    ///
    /// # Errors
    ///
    /// Returns [`FollowupError`] when a store or the scheduler fails.
    #[instrument(skip(self, visitor), fields(identity = ?visitor.identity()))]
    pub async fn cart_emptied(
        &self,
        visitor: &VisitorContext,
        reason: CartEmptiedReason,
    ) -> Result<(), FollowupError> {
        if reason == CartEmptiedReason::Logout {
            debug!("cart emptied by logout; keeping queued emails");
            return Ok(());
        }

        let Some(identity) = visitor.identity() else {
            return Ok(());
        };

        self.bus.publish(CartEvent::CartEmptied {
            identity: identity.clone(),
        });

        self.scheduler
            .delete_unsent_cart_emails(visitor.user_id, visitor.email.as_ref())
            .await?;

        self.snapshots.upsert(visitor, &CartContents::empty()).await?;
        self.dedup.reset(&identity).await?;

        Ok(())
    }

    /// An order reached processing/completed.
    ///
    /// Clears the customer's pending cart emails: by account when the order
    /// has a registered customer, and unconditionally by the billing email -
    /// that covers guests and any stale guest-keyed emails belonging to a
    /// now-registered customer. Safe to invoke repeatedly for the same
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`FollowupError`] when a store or the scheduler fails.
    #[instrument(skip(self))]
    pub async fn order_finalized(&self, order_id: OrderId) -> Result<(), FollowupError> {
        let Some(customer) = self.orders.resolve_customer(order_id).await? else {
            debug!("order not found; nothing to clear");
            return Ok(());
        };

        if let Some(user_id) = customer.user_id {
            self.scheduler
                .delete_unsent_cart_emails(Some(user_id), None)
                .await?;
            self.dedup.reset(&CartIdentity::Customer(user_id)).await?;
        }

        if let Some(email) = customer.billing_email.as_ref() {
            self.scheduler
                .delete_unsent_cart_emails(None, Some(email))
                .await?;
        }

        Ok(())
    }

    /// Operator-requested clear of a customer's cart emails and cart state.
    ///
    /// The administrative equivalent of [`Self::cart_emptied`]: deletes
    /// unsent cart emails for the given user and/or email and resets the
    /// dedup set, and additionally wipes the platform's remembered-cart
    /// marker and the cart embedded in the persisted session row so the
    /// cart does not resurrect on the customer's next visit.
    ///
    /// # Errors
    ///
    /// Returns [`FollowupError`] when a store or the scheduler fails.
    #[instrument(skip(self, email), fields(email = email.map(Email::as_str)))]
    pub async fn operator_clear(
        &self,
        user_id: Option<UserId>,
        email: Option<&Email>,
    ) -> Result<(), FollowupError> {
        if user_id.is_none() && email.is_none() {
            return Ok(());
        }

        self.scheduler
            .delete_unsent_cart_emails(user_id, email)
            .await?;

        if let Some(user_id) = user_id {
            let identity = CartIdentity::Customer(user_id);
            self.dedup.reset(&identity).await?;
            self.snapshots.touch(&identity, Utc::now()).await?;
            self.platform.clear_remembered_cart(user_id).await?;
            self.platform.clear_session_cart(user_id).await?;
        } else if let Some(email) = email {
            self.dedup
                .reset(&CartIdentity::Guest(email.clone()))
                .await?;
        }

        Ok(())
    }

    /// Current status of the identity's stored cart, against the configured
    /// abandonment threshold. Reporting only.
    ///
    /// # Errors
    ///
    /// Returns [`FollowupError`] when the snapshot store fails.
    pub async fn cart_status(&self, identity: &CartIdentity) -> Result<CartStatus, FollowupError> {
        let snapshot = self.snapshots.fetch(identity).await?;
        Ok(classify(snapshot.as_ref(), self.abandonment, Utc::now()))
    }
}
