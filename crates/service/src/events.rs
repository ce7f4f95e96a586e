//! Typed application events.
//!
//! The original platform announced cart milestones through global action
//! hooks; here interested collaborators subscribe to a typed broadcast
//! channel instead. Publishing never blocks and never fails - an event with
//! no subscribers is simply dropped.

use tokio::sync::broadcast;

use followup_core::{CartIdentity, OrderId};

use crate::scheduler::SentEmailRecord;

/// Milestones other parts of the application may want to observe.
#[derive(Debug, Clone)]
pub enum CartEvent {
    /// An identified visitor's cart was emptied.
    CartEmptied { identity: CartIdentity },
    /// A completed order was credited to a previously sent follow-up email.
    CartConversion {
        order_id: OrderId,
        email: SentEmailRecord,
    },
}

/// Broadcast bus for [`CartEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CartEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events published after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: CartEvent) {
        // send only errors when there are no receivers; that is fine
        if self.tx.send(event).is_err() {
            tracing::trace!("cart event published with no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(16)
    }
}
