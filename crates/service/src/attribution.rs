//! Conversion attribution for completed orders.
//!
//! On order completion, the most recent follow-up email sent to the
//! customer inside the lookback window gets the credit. Finding nothing is
//! the normal case: no tag is written and no event fires.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{debug, instrument};

use followup_core::{EmailId, OrderId};

use crate::error::FollowupError;
use crate::events::{CartEvent, EventBus};
use crate::orders::OrderDirectory;
use crate::scheduler::{EmailScheduler, SentEmailQuery};

/// Credits completed orders to previously sent follow-up emails.
#[derive(Clone)]
pub struct ConversionAttributor {
    orders: Arc<dyn OrderDirectory>,
    scheduler: Arc<dyn EmailScheduler>,
    bus: EventBus,
    conversion_days: u32,
}

impl ConversionAttributor {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderDirectory>,
        scheduler: Arc<dyn EmailScheduler>,
        bus: EventBus,
        conversion_days: u32,
    ) -> Self {
        Self {
            orders,
            scheduler,
            bus,
            conversion_days,
        }
    }

    /// Attribute an order, returning the credited email id if one matched.
    ///
    /// Aborts quietly when no follow-up emails are active, the order is a
    /// subscription renewal, or no customer resolves. Idempotent: a repeat
    /// call re-derives the same credit.
    ///
    /// # Errors
    ///
    /// Returns [`FollowupError`] when the order store or scheduler fails.
    #[instrument(skip(self))]
    pub async fn attribute(
        &self,
        order_id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<Option<EmailId>, FollowupError> {
        let active = self.scheduler.active_email_ids().await?;
        if active.is_empty() {
            return Ok(None);
        }

        if self.orders.is_subscription_renewal(order_id).await? {
            debug!("subscription renewal; never attributed");
            return Ok(None);
        }

        let Some(customer) = self.orders.resolve_customer(order_id).await? else {
            return Ok(None);
        };
        if customer.is_unknown() {
            return Ok(None);
        }

        // Match by account when the order has one, else by billing address.
        let query = SentEmailQuery {
            email_ids: active,
            user_id: customer.user_id,
            email: if customer.user_id.is_none() {
                customer.billing_email
            } else {
                None
            },
            sent_after: lookback_start(now, self.conversion_days),
            sent_before: now,
            limit: 1,
        };

        let Some(record) = self.scheduler.sent_emails(&query).await?.into_iter().next() else {
            return Ok(None);
        };

        self.orders.record_conversion(order_id, record.email_id).await?;
        let email_id = record.email_id;
        self.bus.publish(CartEvent::CartConversion {
            order_id,
            email: record,
        });

        Ok(Some(email_id))
    }
}

/// Midnight at the start of the day `days` before `now`.
fn lookback_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    (now - Duration::days(i64::from(days)))
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc()
}
