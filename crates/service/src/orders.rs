//! Order lookups against the commerce platform.

use async_trait::async_trait;

use followup_core::{Email, EmailId, OrderId, UserId};

use crate::db::RepositoryError;

/// The customer behind an order, as far as the platform can resolve one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderCustomer {
    /// Registered account, when the order was placed logged-in.
    pub user_id: Option<UserId>,
    /// Billing email from the order form.
    pub billing_email: Option<Email>,
}

impl OrderCustomer {
    /// Neither an account nor an email - nothing to act on.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        self.user_id.is_none() && self.billing_email.is_none()
    }
}

/// Read/annotate orders owned by the commerce platform.
#[async_trait]
pub trait OrderDirectory: Send + Sync {
    /// Resolve the customer behind an order. `None` when the order itself
    /// does not exist.
    async fn resolve_customer(
        &self,
        order_id: OrderId,
    ) -> Result<Option<OrderCustomer>, RepositoryError>;

    /// Is this order a subscription renewal? Renewals are never attributed
    /// to follow-up emails.
    async fn is_subscription_renewal(&self, order_id: OrderId) -> Result<bool, RepositoryError>;

    /// The follow-up email already credited for this order, if any.
    async fn conversion_email(&self, order_id: OrderId)
    -> Result<Option<EmailId>, RepositoryError>;

    /// Credit a follow-up email for this order. Overwrites an existing
    /// credit with the same derivation (the operation is idempotent).
    async fn record_conversion(
        &self,
        order_id: OrderId,
        email_id: EmailId,
    ) -> Result<(), RepositoryError>;
}
