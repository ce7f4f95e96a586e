//! Who triggered a cart event, and why.
//!
//! The original platform hooks read the current user and session out of
//! globals; here every lifecycle operation receives an explicit
//! [`VisitorContext`] extracted by the framework-integration layer before it
//! calls in.

use followup_core::{CartIdentity, Email, ProductId, UserId};

/// Everything the session layer knows about the visitor behind an event.
#[derive(Debug, Clone, Default)]
pub struct VisitorContext {
    /// Account id when the visitor is logged in.
    pub user_id: Option<UserId>,
    /// Email captured in the session (checkout field, newsletter prompt).
    pub email: Option<Email>,
    pub first_name: String,
    pub last_name: String,
}

impl VisitorContext {
    /// A logged-in customer.
    #[must_use]
    pub fn registered(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    /// A guest whose email the session captured.
    #[must_use]
    pub fn guest(email: Email) -> Self {
        Self {
            email: Some(email),
            ..Self::default()
        }
    }

    /// A visitor we know nothing about. Never tracked.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Attach the visitor's name, when known.
    #[must_use]
    pub fn with_name(mut self, first_name: &str, last_name: &str) -> Self {
        self.first_name = first_name.to_owned();
        self.last_name = last_name.to_owned();
        self
    }

    /// The addressing identity for this visitor, if any.
    #[must_use]
    pub fn identity(&self) -> Option<CartIdentity> {
        CartIdentity::resolve(self.user_id, self.email.as_ref())
    }
}

/// What kind of mutation produced a cart-updated event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartUpdateTrigger {
    /// An add-to-cart action for a specific product.
    AddToCart(ProductId),
    /// Any other mutation: quantity change, removal, cart restore.
    Other,
}

impl CartUpdateTrigger {
    /// The newly added product, when the trigger was an add-to-cart.
    #[must_use]
    pub const fn added_product(self) -> Option<ProductId> {
        match self {
            Self::AddToCart(product_id) => Some(product_id),
            Self::Other => None,
        }
    }
}

/// Why a cart-emptied event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEmptiedReason {
    /// The visitor (or checkout completion) emptied the cart.
    Cleared,
    /// The cart emptied as a side effect of logging out. Queued emails must
    /// survive: the persistent cart reappears on the next login.
    Logout,
}
