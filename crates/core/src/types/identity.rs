//! The addressing key for cart-related records.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::email::Email;
use super::id::UserId;

/// Who a cart belongs to: a registered customer or an email-only guest.
///
/// Every snapshot, dedup set, and scheduled cart email is addressed by
/// exactly one of these. A registered customer is identified solely by id
/// (their email may change); a guest solely by email. Visitors with neither
/// have no identity and are never tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartIdentity {
    /// A logged-in customer, addressed by account id.
    Customer(UserId),
    /// A guest known only by the email captured in their session.
    Guest(Email),
}

impl CartIdentity {
    /// Resolve an identity from what the session layer knows about the
    /// visitor. A registered id wins over a guest email; neither means the
    /// visitor is anonymous and `None` is returned.
    #[must_use]
    pub fn resolve(user_id: Option<UserId>, email: Option<&Email>) -> Option<Self> {
        match (user_id, email) {
            (Some(id), _) => Some(Self::Customer(id)),
            (None, Some(email)) => Some(Self::Guest(email.clone())),
            (None, None) => None,
        }
    }

    /// The registered customer id, if this identity is one.
    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Customer(id) => Some(*id),
            Self::Guest(_) => None,
        }
    }

    /// The guest email, if this identity is one.
    #[must_use]
    pub const fn guest_email(&self) -> Option<&Email> {
        match self {
            Self::Customer(_) => None,
            Self::Guest(email) => Some(email),
        }
    }
}

impl fmt::Display for CartIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer(id) => write!(f, "customer:{id}"),
            Self::Guest(email) => write!(f, "guest:{email}"),
        }
    }
}

impl From<UserId> for CartIdentity {
    fn from(id: UserId) -> Self {
        Self::Customer(id)
    }
}

impl From<Email> for CartIdentity {
    fn from(email: Email) -> Self {
        Self::Guest(email)
    }
}
