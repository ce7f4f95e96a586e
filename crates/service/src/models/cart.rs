//! Cart contents and the durable cart snapshot.
//!
//! The platform's live cart is ephemeral session state; what this service
//! persists is an explicit, versioned copy of it. The stored line-item list
//! carries a format version and decodes fail-closed: a corrupt or
//! unknown-version blob reads as "no snapshot", never as an error.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use followup_core::{CartIdentity, ProductId, VariantId};

/// Version of the serialized line-item format.
const ITEMS_FORMAT_VERSION: u16 = 1;

/// One line of a cart: a product, how many, and at what price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// The product in the cart.
    pub product_id: ProductId,
    /// Concrete variation, when the product has any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    /// Quantity of this line.
    pub quantity: u32,
    /// Selected options (size, color, ...), keyed by option name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
    /// Unit price at the time the cart was captured.
    pub unit_price: Decimal,
}

impl CartLineItem {
    /// A plain line with no variation or options.
    #[must_use]
    pub fn new(product_id: ProductId, quantity: u32, unit_price: Decimal) -> Self {
        Self {
            product_id,
            variant_id: None,
            quantity,
            options: BTreeMap::new(),
            unit_price,
        }
    }
}

/// A cart as reported by the platform on a lifecycle event.
///
/// The total is the platform's contents total, carried verbatim rather than
/// recomputed here (it may exclude tax or include cart-level discounts).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CartContents {
    pub items: Vec<CartLineItem>,
    pub total: Decimal,
}

impl CartContents {
    #[must_use]
    pub const fn new(items: Vec<CartLineItem>, total: Decimal) -> Self {
        Self { items, total }
    }

    /// A cart with nothing in it.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Durable copy of an identified visitor's cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    /// Who the cart belongs to.
    pub identity: CartIdentity,
    pub first_name: String,
    pub last_name: String,
    /// The captured line items.
    pub items: Vec<CartLineItem>,
    /// The captured contents total.
    pub total: Decimal,
    /// When the cart last changed.
    pub date_updated: DateTime<Utc>,
}

/// Stored wire format for the line-item list.
#[derive(Serialize, Deserialize)]
struct StoredCartItems {
    version: u16,
    items: Vec<CartLineItem>,
}

/// Serialize line items into the stored blob format.
///
/// # Errors
///
/// Returns a `serde_json` error if serialization fails (practically only on
/// non-string option keys, which the types rule out).
pub fn encode_items(items: &[CartLineItem]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&StoredCartItems {
        version: ITEMS_FORMAT_VERSION,
        items: items.to_vec(),
    })
}

/// Decode a stored line-item blob.
///
/// Fails closed: malformed JSON or an unsupported format version yields
/// `None`, which callers treat as an absent snapshot.
#[must_use]
pub fn decode_items(raw: &str) -> Option<Vec<CartLineItem>> {
    let stored: StoredCartItems = serde_json::from_str(raw).ok()?;
    if stored.version > ITEMS_FORMAT_VERSION {
        return None;
    }
    Some(stored.items)
}
