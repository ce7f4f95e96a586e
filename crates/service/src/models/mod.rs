//! Domain models for cart tracking.

pub mod cart;
pub mod visitor;

pub use cart::{CartContents, CartLineItem, CartSnapshot};
pub use visitor::{CartEmptiedReason, CartUpdateTrigger, VisitorContext};
