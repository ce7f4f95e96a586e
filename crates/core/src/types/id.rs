//! Newtype ids for type-safe entity references.
//!
//! Every id handed to this service by the commerce platform is a plain
//! integer; wrapping each kind in its own newtype prevents mixing, say, a
//! product id into an order lookup. With the `postgres` feature the ids map
//! directly to `BIGINT` columns.

/// Define a type-safe id wrapper around `i64`.
///
/// ```rust
/// # use followup_core::define_id;
/// define_id!(WidgetId);
///
/// let id = WidgetId::new(7);
/// assert_eq!(id.get(), 7);
/// ```
#[macro_export]
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize,
        )]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type))]
        #[cfg_attr(feature = "postgres", sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw id value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// The underlying integer value.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// A registered customer's account id.
    UserId
);
define_id!(
    /// A purchasable product.
    ProductId
);
define_id!(
    /// A concrete variation of a product.
    VariantId
);
define_id!(
    /// A completed (or completing) order.
    OrderId
);
define_id!(
    /// A follow-up email definition owned by the scheduler.
    EmailId
);
