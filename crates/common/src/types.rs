use serde::{Deserialize, Serialize};

/// Declares a positive integer identifier newtype.
///
/// Wrapping the raw integer keeps cart, customer, product and order ids
/// from being mixed up at call sites.
macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Creates an identifier from a raw value.
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Parses an identifier from a signed value, rejecting anything below 1.
            pub fn from_positive(value: i64) -> Option<Self> {
                u64::try_from(value).ok().filter(|v| *v >= 1).map(Self)
            }

            /// Returns the underlying integer.
            pub const fn get(&self) -> u64 {
                self.0
            }

            /// Returns true if the identifier is a valid (positive) id.
            pub const fn is_valid(&self) -> bool {
                self.0 >= 1
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

id_type!(
    /// Identifier of a shopping cart, assigned sequentially by the cart store.
    CartId
);

id_type!(
    /// Identifier of the customer owning a cart.
    CustomerId
);

id_type!(
    /// Identifier of a catalog product.
    ProductId
);

id_type!(
    /// Identifier of an order, assigned by the checkout coordinator.
    ///
    /// Order ids are process-local: the sequence restarts at 1 whenever the
    /// cart service restarts.
    OrderId
);
