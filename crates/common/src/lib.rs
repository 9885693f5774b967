//! Shared types for the order-fulfillment chain.
//!
//! Both sides of the `orders` queue depend on this crate: the cart service
//! encodes [`OrderMessage`]s and the warehouse decodes them.

pub mod order;
pub mod types;

pub use order::{CartItem, OrderMessage};
pub use types::{CartId, CustomerId, OrderId, ProductId};
