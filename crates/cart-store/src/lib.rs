//! Shopping cart storage.
//!
//! [`CartStore`] is the capability the cart service programs against;
//! [`InMemoryCartStore`] is the process-lifetime implementation.

pub mod cart;
pub mod error;
pub mod memory;
pub mod store;

pub use cart::ShoppingCart;
pub use common::{CartId, CartItem, CustomerId, ProductId};
pub use error::{CartError, Result};
pub use memory::InMemoryCartStore;
pub use store::CartStore;
