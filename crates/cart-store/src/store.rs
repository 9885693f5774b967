use async_trait::async_trait;

use crate::{CartId, CartItem, CustomerId, ProductId, Result, ShoppingCart};

/// Core trait for cart storage implementations.
///
/// Every operation is atomic with respect to the others. Implementations
/// must be thread-safe (Send + Sync) since they are shared across request
/// tasks.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Creates an empty cart for a customer and returns its id.
    ///
    /// Ids are assigned sequentially starting at 1. Fails with
    /// `InvalidCustomerId` if the customer id is below 1.
    async fn create_cart(&self, customer_id: CustomerId) -> Result<CartId>;

    /// Returns a snapshot of the cart.
    async fn get_cart(&self, cart_id: CartId) -> Result<ShoppingCart>;

    /// Adds a product to a cart, merging with an existing line for the
    /// same product.
    async fn add_item(&self, cart_id: CartId, product_id: ProductId, quantity: u32) -> Result<()>;

    /// Removes every item from a cart.
    async fn clear_cart(&self, cart_id: CartId) -> Result<()>;

    /// Subtracts a previously read snapshot of items from a cart.
    ///
    /// Items added after the snapshot was taken stay in the cart.
    async fn remove_items(&self, cart_id: CartId, items: &[CartItem]) -> Result<()>;
}
