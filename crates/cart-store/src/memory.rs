use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{CartError, CartId, CartItem, CartStore, CustomerId, ProductId, Result, ShoppingCart};

struct State {
    carts: HashMap<CartId, ShoppingCart>,
    next_id: u64,
}

/// In-memory cart store.
///
/// A single reader-writer lock guards the whole map, so cart operations are
/// serialized system-wide. Nothing outlives the process.
#[derive(Clone)]
pub struct InMemoryCartStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryCartStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(State {
                carts: HashMap::new(),
                next_id: 1,
            })),
        }
    }

    /// Returns the number of carts created so far.
    pub async fn cart_count(&self) -> usize {
        self.state.read().await.carts.len()
    }
}

impl Default for InMemoryCartStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn create_cart(&self, customer_id: CustomerId) -> Result<CartId> {
        if !customer_id.is_valid() {
            return Err(CartError::InvalidCustomerId);
        }

        let mut state = self.state.write().await;
        let cart_id = CartId::new(state.next_id);
        state.next_id += 1;
        state
            .carts
            .insert(cart_id, ShoppingCart::new(cart_id, customer_id));

        tracing::debug!(%cart_id, %customer_id, "cart created");
        Ok(cart_id)
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<ShoppingCart> {
        self.state
            .read()
            .await
            .carts
            .get(&cart_id)
            .cloned()
            .ok_or(CartError::NotFound(cart_id))
    }

    async fn add_item(&self, cart_id: CartId, product_id: ProductId, quantity: u32) -> Result<()> {
        if !product_id.is_valid() {
            return Err(CartError::InvalidProductId);
        }
        if quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        let mut state = self.state.write().await;
        let cart = state
            .carts
            .get_mut(&cart_id)
            .ok_or(CartError::NotFound(cart_id))?;
        cart.add_item(product_id, quantity);
        Ok(())
    }

    async fn clear_cart(&self, cart_id: CartId) -> Result<()> {
        let mut state = self.state.write().await;
        let cart = state
            .carts
            .get_mut(&cart_id)
            .ok_or(CartError::NotFound(cart_id))?;
        cart.clear();
        Ok(())
    }

    async fn remove_items(&self, cart_id: CartId, items: &[CartItem]) -> Result<()> {
        let mut state = self.state.write().await;
        let cart = state
            .carts
            .get_mut(&cart_id)
            .ok_or(CartError::NotFound(cart_id))?;
        cart.remove_items(items);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_sequential_ids_from_one() {
        let store = InMemoryCartStore::new();
        let first = store.create_cart(CustomerId::new(1)).await.unwrap();
        let second = store.create_cart(CustomerId::new(1)).await.unwrap();
        let third = store.create_cart(CustomerId::new(8)).await.unwrap();

        assert_eq!(first, CartId::new(1));
        assert_eq!(second, CartId::new(2));
        assert_eq!(third, CartId::new(3));
        assert_eq!(store.cart_count().await, 3);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_customer() {
        let store = InMemoryCartStore::new();
        let result = store.create_cart(CustomerId::new(0)).await;
        assert_eq!(result, Err(CartError::InvalidCustomerId));
        assert_eq!(store.cart_count().await, 0);
    }

    #[tokio::test]
    async fn test_new_cart_is_empty_and_owned() {
        let store = InMemoryCartStore::new();
        let id = store.create_cart(CustomerId::new(5)).await.unwrap();
        let cart = store.get_cart(id).await.unwrap();
        assert_eq!(cart.customer_id, CustomerId::new(5));
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_cart() {
        let store = InMemoryCartStore::new();
        let result = store.get_cart(CartId::new(99)).await;
        assert_eq!(result, Err(CartError::NotFound(CartId::new(99))));
    }

    #[tokio::test]
    async fn test_add_item_merges_quantities() {
        let store = InMemoryCartStore::new();
        let id = store.create_cart(CustomerId::new(1)).await.unwrap();
        store.add_item(id, ProductId::new(1), 2).await.unwrap();
        store.add_item(id, ProductId::new(2), 1).await.unwrap();
        store.add_item(id, ProductId::new(1), 3).await.unwrap();

        let cart = store.get_cart(id).await.unwrap();
        assert_eq!(cart.items(), &[CartItem::new(1, 5), CartItem::new(2, 1)]);
    }

    #[tokio::test]
    async fn test_add_item_validation() {
        let store = InMemoryCartStore::new();
        let id = store.create_cart(CustomerId::new(1)).await.unwrap();

        assert_eq!(
            store.add_item(id, ProductId::new(0), 1).await,
            Err(CartError::InvalidProductId)
        );
        assert_eq!(
            store.add_item(id, ProductId::new(1), 0).await,
            Err(CartError::InvalidQuantity)
        );
        assert_eq!(
            store.add_item(CartId::new(42), ProductId::new(1), 1).await,
            Err(CartError::NotFound(CartId::new(42)))
        );
        assert!(store.get_cart(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let store = InMemoryCartStore::new();
        let id = store.create_cart(CustomerId::new(1)).await.unwrap();
        store.add_item(id, ProductId::new(1), 1).await.unwrap();

        store.clear_cart(id).await.unwrap();
        assert!(store.get_cart(id).await.unwrap().is_empty());

        assert_eq!(
            store.clear_cart(CartId::new(7)).await,
            Err(CartError::NotFound(CartId::new(7)))
        );
    }

    #[tokio::test]
    async fn test_remove_items_subtracts_snapshot() {
        let store = InMemoryCartStore::new();
        let id = store.create_cart(CustomerId::new(1)).await.unwrap();
        store.add_item(id, ProductId::new(1), 1).await.unwrap();
        let snapshot = store.get_cart(id).await.unwrap();

        store.add_item(id, ProductId::new(2), 5).await.unwrap();
        store.remove_items(id, snapshot.items()).await.unwrap();

        let cart = store.get_cart(id).await.unwrap();
        assert_eq!(cart.items(), &[CartItem::new(2, 5)]);

        assert_eq!(
            store.remove_items(CartId::new(7), snapshot.items()).await,
            Err(CartError::NotFound(CartId::new(7)))
        );
    }

    #[tokio::test]
    async fn test_snapshot_is_detached_from_store() {
        let store = InMemoryCartStore::new();
        let id = store.create_cart(CustomerId::new(1)).await.unwrap();
        store.add_item(id, ProductId::new(1), 1).await.unwrap();

        let snapshot = store.get_cart(id).await.unwrap();
        store.clear_cart(id).await.unwrap();

        assert_eq!(snapshot.items().len(), 1);
    }
}
