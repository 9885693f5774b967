use serde::Serialize;

use crate::{CartId, CartItem, CustomerId, ProductId};

/// A customer's shopping cart.
///
/// Holds at most one [`CartItem`] per product; adding a product that is
/// already present increases its quantity instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingCart {
    pub id: CartId,
    pub customer_id: CustomerId,
    items: Vec<CartItem>,
}

impl ShoppingCart {
    /// Creates an empty cart.
    pub fn new(id: CartId, customer_id: CustomerId) -> Self {
        Self {
            id,
            customer_id,
            items: Vec::new(),
        }
    }

    /// Items in insertion order.
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the quantity held for a product, if any.
    pub fn quantity_of(&self, product_id: ProductId) -> Option<u32> {
        self.items
            .iter()
            .find(|item| item.product_id == product_id)
            .map(|item| item.quantity)
    }

    /// Merges a product into the cart.
    pub fn add_item(&mut self, product_id: ProductId, quantity: u32) {
        match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
            None => self.items.push(CartItem {
                product_id,
                quantity,
            }),
        }
    }

    /// Removes every item.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Takes the given quantities out of the cart, dropping lines that reach
    /// zero. Lines and quantities not listed are left alone.
    pub fn remove_items(&mut self, items: &[CartItem]) {
        for removed in items {
            if let Some(line) = self
                .items
                .iter_mut()
                .find(|line| line.product_id == removed.product_id)
            {
                line.quantity = line.quantity.saturating_sub(removed.quantity);
            }
        }
        self.items.retain(|line| line.quantity > 0);
    }
}
