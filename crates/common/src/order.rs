//! Cart line items and the order message carried over the `orders` queue.

use serde::{Deserialize, Serialize};

use crate::types::{CartId, OrderId, ProductId};

/// A product line inside a cart or an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl CartItem {
    /// Creates a new line item.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// The unit of work handed from the cart service to the warehouse.
///
/// Wire format: `{"order_id": 1, "cart_id": 3, "items": [{"product_id": 1, "quantity": 2}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMessage {
    pub order_id: OrderId,
    pub cart_id: CartId,
    pub items: Vec<CartItem>,
}

impl OrderMessage {
    /// Builds an order from a cart's items at the moment of authorization.
    pub fn new(order_id: OrderId, cart_id: CartId, items: Vec<CartItem>) -> Self {
        Self {
            order_id,
            cart_id,
            items,
        }
    }

    /// Encodes the message as the JSON queue payload.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decodes a queue payload.
    pub fn from_json_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Sum of all item quantities.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_snake_case_wire_format() {
        let msg = OrderMessage::new(
            OrderId::new(1),
            CartId::new(3),
            vec![CartItem::new(1, 2), CartItem::new(5, 1)],
        );
        let value: serde_json::Value =
            serde_json::from_slice(&msg.to_json_bytes().unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "order_id": 1,
                "cart_id": 3,
                "items": [
                    {"product_id": 1, "quantity": 2},
                    {"product_id": 5, "quantity": 1}
                ]
            })
        );
    }

    #[test]
    fn decodes_payload_from_other_producers() {
        let payload = br#"{"order_id":7,"cart_id":2,"items":[{"product_id":4,"quantity":3}]}"#;
        let msg = OrderMessage::from_json_slice(payload).unwrap();
        assert_eq!(msg.order_id, OrderId::new(7));
        assert_eq!(msg.items, vec![CartItem::new(4, 3)]);
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(OrderMessage::from_json_slice(b"not json").is_err());
        assert!(OrderMessage::from_json_slice(br#"{"order_id":1}"#).is_err());
        assert!(
            OrderMessage::from_json_slice(br#"{"order_id":1,"cart_id":1,"items":[{"product_id":1,"quantity":-2}]}"#)
                .is_err()
        );
    }

    #[test]
    fn total_quantity_sums_items() {
        let msg = OrderMessage::new(
            OrderId::new(1),
            CartId::new(1),
            vec![CartItem::new(1, 2), CartItem::new(2, 3)],
        );
        assert_eq!(msg.total_quantity(), 5);
    }
}
