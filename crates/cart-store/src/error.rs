use thiserror::Error;

use crate::CartId;

/// Errors returned by cart store operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    /// No cart exists with the given id.
    #[error("Shopping cart not found: {0}")]
    NotFound(CartId),

    #[error("customer_id must be a positive integer")]
    InvalidCustomerId,

    #[error("product_id must be a positive integer")]
    InvalidProductId,

    #[error("quantity must be a positive integer")]
    InvalidQuantity,
}

/// Result type for cart store operations.
pub type Result<T> = std::result::Result<T, CartError>;
