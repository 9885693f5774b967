//! Warehouse error types.

use thiserror::Error;

/// Errors that can occur while running the consumer pool.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// An error reported by the message broker.
    #[error("Broker error: {0}")]
    Broker(#[from] broker::BrokerError),

    /// The pool configuration cannot be used.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for warehouse operations.
pub type Result<T> = std::result::Result<T, WarehouseError>;
