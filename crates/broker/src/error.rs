use thiserror::Error;

/// Errors that can occur when talking to the message broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Could not reach the broker.
    #[error("Broker connection error: {0}")]
    Connection(String),

    /// Declaring a queue failed.
    #[error("Failed to declare queue '{queue}': {reason}")]
    Declare { queue: String, reason: String },

    /// The broker did not accept or confirm a published message.
    #[error("Failed to publish to queue '{queue}': {reason}")]
    Publish { queue: String, reason: String },

    /// Subscribing to a queue failed, or a delivery stream reported an error.
    #[error("Subscription error on queue '{queue}': {reason}")]
    Subscribe { queue: String, reason: String },

    /// Acknowledging or rejecting a delivery failed.
    #[error("Acknowledgment failed: {0}")]
    Acknowledge(String),

    /// The broker has been closed.
    #[error("Broker is closed")]
    Closed,
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
