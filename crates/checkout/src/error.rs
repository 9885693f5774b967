//! Checkout error types.

use broker::BrokerError;
use cart_store::CartError;
use common::{CartId, OrderId};
use thiserror::Error;

use crate::state::CheckoutState;

/// Failures talking to the payment authorizer itself, as opposed to a
/// decision it returned.
#[derive(Debug, Error)]
pub enum AuthorizerError {
    /// The request could not be sent or the response could not be read.
    #[error("Payment authorizer transport error: {0}")]
    Transport(String),

    /// No response within the client-side timeout.
    #[error("Payment authorizer timed out")]
    Timeout,
}

/// Errors that end a checkout attempt.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Shopping cart not found")]
    CartNotFound(CartId),

    #[error("Cannot checkout empty cart")]
    EmptyCart(CartId),

    #[error("Payment was declined")]
    PaymentDeclined,

    /// The authorizer rejected the card number format.
    #[error("invalid credit card format")]
    InvalidCard,

    /// The authorizer could not be reached or timed out.
    #[error("failed to contact payment service")]
    PaymentServiceUnavailable(#[source] AuthorizerError),

    /// The authorizer answered with a status outside its contract.
    #[error("unexpected response from payment service")]
    UnexpectedPaymentResponse(u16),

    #[error("Failed to encode order: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to publish order {order_id}: {source}")]
    Publish {
        order_id: OrderId,
        #[source]
        source: BrokerError,
    },

    #[error("Cart store error: {0}")]
    Store(CartError),
}

impl CheckoutError {
    /// Stable machine-readable code reported to HTTP callers.
    ///
    /// Authorizer unavailability shares `INVALID_CARD` with format errors;
    /// the variants stay distinct for logging and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutError::CartNotFound(_) => "CART_NOT_FOUND",
            CheckoutError::EmptyCart(_) => "EMPTY_CART",
            CheckoutError::PaymentDeclined => "PAYMENT_DECLINED",
            CheckoutError::InvalidCard
            | CheckoutError::PaymentServiceUnavailable(_)
            | CheckoutError::UnexpectedPaymentResponse(_) => "INVALID_CARD",
            CheckoutError::Encode(_) | CheckoutError::Publish { .. } | CheckoutError::Store(_) => {
                "INTERNAL_ERROR"
            }
        }
    }

    /// The terminal state the checkout ended in.
    pub fn terminal_state(&self) -> CheckoutState {
        match self {
            CheckoutError::PaymentDeclined => CheckoutState::Declined,
            CheckoutError::EmptyCart(_)
            | CheckoutError::InvalidCard
            | CheckoutError::PaymentServiceUnavailable(_)
            | CheckoutError::UnexpectedPaymentResponse(_) => CheckoutState::Rejected,
            CheckoutError::CartNotFound(_)
            | CheckoutError::Encode(_)
            | CheckoutError::Publish { .. }
            | CheckoutError::Store(_) => CheckoutState::Failed,
        }
    }
}

impl From<CartError> for CheckoutError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::NotFound(cart_id) => CheckoutError::CartNotFound(cart_id),
            other => CheckoutError::Store(other),
        }
    }
}
