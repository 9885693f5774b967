//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use cart_store::CartError;
use checkout::CheckoutError;
use serde::Serialize;

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed body, path or field value.
    InvalidInput(String),
    /// The cart does not exist.
    CartNotFound,
    /// No route matched.
    NotFound,
    /// A checkout ended in something other than success.
    Checkout(CheckoutError),
}

impl ApiError {
    pub fn invalid_cart_id() -> Self {
        ApiError::InvalidInput("Invalid shopping cart ID".to_string())
    }

    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg),
            ApiError::CartNotFound => (
                StatusCode::NOT_FOUND,
                "CART_NOT_FOUND",
                "Shopping cart not found".to_string(),
            ),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                "Endpoint not found".to_string(),
            ),
            ApiError::Checkout(err) => checkout_error_parts(err),
        }
    }
}

fn checkout_error_parts(err: CheckoutError) -> (StatusCode, &'static str, String) {
    let status = match &err {
        CheckoutError::CartNotFound(_) => StatusCode::NOT_FOUND,
        CheckoutError::PaymentDeclined => StatusCode::PAYMENT_REQUIRED,
        CheckoutError::EmptyCart(_)
        | CheckoutError::InvalidCard
        | CheckoutError::PaymentServiceUnavailable(_)
        | CheckoutError::UnexpectedPaymentResponse(_) => StatusCode::BAD_REQUEST,
        CheckoutError::Encode(_) | CheckoutError::Publish { .. } | CheckoutError::Store(_) => {
            tracing::error!(error = %err, "checkout failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                err.code(),
                "Failed to place order".to_string(),
            );
        }
    };
    (status, err.code(), err.to_string())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();
        (status, axum::Json(ErrorBody { error, message })).into_response()
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::NotFound(_) => ApiError::CartNotFound,
            CartError::InvalidCustomerId
            | CartError::InvalidProductId
            | CartError::InvalidQuantity => ApiError::InvalidInput(err.to_string()),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        ApiError::InvalidInput("Invalid JSON payload".to_string())
    }
}
