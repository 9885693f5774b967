//! Payment authorizer capability and its implementations.

pub mod http;
pub mod payment;

pub use http::HttpPaymentAuthorizer;
pub use payment::{
    AuthorizationOutcome, PaymentAuthorizer, StubPaymentAuthorizer, is_valid_card_format,
};
