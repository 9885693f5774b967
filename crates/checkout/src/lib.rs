//! Checkout coordination for the cart service.
//!
//! A checkout runs strictly in this order:
//! 1. Read the cart and reject it if it is empty
//! 2. Authorize the payment with the external credit card authorizer
//! 3. Publish the order to the `orders` queue
//! 4. Remove the ordered items from the cart
//!
//! A failure at any step stops the sequence; nothing already done is undone.

pub mod coordinator;
pub mod error;
pub mod services;
pub mod state;

pub use coordinator::{CheckoutCoordinator, CheckoutReceipt};
pub use error::{AuthorizerError, CheckoutError};
pub use services::{
    AuthorizationOutcome, HttpPaymentAuthorizer, PaymentAuthorizer, StubPaymentAuthorizer,
    is_valid_card_format,
};
pub use state::CheckoutState;
