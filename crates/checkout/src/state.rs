//! Checkout state machine.

/// The state of a single checkout attempt.
///
/// State transitions:
/// ```text
/// Created ──► Validating ──► Authorizing ──┬──► Authorized ──► Published ──► Cleared
///                  │                       ├──► Declined
///                  │                       └──► Rejected
///                  └──► Rejected
/// any step ──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckoutState {
    #[default]
    Created,

    /// Cart id and body parsed; the cart is being read.
    Validating,

    /// Waiting on the payment authorizer.
    Authorizing,

    /// Payment accepted; the order id has been allocated.
    Authorized,

    /// Payment declined (terminal). The cart keeps its items.
    Declined,

    /// Input, cart contents or card rejected (terminal).
    Rejected,

    /// The order message was accepted by the broker.
    Published,

    /// The cart was emptied (terminal success).
    Cleared,

    /// An unexpected failure stopped the checkout (terminal).
    Failed,
}

impl CheckoutState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CheckoutState::Declined
                | CheckoutState::Rejected
                | CheckoutState::Cleared
                | CheckoutState::Failed
        )
    }

    /// Returns true if the checkout finished successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, CheckoutState::Cleared)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Created => "Created",
            CheckoutState::Validating => "Validating",
            CheckoutState::Authorizing => "Authorizing",
            CheckoutState::Authorized => "Authorized",
            CheckoutState::Declined => "Declined",
            CheckoutState::Rejected => "Rejected",
            CheckoutState::Published => "Published",
            CheckoutState::Cleared => "Cleared",
            CheckoutState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
