//! Payment authorizer trait and in-process implementation.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AuthorizerError;

/// Decision returned by the payment authorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    /// HTTP 200.
    Authorized,
    /// HTTP 402.
    Declined,
    /// HTTP 400: the card number is not `dddd-dddd-dddd-dddd`.
    InvalidFormat,
    /// Any other status.
    Unexpected(u16),
}

/// Trait for credit card authorization.
#[async_trait]
pub trait PaymentAuthorizer: Send + Sync {
    /// Asks the authorizer to approve a card. `Err` means the authorizer
    /// could not be reached, not that the card was refused.
    async fn authorize(&self, card_number: &str) -> Result<AuthorizationOutcome, AuthorizerError>;
}

/// Returns true for four groups of four ASCII digits separated by dashes.
pub fn is_valid_card_format(card_number: &str) -> bool {
    let groups: Vec<&str> = card_number.split('-').collect();
    groups.len() == 4
        && groups
            .iter()
            .all(|group| group.len() == 4 && group.bytes().all(|b| b.is_ascii_digit()))
}

#[derive(Debug, Default)]
struct StubState {
    decline: bool,
    unavailable: bool,
    delay: Option<Duration>,
    calls: usize,
}

/// In-process payment authorizer for tests and local runs.
///
/// Validates the card format like the real authorizer, then returns a
/// forced decision instead of a random one.
#[derive(Debug, Clone, Default)]
pub struct StubPaymentAuthorizer {
    state: Arc<RwLock<StubState>>,
}

impl StubPaymentAuthorizer {
    /// Creates an authorizer that approves every well-formed card.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the authorizer to decline well-formed cards.
    pub fn set_decline(&self, decline: bool) {
        self.write().decline = decline;
    }

    /// Configures the authorizer to behave as if it were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.write().unavailable = unavailable;
    }

    /// Delays every decision, simulating a slow authorizer.
    pub fn set_delay(&self, delay: Duration) {
        self.write().delay = Some(delay);
    }

    /// Number of authorize calls received.
    pub fn call_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .calls
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StubState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentAuthorizer for StubPaymentAuthorizer {
    async fn authorize(&self, card_number: &str) -> Result<AuthorizationOutcome, AuthorizerError> {
        let (decline, unavailable, delay) = {
            let mut state = self.write();
            state.calls += 1;
            (state.decline, state.unavailable, state.delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if unavailable {
            return Err(AuthorizerError::Transport(
                "stub authorizer unavailable".to_string(),
            ));
        }
        if !is_valid_card_format(card_number) {
            return Ok(AuthorizationOutcome::InvalidFormat);
        }
        if decline {
            return Ok(AuthorizationOutcome::Declined);
        }
        Ok(AuthorizationOutcome::Authorized)
    }
}
