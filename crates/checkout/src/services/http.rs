//! HTTP client for the external credit card authorizer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use crate::error::AuthorizerError;
use crate::services::payment::{AuthorizationOutcome, PaymentAuthorizer};

/// Path of the authorize operation on the authorizer service.
pub const AUTHORIZE_PATH: &str = "/credit-card-authorizer/authorize";

/// Client-side timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct AuthorizeRequest<'a> {
    credit_card_number: &'a str,
}

/// Calls `POST {base_url}/credit-card-authorizer/authorize`.
///
/// Status mapping: 200 authorized, 402 declined, 400 malformed card,
/// anything else unexpected. Connection failures and timeouts surface as
/// [`AuthorizerError`].
#[derive(Debug, Clone)]
pub struct HttpPaymentAuthorizer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPaymentAuthorizer {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AuthorizerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthorizerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}{AUTHORIZE_PATH}", base_url.trim_end_matches('/')),
        })
    }

    /// The full authorize URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PaymentAuthorizer for HttpPaymentAuthorizer {
    #[tracing::instrument(skip(self, card_number), fields(endpoint = %self.endpoint))]
    async fn authorize(&self, card_number: &str) -> Result<AuthorizationOutcome, AuthorizerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&AuthorizeRequest {
                credit_card_number: card_number,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthorizerError::Timeout
                } else {
                    AuthorizerError::Transport(e.to_string())
                }
            })?;

        let outcome = match response.status() {
            StatusCode::OK => AuthorizationOutcome::Authorized,
            StatusCode::PAYMENT_REQUIRED => AuthorizationOutcome::Declined,
            StatusCode::BAD_REQUEST => AuthorizationOutcome::InvalidFormat,
            other => AuthorizationOutcome::Unexpected(other.as_u16()),
        };
        tracing::debug!(status = response.status().as_u16(), ?outcome, "authorizer responded");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_base_url() {
        let client = HttpPaymentAuthorizer::new("http://cca:8082/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://cca:8082/credit-card-authorizer/authorize"
        );

        let client = HttpPaymentAuthorizer::new("http://localhost:8082", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:8082/credit-card-authorizer/authorize"
        );
    }
}
