//! Stripe API client.
//!
//! Implements the `PaymentProvider` port over Stripe's REST API. The
//! engine makes exactly one kind of call: re-fetching a subscription to
//! verify what a webhook claimed about it.
//!
//! # Security
//!
//! The API key is handled via `secrecy::SecretString` and sent as HTTP
//! basic auth, Stripe's documented scheme for secret keys.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use async_trait::async_trait;

use crate::domain::webhook::ProviderSubscription;
use crate::ports::{PaymentProvider, ProviderApiError, ProviderErrorCode};

/// Stripe API client configuration.
#[derive(Clone)]
pub struct StripeClientConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for the Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeClientConfig {
    /// Create a new configuration pointing at the real Stripe API.
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: "https://api.stripe.com".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Stripe implementation of the PaymentProvider port.
pub struct StripeClient {
    config: StripeClientConfig,
    http_client: reqwest::Client,
}

impl StripeClient {
    /// Create a new client with the given configuration.
    pub fn new(config: StripeClientConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

/// Stripe's error envelope, `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Map an unsuccessful HTTP status to an error category.
fn classify_status(status: reqwest::StatusCode) -> ProviderErrorCode {
    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            ProviderErrorCode::AuthenticationError
        }
        reqwest::StatusCode::TOO_MANY_REQUESTS => ProviderErrorCode::RateLimited,
        s if s.is_client_error() => ProviderErrorCode::InvalidRequest,
        s if s.is_server_error() => ProviderErrorCode::ProviderUnavailable,
        _ => ProviderErrorCode::Unknown,
    }
}

/// Build a `ProviderApiError` from a non-2xx response body.
fn error_from_response(status: reqwest::StatusCode, body: &str) -> ProviderApiError {
    let code = classify_status(status);

    match serde_json::from_str::<StripeErrorBody>(body) {
        Ok(parsed) => {
            let message = parsed
                .error
                .message
                .unwrap_or_else(|| format!("Stripe returned {}", status));
            let error = ProviderApiError::new(code, message);
            match parsed.error.code {
                Some(provider_code) => error.with_provider_code(provider_code),
                None => error,
            }
        }
        Err(_) => ProviderApiError::new(code, format!("Stripe returned {}: {}", status, body)),
    }
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, ProviderApiError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.config.api_base_url, subscription_id
        );

        let response = self
            .http_client
            .get(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| ProviderApiError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = error_from_response(status, &body);
            tracing::error!(
                subscription_id = %subscription_id,
                status = %status,
                error = %error,
                "Stripe get_subscription failed"
            );
            return Err(error);
        }

        let subscription: ProviderSubscription = response.json().await.map_err(|e| {
            ProviderApiError::new(
                ProviderErrorCode::Unknown,
                format!("Failed to parse Stripe response: {}", e),
            )
        })?;

        Ok(Some(subscription))
    }
}
