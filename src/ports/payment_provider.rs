//! PaymentProvider port - Interface to the upstream billing system.
//!
//! Webhook payloads can be stale by the time they arrive; the provider's
//! API is the source of truth. This port covers the single call the engine
//! makes: re-fetching a subscription before trusting an event's claim
//! about it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::webhook::{ProcessingError, ProviderSubscription};

/// Port for querying the payment provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Fetch a subscription by provider id.
    ///
    /// Returns `None` for an unknown id (the provider's 404), which callers
    /// treat as a failed verification rather than a transport error.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, ProviderApiError>;
}

/// Categorized failure from a provider API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorCode {
    /// Could not reach the provider (DNS, connect, timeout).
    NetworkError,
    /// The provider rejected our credentials.
    AuthenticationError,
    /// The provider throttled us.
    RateLimited,
    /// We sent something the provider refused.
    InvalidRequest,
    /// The provider reported an internal fault (5xx).
    ProviderUnavailable,
    /// Anything the mapping did not recognize.
    Unknown,
}

impl ProviderErrorCode {
    /// Whether the same call could plausibly succeed if retried.
    ///
    /// The engine does not retry in-process; this feeds logging so
    /// operators can tell transport blips from configuration faults.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderErrorCode::NetworkError
                | ProviderErrorCode::RateLimited
                | ProviderErrorCode::ProviderUnavailable
        )
    }
}

impl std::fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderErrorCode::NetworkError => "NETWORK_ERROR",
            ProviderErrorCode::AuthenticationError => "AUTHENTICATION_ERROR",
            ProviderErrorCode::RateLimited => "RATE_LIMITED",
            ProviderErrorCode::InvalidRequest => "INVALID_REQUEST",
            ProviderErrorCode::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            ProviderErrorCode::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// Error from a provider API call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderApiError {
    /// Error category.
    pub code: ProviderErrorCode,

    /// Human-readable message.
    pub message: String,

    /// The provider's own error code, when it sent one.
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl ProviderApiError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::AuthenticationError, message)
    }
}

impl std::fmt::Display for ProviderApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProviderApiError {}

impl From<ProviderApiError> for ProcessingError {
    fn from(error: ProviderApiError) -> Self {
        ProcessingError::Provider(error.to_string())
    }
}
