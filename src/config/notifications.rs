//! Notification relay configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Notification relay configuration
///
/// The engine forwards user-facing notices (subscription activated, points
/// credited) to the platform's relay service over HTTP.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Base URL of the relay service
    pub relay_url: String,

    /// Bearer token for the relay, when it requires one
    #[serde(default)]
    pub relay_auth_token: Option<SecretString>,
}

impl NotificationsConfig {
    /// Validate notification configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.relay_url.is_empty() {
            return Err(ValidationError::MissingRequired("NOTIFICATIONS_RELAY_URL"));
        }
        if !self.relay_url.starts_with("http://") && !self.relay_url.starts_with("https://") {
            return Err(ValidationError::InvalidRelayUrl);
        }
        if let Some(token) = &self.relay_auth_token {
            if token.expose_secret().is_empty() {
                return Err(ValidationError::MissingRequired(
                    "NOTIFICATIONS_RELAY_AUTH_TOKEN",
                ));
            }
        }
        Ok(())
    }
}
