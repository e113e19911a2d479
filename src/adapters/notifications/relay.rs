//! HTTP notification relay.
//!
//! Forwards templated notifications to the platform's relay service. The
//! webhook pipeline treats sends as fire-and-forget; this adapter still
//! reports failures so the spawned task can log them.

use std::collections::HashMap;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::NotificationDispatcher;

/// Relay endpoint configuration.
#[derive(Clone)]
pub struct NotificationRelayConfig {
    /// Base URL of the relay service.
    base_url: String,

    /// Bearer token for the relay, when it requires one.
    auth_token: Option<SecretString>,
}

impl NotificationRelayConfig {
    /// Create a new relay configuration.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_token: None,
        }
    }

    /// Attach a bearer token.
    pub fn with_auth_token(mut self, token: SecretString) -> Self {
        self.auth_token = Some(token);
        self
    }
}

/// Wire format for a relay send.
#[derive(Debug, Serialize)]
struct SendNotificationRequest<'a> {
    template: &'a str,
    recipient: &'a str,
    params: &'a HashMap<String, String>,
}

/// HTTP implementation of the NotificationDispatcher port.
pub struct HttpNotificationRelay {
    config: NotificationRelayConfig,
    http_client: reqwest::Client,
}

impl HttpNotificationRelay {
    /// Create a new relay client with the given configuration.
    pub fn new(config: NotificationRelayConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationDispatcher for HttpNotificationRelay {
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        params: HashMap<String, String>,
    ) -> Result<(), DomainError> {
        let url = format!("{}/notifications", self.config.base_url);
        let body = SendNotificationRequest {
            template,
            recipient,
            params: &params,
        };

        let mut request = self.http_client.post(&url).json(&body);
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            DomainError::new(
                ErrorCode::NotificationError,
                format!("Notification relay unreachable: {}", e),
            )
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                format!("Notification relay returned {}: {}", status, error_text),
            ));
        }

        Ok(())
    }
}
