//! Recording notification dispatcher for testing.
//!
//! Captures every send for assertions instead of delivering anything.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::NotificationDispatcher;

/// A notification captured by [`RecordingNotificationDispatcher`].
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub template: String,
    pub recipient: String,
    pub params: HashMap<String, String>,
}

/// In-memory `NotificationDispatcher` that records sends.
#[derive(Default)]
pub struct RecordingNotificationDispatcher {
    sent: Mutex<Vec<SentNotification>>,
    next_error: Mutex<Option<DomainError>>,
}

impl RecordingNotificationDispatcher {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an error to return on the next send.
    pub fn fail_next_send(&self, error: DomainError) {
        *self
            .next_error
            .lock()
            .expect("RecordingNotificationDispatcher: next_error lock poisoned") = Some(error);
    }

    /// All captured notifications, in send order.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .expect("RecordingNotificationDispatcher: sent lock poisoned")
            .clone()
    }

    /// Count of captured notifications.
    pub fn sent_count(&self) -> usize {
        self.sent
            .lock()
            .expect("RecordingNotificationDispatcher: sent lock poisoned")
            .len()
    }

    /// Whether a template was sent at least once.
    pub fn was_sent(&self, template: &str) -> bool {
        self.sent
            .lock()
            .expect("RecordingNotificationDispatcher: sent lock poisoned")
            .iter()
            .any(|n| n.template == template)
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingNotificationDispatcher {
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        params: HashMap<String, String>,
    ) -> Result<(), DomainError> {
        if let Some(error) = self
            .next_error
            .lock()
            .expect("RecordingNotificationDispatcher: next_error lock poisoned")
            .take()
        {
            return Err(error);
        }

        self.sent
            .lock()
            .expect("RecordingNotificationDispatcher: sent lock poisoned")
            .push(SentNotification {
                template: template.to_string(),
                recipient: recipient.to_string(),
                params,
            });
        Ok(())
    }
}
