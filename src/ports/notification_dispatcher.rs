//! NotificationDispatcher port - Outbound user notifications.
//!
//! Notifications are strictly fire-and-forget: the webhook pipeline spawns
//! the send and never awaits or inspects the result. A notification failure
//! must not change an event's outcome, so adapters log errors instead of
//! surfacing them.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Port for dispatching templated notifications to users.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Send a templated notification to a recipient.
    ///
    /// `template` names the message (e.g. `subscription_activated`),
    /// `recipient` is the user's id, and `params` fills the template's
    /// placeholders.
    async fn send(
        &self,
        template: &str,
        recipient: &str,
        params: HashMap<String, String>,
    ) -> Result<(), DomainError>;
}
