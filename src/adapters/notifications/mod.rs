//! Notification relay adapter.
//!
//! Implements the `NotificationDispatcher` port against the platform's
//! internal notification relay over HTTP.

mod relay;

pub use relay::{HttpNotificationRelay, NotificationRelayConfig};
