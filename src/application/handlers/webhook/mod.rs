pub mod processor;
pub mod router;

pub use processor::{Acknowledgement, ProcessWebhookCommand, WebhookProcessor};
pub use router::{EventRouter, RoutedCommand};
