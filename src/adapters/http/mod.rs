//! HTTP adapters - REST API implementations.

pub mod health;
pub mod webhooks;

// Re-export key types for convenience
pub use health::{health_router, HealthAppState};
pub use webhooks::{webhook_router, WebhookAppState};
