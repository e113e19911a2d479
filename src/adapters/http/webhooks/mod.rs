//! HTTP adapter for provider webhook ingestion.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{WebhookApiError, WebhookAppState};
pub use routes::{webhook_router, webhook_routes};
