//! Application layer - the webhook pipeline and its handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! One command enters (a raw delivery); the processor verifies it, routes
//! it to the family handler, and records the outcome.

pub mod handlers;

pub use handlers::{
    Acknowledgement, EventRouter, PointsCreditApplier, ProcessWebhookCommand, PromotionLedger,
    RoutedCommand, SubscriptionReconciler, WebhookProcessor,
};
