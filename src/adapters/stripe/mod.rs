//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port over Stripe's REST API. Webhook
//! signature verification is not here: it lives in the domain
//! (`domain::webhook::WebhookVerifier`) because it is pure computation
//! over the raw body, not an API integration.

mod client;

pub use client::{StripeClient, StripeClientConfig};
