//! Webhook domain: envelope decoding, signature verification, and the
//! idempotency records that make at-least-once delivery safe.

pub mod envelope;
pub mod errors;
pub mod outcome;
pub mod payloads;
pub mod processed_event;
pub mod verifier;

pub use envelope::{EventKind, ProviderEvent};
pub use errors::ProcessingError;
pub use outcome::{Outcome, SkipReason};
pub use payloads::{require_metadata, CheckoutSession, EntityKind, Invoice, ProviderSubscription};
pub use processed_event::{EntityRefs, ProcessedEvent, ProcessingStatus};
pub use verifier::{SignatureHeader, WebhookVerifier};

#[cfg(test)]
pub use envelope::ProviderEventBuilder;
#[cfg(test)]
pub use verifier::compute_test_signature;
