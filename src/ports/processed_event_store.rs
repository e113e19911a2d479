//! ProcessedEventStore port - Interface for webhook idempotency records.
//!
//! The payment provider delivers events at least once: network timeouts,
//! non-2xx responses, and lost acknowledgements all trigger redelivery.
//! Every verified event lands here exactly once, keyed by the provider's
//! event id, so the processor can short-circuit replays.
//!
//! The fail-open policy (treat a lookup failure as "not processed") belongs
//! to the processor, not the store; implementations report failures
//! honestly.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::webhook::ProcessedEvent;

/// Port for storing and retrieving processed webhook events.
///
/// Implementations must rely on a uniqueness guarantee on `event_id`
/// (primary key) so concurrent deliveries of the same event converge on a
/// single row.
#[async_trait]
pub trait ProcessedEventStore: Send + Sync {
    /// Find a previously recorded event by its provider event id.
    ///
    /// Returns `None` if the event has never finished a handler run.
    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEvent>, DomainError>;

    /// Record the outcome of a handler run, keyed by event id.
    ///
    /// Upsert semantics: a redelivered event that previously failed
    /// overwrites its row with the new outcome.
    async fn upsert(&self, record: &ProcessedEvent) -> Result<(), DomainError>;
}
