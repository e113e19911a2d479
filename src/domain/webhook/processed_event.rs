//! Processed-event records for the idempotency gate.
//!
//! Every verified delivery ends up as one row keyed by the provider's event
//! id. Redeliveries are short-circuited only when the stored status says the
//! event already ran to completion.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::outcome::Outcome;

/// Terminal status stored for a handled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// The event ran to completion (applied or deliberately skipped).
    Processed,
    /// The handler failed; a redelivery should re-run it.
    Failed,
    /// Reserved for out-of-band replay tooling; never written by the engine.
    Retrying,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Processed => "processed",
            ProcessingStatus::Failed => "failed",
            ProcessingStatus::Retrying => "retrying",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "processed" => Some(ProcessingStatus::Processed),
            "failed" => Some(ProcessingStatus::Failed),
            "retrying" => Some(ProcessingStatus::Retrying),
            _ => None,
        }
    }

    /// Only a completed run blocks reprocessing; failed and retrying rows
    /// re-run on the next delivery.
    pub fn blocks_reprocessing(&self) -> bool {
        matches!(self, ProcessingStatus::Processed)
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifiers touched by an event, extracted for audit queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRefs {
    /// Provider subscription id, when the event carried one.
    pub subscription_id: Option<String>,
    /// Catalog entity id (restaurant, operator, or tour).
    pub entity_id: Option<String>,
    /// Platform user id from the session metadata.
    pub user_id: Option<String>,
}

impl EntityRefs {
    pub fn with_subscription(mut self, id: impl Into<String>) -> Self {
        self.subscription_id = Some(id.into());
        self
    }

    pub fn with_entity(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    pub fn with_user(mut self, id: impl Into<String>) -> Self {
        self.user_id = Some(id.into());
        self
    }
}

/// One row in the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    /// Provider event id; the idempotency key.
    pub event_id: String,
    /// Provider event type, stored verbatim for audit.
    pub event_type: String,
    pub status: ProcessingStatus,
    pub processed_at: Timestamp,
    #[serde(flatten)]
    pub entity_refs: EntityRefs,
    /// Failure message, or the skip reason for deliberate no-ops.
    pub error_message: Option<String>,
}

impl ProcessedEvent {
    /// Builds the record to persist for a finished handler run.
    ///
    /// Skips are stored as `processed` so redeliveries do not re-run them;
    /// the reason lands in `error_message` for operators reading the table.
    pub fn from_outcome(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        entity_refs: EntityRefs,
        outcome: &Outcome,
    ) -> Self {
        let (status, error_message) = match outcome {
            Outcome::Applied => (ProcessingStatus::Processed, None),
            Outcome::Skipped(reason) => {
                (ProcessingStatus::Processed, Some(reason.to_string()))
            }
            Outcome::Failed(error) => (ProcessingStatus::Failed, Some(error.to_string())),
        };

        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            status,
            processed_at: Timestamp::now(),
            entity_refs,
            error_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::webhook::errors::ProcessingError;
    use crate::domain::webhook::outcome::SkipReason;

    // ══════════════════════════════════════════════════════════════
    // Processing Status Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            ProcessingStatus::Processed,
            ProcessingStatus::Failed,
            ProcessingStatus::Retrying,
        ] {
            assert_eq!(ProcessingStatus::from_str(status.as_str()), Some(status));
        }
    }

    #[test]
    fn unknown_status_string_is_rejected() {
        assert_eq!(ProcessingStatus::from_str("pending"), None);
        assert_eq!(ProcessingStatus::from_str(""), None);
    }

    #[test]
    fn only_processed_blocks_reprocessing() {
        assert!(ProcessingStatus::Processed.blocks_reprocessing());
        assert!(!ProcessingStatus::Failed.blocks_reprocessing());
        assert!(!ProcessingStatus::Retrying.blocks_reprocessing());
    }

    // ══════════════════════════════════════════════════════════════
    // Record Construction Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn applied_outcome_stores_processed_without_message() {
        let record = ProcessedEvent::from_outcome(
            "evt_123",
            "checkout.session.completed",
            EntityRefs::default().with_user("usr_1"),
            &Outcome::Applied,
        );

        assert_eq!(record.event_id, "evt_123");
        assert_eq!(record.status, ProcessingStatus::Processed);
        assert!(record.error_message.is_none());
        assert_eq!(record.entity_refs.user_id.as_deref(), Some("usr_1"));
    }

    #[test]
    fn skipped_outcome_stores_processed_with_reason() {
        let outcome = Outcome::Skipped(SkipReason::TransientProviderState("past_due".to_string()));
        let record = ProcessedEvent::from_outcome(
            "evt_456",
            "invoice.payment_failed",
            EntityRefs::default().with_subscription("sub_9"),
            &outcome,
        );

        assert_eq!(record.status, ProcessingStatus::Processed);
        assert_eq!(
            record.error_message.as_deref(),
            Some("transient provider state: past_due")
        );
    }

    #[test]
    fn failed_outcome_stores_failed_with_error() {
        let outcome = Outcome::Failed(ProcessingError::Persistence("pool exhausted".to_string()));
        let record = ProcessedEvent::from_outcome(
            "evt_789",
            "customer.subscription.updated",
            EntityRefs::default(),
            &outcome,
        );

        assert_eq!(record.status, ProcessingStatus::Failed);
        assert!(record
            .error_message
            .as_deref()
            .unwrap()
            .contains("pool exhausted"));
        assert!(!record.status.blocks_reprocessing());
    }

    #[test]
    fn entity_refs_builder_sets_each_field() {
        let refs = EntityRefs::default()
            .with_subscription("sub_1")
            .with_entity("42")
            .with_user("usr_2");

        assert_eq!(refs.subscription_id.as_deref(), Some("sub_1"));
        assert_eq!(refs.entity_id.as_deref(), Some("42"));
        assert_eq!(refs.user_id.as_deref(), Some("usr_2"));
    }
}
