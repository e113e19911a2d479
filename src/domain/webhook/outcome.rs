//! Processing outcomes for verified webhook events.
//!
//! Once a delivery passes signature verification it is always acknowledged
//! with HTTP 200; the outcome records what actually happened so the event
//! store can decide whether a redelivery should re-run the handler.

use std::fmt;

use super::errors::ProcessingError;

/// Reason an event was acknowledged without changing any state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The provider reported a state we deliberately wait out, such as
    /// `past_due` during a dunning cycle.
    TransientProviderState(String),
    /// No handler is registered for this event type / entity kind pair.
    UnhandledEvent {
        event_type: String,
        entity_kind: Option<String>,
    },
    /// The payment intent was already credited by an earlier delivery.
    AlreadyCredited,
    /// The checkout session completed without a successful payment.
    UnpaidSession(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TransientProviderState(status) => {
                write!(f, "transient provider state: {}", status)
            }
            SkipReason::UnhandledEvent {
                event_type,
                entity_kind,
            } => match entity_kind {
                Some(kind) => write!(f, "no handler for {} / {}", event_type, kind),
                None => write!(f, "no handler for {}", event_type),
            },
            SkipReason::AlreadyCredited => write!(f, "payment intent already credited"),
            SkipReason::UnpaidSession(status) => {
                write!(f, "session payment status is {}", status)
            }
        }
    }
}

/// Result of running a routed command against local state.
#[derive(Debug)]
pub enum Outcome {
    /// State was changed (or an idempotent write confirmed the target state).
    Applied,
    /// Nothing to do; the reason is recorded alongside the event.
    Skipped(SkipReason),
    /// The handler could not complete; the event is stored as failed so a
    /// redelivery re-runs it.
    Failed(ProcessingError),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Outcome::Skipped(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// Short label for structured log fields.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Applied => "applied",
            Outcome::Skipped(_) => "skipped",
            Outcome::Failed(_) => "failed",
        }
    }
}

impl From<ProcessingError> for Outcome {
    fn from(error: ProcessingError) -> Self {
        Outcome::Failed(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Outcome Classification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn applied_outcome_classifies() {
        let outcome = Outcome::Applied;
        assert!(outcome.is_applied());
        assert!(!outcome.is_skipped());
        assert!(!outcome.is_failed());
        assert_eq!(outcome.label(), "applied");
    }

    #[test]
    fn skipped_outcome_classifies() {
        let outcome = Outcome::Skipped(SkipReason::AlreadyCredited);
        assert!(outcome.is_skipped());
        assert_eq!(outcome.label(), "skipped");
    }

    #[test]
    fn failed_outcome_classifies() {
        let outcome = Outcome::Failed(ProcessingError::Persistence("write failed".to_string()));
        assert!(outcome.is_failed());
        assert_eq!(outcome.label(), "failed");
    }

    #[test]
    fn processing_error_converts_to_failed() {
        let outcome: Outcome = ProcessingError::InvalidSignature.into();
        assert!(outcome.is_failed());
    }

    // ══════════════════════════════════════════════════════════════
    // Skip Reason Display Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn transient_state_display_names_status() {
        let reason = SkipReason::TransientProviderState("past_due".to_string());
        assert_eq!(reason.to_string(), "transient provider state: past_due");
    }

    #[test]
    fn unhandled_event_display_includes_kind_when_present() {
        let reason = SkipReason::UnhandledEvent {
            event_type: "customer.subscription.updated".to_string(),
            entity_kind: Some("points_package".to_string()),
        };
        assert_eq!(
            reason.to_string(),
            "no handler for customer.subscription.updated / points_package"
        );
    }

    #[test]
    fn unhandled_event_display_omits_missing_kind() {
        let reason = SkipReason::UnhandledEvent {
            event_type: "charge.refunded".to_string(),
            entity_kind: None,
        };
        assert_eq!(reason.to_string(), "no handler for charge.refunded");
    }

    #[test]
    fn unpaid_session_display_names_status() {
        let reason = SkipReason::UnpaidSession("unpaid".to_string());
        assert_eq!(reason.to_string(), "session payment status is unpaid");
    }
}
