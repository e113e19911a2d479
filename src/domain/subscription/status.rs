//! Subscription status state machine and the provider status mapping.
//!
//! Local status is reconciled from whatever the payment provider reports;
//! the mapping here is the single place that translation is defined.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Local subscription lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Checkout started but no confirmed payment yet. No benefits.
    Pending,

    /// Paid and current. Full benefits.
    Active,

    /// Cancellation scheduled at period end. Benefits continue until then.
    PendingCancellation,

    /// Provider reports a non-benefit state (trialing ended oddly,
    /// incomplete, paused). No benefits, but the row is kept.
    Inactive,

    /// Cancelled or written off as unpaid. No benefits.
    Cancelled,

    /// Period lapsed; written by the expiry sweep, never by the webhook
    /// engine itself.
    Expired,
}

impl SubscriptionStatus {
    /// Returns true if this status grants the premium benefits the
    /// subscription pays for (placement, visibility, member features).
    ///
    /// `PendingCancellation` still grants benefits: the user paid through
    /// the end of the period.
    pub fn grants_benefits(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Active | SubscriptionStatus::PendingCancellation
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PendingCancellation => "pending_cancellation",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
        }
    }

    /// Maps a provider-reported subscription status onto the local
    /// lifecycle. Used uniformly by every reconciling event handler.
    ///
    /// `past_due` maps to no change at all: the provider is still retrying
    /// the charge and will send a terminal status when dunning resolves.
    pub fn map_provider_status(
        provider_status: &str,
        cancel_at_period_end: bool,
    ) -> ProviderStatusMapping {
        match provider_status {
            "active" if cancel_at_period_end => {
                ProviderStatusMapping::Set(SubscriptionStatus::PendingCancellation)
            }
            "active" => ProviderStatusMapping::Set(SubscriptionStatus::Active),
            "canceled" | "unpaid" => ProviderStatusMapping::Set(SubscriptionStatus::Cancelled),
            "past_due" => ProviderStatusMapping::KeepCurrent,
            _ => ProviderStatusMapping::Set(SubscriptionStatus::Inactive),
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of mapping a provider status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatusMapping {
    /// Overwrite the local status with this value.
    Set(SubscriptionStatus),
    /// Dunning in progress; leave the local status untouched.
    KeepCurrent,
}

/// Returns true if a provider status is acceptable for first activation.
///
/// A fresh checkout only activates benefits when the provider confirms the
/// subscription is actually running; `trialing` counts because the provider
/// collects payment details up front.
pub fn is_activatable_provider_status(provider_status: &str) -> bool {
    matches!(provider_status, "active" | "trialing")
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Active)
                | (Pending, Inactive)
                | (Pending, Cancelled)
                | (Pending, Expired)
            // From ACTIVE
                | (Active, Active) // Renewal
                | (Active, PendingCancellation)
                | (Active, Inactive)
                | (Active, Cancelled)
                | (Active, Expired)
            // From PENDING_CANCELLATION
                | (PendingCancellation, Active) // Cancellation undone
                | (PendingCancellation, PendingCancellation)
                | (PendingCancellation, Inactive)
                | (PendingCancellation, Cancelled)
                | (PendingCancellation, Expired)
            // From INACTIVE
                | (Inactive, Active) // Payment recovered
                | (Inactive, Inactive)
                | (Inactive, PendingCancellation)
                | (Inactive, Cancelled)
                | (Inactive, Expired)
            // From CANCELLED
                | (Cancelled, Active) // Resubscribe reuses the row
                | (Cancelled, Expired)
            // From EXPIRED
                | (Expired, Active) // Resubscribe
                | (Expired, Pending)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Active, Inactive, Cancelled, Expired],
            Active => vec![Active, PendingCancellation, Inactive, Cancelled, Expired],
            PendingCancellation => {
                vec![Active, PendingCancellation, Inactive, Cancelled, Expired]
            }
            Inactive => vec![Active, Inactive, PendingCancellation, Cancelled, Expired],
            Cancelled => vec![Active, Expired],
            Expired => vec![Active, Pending],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ══════════════════════════════════════════════════════════════
    // Provider Status Mapping Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn active_maps_to_active() {
        assert_eq!(
            SubscriptionStatus::map_provider_status("active", false),
            ProviderStatusMapping::Set(SubscriptionStatus::Active)
        );
    }

    #[test]
    fn active_with_scheduled_cancel_maps_to_pending_cancellation() {
        assert_eq!(
            SubscriptionStatus::map_provider_status("active", true),
            ProviderStatusMapping::Set(SubscriptionStatus::PendingCancellation)
        );
    }

    #[test]
    fn canceled_and_unpaid_map_to_cancelled() {
        assert_eq!(
            SubscriptionStatus::map_provider_status("canceled", false),
            ProviderStatusMapping::Set(SubscriptionStatus::Cancelled)
        );
        assert_eq!(
            SubscriptionStatus::map_provider_status("unpaid", false),
            ProviderStatusMapping::Set(SubscriptionStatus::Cancelled)
        );
    }

    #[test]
    fn cancel_flag_does_not_override_terminal_statuses() {
        // cancel_at_period_end only matters while the subscription is active
        assert_eq!(
            SubscriptionStatus::map_provider_status("canceled", true),
            ProviderStatusMapping::Set(SubscriptionStatus::Cancelled)
        );
    }

    #[test]
    fn past_due_keeps_current_status() {
        assert_eq!(
            SubscriptionStatus::map_provider_status("past_due", false),
            ProviderStatusMapping::KeepCurrent
        );
        assert_eq!(
            SubscriptionStatus::map_provider_status("past_due", true),
            ProviderStatusMapping::KeepCurrent
        );
    }

    #[test]
    fn unrecognized_statuses_map_to_inactive() {
        for status in ["trialing", "incomplete", "incomplete_expired", "paused", ""] {
            assert_eq!(
                SubscriptionStatus::map_provider_status(status, false),
                ProviderStatusMapping::Set(SubscriptionStatus::Inactive),
                "provider status {:?} should map to inactive",
                status
            );
        }
    }

    #[test]
    fn activation_guard_accepts_active_and_trialing() {
        assert!(is_activatable_provider_status("active"));
        assert!(is_activatable_provider_status("trialing"));
        assert!(!is_activatable_provider_status("past_due"));
        assert!(!is_activatable_provider_status("incomplete"));
        assert!(!is_activatable_provider_status("canceled"));
    }

    // ══════════════════════════════════════════════════════════════
    // Benefit Gating Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn active_grants_benefits() {
        assert!(SubscriptionStatus::Active.grants_benefits());
    }

    #[test]
    fn pending_cancellation_keeps_benefits_until_period_end() {
        assert!(SubscriptionStatus::PendingCancellation.grants_benefits());
    }

    #[test]
    fn non_paying_statuses_grant_nothing() {
        assert!(!SubscriptionStatus::Pending.grants_benefits());
        assert!(!SubscriptionStatus::Inactive.grants_benefits());
        assert!(!SubscriptionStatus::Cancelled.grants_benefits());
        assert!(!SubscriptionStatus::Expired.grants_benefits());
    }

    // ══════════════════════════════════════════════════════════════
    // State Transition Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn pending_can_activate() {
        let status = SubscriptionStatus::Pending;
        assert!(status.can_transition_to(&SubscriptionStatus::Active));

        let result = status.transition_to(SubscriptionStatus::Active);
        assert_eq!(result, Ok(SubscriptionStatus::Active));
    }

    #[test]
    fn pending_cannot_schedule_cancellation() {
        let status = SubscriptionStatus::Pending;
        assert!(!status.can_transition_to(&SubscriptionStatus::PendingCancellation));
    }

    #[test]
    fn active_can_renew_to_active() {
        let status = SubscriptionStatus::Active;
        assert_eq!(
            status.transition_to(SubscriptionStatus::Active),
            Ok(SubscriptionStatus::Active)
        );
    }

    #[test]
    fn pending_cancellation_can_be_undone() {
        let status = SubscriptionStatus::PendingCancellation;
        assert!(status.can_transition_to(&SubscriptionStatus::Active));
    }

    #[test]
    fn cancelled_can_reactivate_on_resubscribe() {
        let status = SubscriptionStatus::Cancelled;
        assert!(status.can_transition_to(&SubscriptionStatus::Active));
        assert!(!status.can_transition_to(&SubscriptionStatus::PendingCancellation));
    }

    #[test]
    fn expired_can_only_restart() {
        let status = SubscriptionStatus::Expired;
        assert!(status.can_transition_to(&SubscriptionStatus::Active));
        assert!(status.can_transition_to(&SubscriptionStatus::Pending));
        assert!(!status.can_transition_to(&SubscriptionStatus::Cancelled));
    }

    #[test]
    fn valid_transitions_are_consistent_with_can_transition_to() {
        for status in [
            SubscriptionStatus::Pending,
            SubscriptionStatus::Active,
            SubscriptionStatus::PendingCancellation,
            SubscriptionStatus::Inactive,
            SubscriptionStatus::Cancelled,
            SubscriptionStatus::Expired,
        ] {
            for valid_target in status.valid_transitions() {
                assert!(
                    status.can_transition_to(&valid_target),
                    "can_transition_to should return true for {:?} -> {:?}",
                    status,
                    valid_target
                );
            }
        }
    }

    #[test]
    fn status_strings_are_snake_case() {
        assert_eq!(SubscriptionStatus::PendingCancellation.as_str(), "pending_cancellation");
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::PendingCancellation).unwrap(),
            "\"pending_cancellation\""
        );
    }
}
