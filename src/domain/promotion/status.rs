//! Promoted-listing status state machine.

use crate::domain::foundation::StateMachine;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a promoted placement.
///
/// Unlike subscriptions, listing rows are per-purchase: a re-promotion
/// creates a fresh row rather than reviving a cancelled one, so the two
/// terminal states really are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    /// Slot reserved before checkout completed. Not shown in the catalog.
    Pending,

    /// Paid placement, shown until `end_date`.
    Active,

    /// Cancelled with the owning subscription. Terminal.
    Cancelled,

    /// Ran past `end_date`; written by the expiry sweep. Terminal.
    Expired,
}

impl PromotionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromotionStatus::Pending => "pending",
            PromotionStatus::Active => "active",
            PromotionStatus::Cancelled => "cancelled",
            PromotionStatus::Expired => "expired",
        }
    }

    /// Returns true if the row occupies the entity's single promotion slot.
    ///
    /// At most one such row may exist per entity at a time.
    pub fn holds_slot(&self) -> bool {
        matches!(self, PromotionStatus::Pending | PromotionStatus::Active)
    }
}

impl std::fmt::Display for PromotionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for PromotionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PromotionStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Active)
                | (Pending, Cancelled)
                | (Pending, Expired)
            // From ACTIVE
                | (Active, Cancelled)
                | (Active, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PromotionStatus::*;
        match self {
            Pending => vec![Active, Cancelled, Expired],
            Active => vec![Cancelled, Expired],
            Cancelled => vec![],
            Expired => vec![],
        }
    }
}
