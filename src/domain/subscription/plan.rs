//! Billing cadence for premium plans.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

/// How often a premium plan bills.
///
/// Carried in checkout metadata as `premiumPlan` (`"monthly"` or
/// `"yearly"`). The cadence only matters when the provider omits a period
/// end and we have to synthesize one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanCadence {
    Monthly,
    Yearly,
}

impl PlanCadence {
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "monthly" => Some(PlanCadence::Monthly),
            "yearly" => Some(PlanCadence::Yearly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanCadence::Monthly => "monthly",
            PlanCadence::Yearly => "yearly",
        }
    }

    /// Length of one billing period, used only as a fallback when the
    /// provider payload carried no `current_period_end`.
    pub fn fallback_days(&self) -> i64 {
        match self {
            PlanCadence::Monthly => 30,
            PlanCadence::Yearly => 365,
        }
    }

    /// Synthesizes a period end from the given instant.
    pub fn fallback_period_end(&self, from: Timestamp) -> Timestamp {
        from.add_days(self.fallback_days())
    }
}

impl Default for PlanCadence {
    fn default() -> Self {
        PlanCadence::Monthly
    }
}

impl std::fmt::Display for PlanCadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_values() {
        assert_eq!(PlanCadence::from_wire("monthly"), Some(PlanCadence::Monthly));
        assert_eq!(PlanCadence::from_wire("yearly"), Some(PlanCadence::Yearly));
    }

    #[test]
    fn rejects_unknown_wire_values() {
        assert_eq!(PlanCadence::from_wire("weekly"), None);
        assert_eq!(PlanCadence::from_wire("MONTHLY"), None);
        assert_eq!(PlanCadence::from_wire(""), None);
    }

    #[test]
    fn fallback_lengths_match_cadence() {
        assert_eq!(PlanCadence::Monthly.fallback_days(), 30);
        assert_eq!(PlanCadence::Yearly.fallback_days(), 365);
    }

    #[test]
    fn fallback_period_end_extends_from_given_instant() {
        let start = Timestamp::from_unix_secs(1_735_689_600).unwrap();
        let end = PlanCadence::Monthly.fallback_period_end(start);
        assert_eq!(end.as_unix_secs() - start.as_unix_secs(), 30 * 86_400);
    }

    #[test]
    fn defaults_to_monthly() {
        assert_eq!(PlanCadence::default(), PlanCadence::Monthly);
    }
}
