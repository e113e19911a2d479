//! Entity family capability flags

use serde::Deserialize;

/// Per-family processing switches
///
/// Each flag gates one checkout/subscription family in the event router.
/// Disabling a family makes its events acknowledged-but-skipped, which is
/// how a half-rolled-out product (or an incident) is kept from writing
/// rows the rest of the platform is not ready for.
#[derive(Debug, Clone, Deserialize)]
pub struct FeaturesConfig {
    /// Process personal user subscriptions
    #[serde(default = "default_enabled")]
    pub user_subscriptions: bool,

    /// Process restaurant premium subscriptions
    #[serde(default = "default_enabled")]
    pub restaurant_premium: bool,

    /// Process tour operator premium subscriptions
    #[serde(default = "default_enabled")]
    pub tour_operator_premium: bool,

    /// Process standalone promoted-listing upgrades
    #[serde(default = "default_enabled")]
    pub promotion_upgrades: bool,

    /// Process one-time points package purchases
    #[serde(default = "default_enabled")]
    pub points_packages: bool,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            user_subscriptions: true,
            restaurant_premium: true,
            tour_operator_premium: true,
            promotion_upgrades: true,
            points_packages: true,
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_family_defaults_on() {
        let features = FeaturesConfig::default();
        assert!(features.user_subscriptions);
        assert!(features.restaurant_premium);
        assert!(features.tour_operator_premium);
        assert!(features.promotion_upgrades);
        assert!(features.points_packages);
    }

    #[test]
    fn omitted_fields_deserialize_on() {
        let features: FeaturesConfig =
            serde_json::from_str(r#"{"points_packages": false}"#).unwrap();
        assert!(features.user_subscriptions);
        assert!(features.restaurant_premium);
        assert!(!features.points_packages);
    }
}
