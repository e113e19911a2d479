//! Typed payloads for the provider objects we handle.
//!
//! Each struct captures only the fields the engine acts on; everything else
//! in the provider's schema is ignored during deserialization. Checkout
//! metadata is the multiplexing point: the same generic event types carry
//! user subscriptions, restaurant premium plans, tour operator plans,
//! promotion upgrades, and points purchases, distinguished by the metadata
//! `type` field.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::errors::ProcessingError;

/// Entity families distinguished by the checkout metadata `type` field.
///
/// The provider propagates checkout metadata onto the subscription it
/// creates, so `customer.subscription.*` events resolve their family from
/// the subscription's own metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A platform user's personal subscription.
    UserSubscription,
    /// A restaurant's premium placement subscription.
    RestaurantPremium,
    /// A tour operator's premium subscription.
    TourOperatorPremium,
    /// A standalone promoted-listing upgrade.
    PromotionUpgrade,
    /// A one-time points package purchase.
    PointsPackage,
}

impl EntityKind {
    /// Parse the metadata `type` value.
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "user_subscription" => Some(Self::UserSubscription),
            "restaurant_premium" => Some(Self::RestaurantPremium),
            "tour_operator_premium" => Some(Self::TourOperatorPremium),
            "promotion_upgrade" => Some(Self::PromotionUpgrade),
            "points_package" => Some(Self::PointsPackage),
            _ => None,
        }
    }

    /// The metadata value for this family.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserSubscription => "user_subscription",
            Self::RestaurantPremium => "restaurant_premium",
            Self::TourOperatorPremium => "tour_operator_premium",
            Self::PromotionUpgrade => "promotion_upgrade",
            Self::PointsPackage => "points_package",
        }
    }
}

/// Returns a non-empty metadata value or the error naming the missing key.
pub fn require_metadata<'a>(
    metadata: &'a HashMap<String, String>,
    key: &'static str,
) -> Result<&'a str, ProcessingError> {
    metadata
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or(ProcessingError::MissingMetadata(key))
}

/// A completed checkout session.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutSession {
    /// Session identifier (cs_xxx format).
    pub id: String,

    /// Provider customer id, when the session created or reused one.
    #[serde(default)]
    pub customer: Option<String>,

    /// Provider subscription id for subscription-mode checkouts.
    #[serde(default)]
    pub subscription: Option<String>,

    /// Payment intent id for one-time payments (points packages).
    #[serde(default)]
    pub payment_intent: Option<String>,

    /// Payment status: "paid", "unpaid", or "no_payment_required".
    pub payment_status: String,

    /// Checkout mode: "subscription" or "payment".
    #[serde(default)]
    pub mode: Option<String>,

    /// Metadata attached at checkout creation.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutSession {
    /// True when the provider reports the session as paid.
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Entity family from the metadata `type` field.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        self.metadata.get("type").and_then(|v| EntityKind::from_wire(v))
    }

    /// Required metadata accessor.
    pub fn meta(&self, key: &'static str) -> Result<&str, ProcessingError> {
        require_metadata(&self.metadata, key)
    }
}

/// The provider's authoritative subscription object.
///
/// This is the shape delivered in `customer.subscription.*` events and the
/// shape returned by the upstream re-fetch; the reconciler consumes both
/// through this one type.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderSubscription {
    /// Subscription identifier (sub_xxx format).
    pub id: String,

    /// Provider customer id.
    #[serde(default)]
    pub customer: Option<String>,

    /// Provider status string: active, trialing, past_due, canceled,
    /// unpaid, incomplete, incomplete_expired, paused.
    pub status: String,

    /// Start of the current billing period (Unix seconds).
    #[serde(default)]
    pub current_period_start: Option<i64>,

    /// End of the current billing period (Unix seconds). Authoritative over
    /// any locally derived date.
    #[serde(default)]
    pub current_period_end: Option<i64>,

    /// True when the subscription will lapse at the period end.
    #[serde(default)]
    pub cancel_at_period_end: bool,

    /// When the subscription was cancelled, if it was.
    #[serde(default)]
    pub canceled_at: Option<i64>,

    /// Metadata propagated from checkout `subscription_data`.
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Line items; the first price id identifies the purchased plan.
    #[serde(default)]
    pub items: SubscriptionItems,
}

impl ProviderSubscription {
    /// Entity family from the metadata `type` field.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        self.metadata.get("type").and_then(|v| EntityKind::from_wire(v))
    }

    /// Required metadata accessor.
    pub fn meta(&self, key: &'static str) -> Result<&str, ProcessingError> {
        require_metadata(&self.metadata, key)
    }

    /// Price id of the first line item, if present.
    pub fn price_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.id.as_str())
    }

    /// Billing period start as a timestamp, when present and in range.
    pub fn period_start(&self) -> Option<Timestamp> {
        self.current_period_start.and_then(Timestamp::from_unix_secs)
    }

    /// Billing period end as a timestamp, when present and in range.
    ///
    /// Authoritative whenever it yields a value; callers only synthesize a
    /// fallback when this returns `None`.
    pub fn period_end(&self) -> Option<Timestamp> {
        self.current_period_end.and_then(Timestamp::from_unix_secs)
    }
}

/// Subscription line item container.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubscriptionItems {
    #[serde(default)]
    pub data: Vec<SubscriptionItem>,
}

/// A single subscription line item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionItem {
    pub price: ItemPrice,
}

/// The price attached to a line item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemPrice {
    pub id: String,
}

/// An invoice, delivered when a payment attempt fails.
///
/// The invoice itself only tells us which subscription to re-fetch; the
/// re-fetched subscription's status decides what, if anything, changes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Invoice {
    /// Invoice identifier (in_xxx format).
    pub id: String,

    /// Provider customer id.
    #[serde(default)]
    pub customer: Option<String>,

    /// The subscription this invoice bills, when there is one.
    #[serde(default)]
    pub subscription: Option<String>,

    /// Invoice status string.
    #[serde(default)]
    pub status: Option<String>,

    /// Amount still owed, in the smallest currency unit.
    #[serde(default)]
    pub amount_due: i64,

    /// How many collection attempts the provider has made.
    #[serde(default)]
    pub attempt_count: i64,

    /// Invoice metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}
