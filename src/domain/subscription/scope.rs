//! Subscription scope: who or what a subscription belongs to.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DestinationId, RestaurantId, TourOperatorId, UserId};
use crate::domain::webhook::EntityKind;

/// Owner of a subscription record.
///
/// Each variant carries the natural key its store row is looked up by:
/// user subscriptions by user, restaurant premium by restaurant within a
/// destination, operator premium by operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubscriptionScope {
    User {
        user_id: UserId,
    },
    Restaurant {
        restaurant_id: RestaurantId,
        destination_id: DestinationId,
    },
    TourOperator {
        operator_id: TourOperatorId,
    },
}

impl SubscriptionScope {
    /// The checkout metadata family this scope belongs to.
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            SubscriptionScope::User { .. } => EntityKind::UserSubscription,
            SubscriptionScope::Restaurant { .. } => EntityKind::RestaurantPremium,
            SubscriptionScope::TourOperator { .. } => EntityKind::TourOperatorPremium,
        }
    }

    /// Catalog entity id for audit records, when the scope has one.
    pub fn entity_ref(&self) -> Option<String> {
        match self {
            SubscriptionScope::User { .. } => None,
            SubscriptionScope::Restaurant { restaurant_id, .. } => {
                Some(restaurant_id.to_string())
            }
            SubscriptionScope::TourOperator { operator_id } => Some(operator_id.to_string()),
        }
    }

    /// Owning user id, when the scope is user-keyed.
    pub fn user_ref(&self) -> Option<UserId> {
        match self {
            SubscriptionScope::User { user_id } => Some(*user_id),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionScope::User { user_id } => write!(f, "user:{}", user_id),
            SubscriptionScope::Restaurant {
                restaurant_id,
                destination_id,
            } => write!(f, "restaurant:{}@{}", restaurant_id, destination_id),
            SubscriptionScope::TourOperator { operator_id } => {
                write!(f, "operator:{}", operator_id)
            }
        }
    }
}
