//! Typed accessors for checkout and subscription metadata.
//!
//! The provider propagates checkout metadata verbatim (string values only),
//! so every handler parses ids out of the same `HashMap`. These helpers keep
//! the key names and error shapes in one place.

use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::foundation::{DestinationId, RestaurantId, TourId, TourOperatorId, UserId};
use crate::domain::promotion::PromotedEntity;
use crate::domain::subscription::{PlanCadence, SubscriptionScope};
use crate::domain::webhook::{require_metadata, EntityKind, ProcessingError};

/// Parses the `userId` metadata value into a platform user id.
pub(crate) fn user_id(metadata: &HashMap<String, String>) -> Result<UserId, ProcessingError> {
    let raw = require_metadata(metadata, "userId")?;
    let uuid = Uuid::parse_str(raw).map_err(|e| ProcessingError::InvalidMetadata {
        field: "userId",
        reason: e.to_string(),
    })?;
    Ok(UserId::from_uuid(uuid))
}

/// Parses an integer catalog id out of the metadata.
pub(crate) fn int_id(
    metadata: &HashMap<String, String>,
    key: &'static str,
) -> Result<i64, ProcessingError> {
    let raw = require_metadata(metadata, key)?;
    raw.parse().map_err(|_| ProcessingError::InvalidMetadata {
        field: key,
        reason: format!("{:?} is not an integer id", raw),
    })
}

/// Resolves the subscription scope for one of the subscription families.
///
/// Each family has its own natural key in the metadata: `userId` for user
/// subscriptions, `restaurantId` + `destinationId` for restaurant premium,
/// `operatorId` for tour operator premium.
pub(crate) fn subscription_scope(
    kind: EntityKind,
    metadata: &HashMap<String, String>,
) -> Result<SubscriptionScope, ProcessingError> {
    match kind {
        EntityKind::UserSubscription => Ok(SubscriptionScope::User {
            user_id: user_id(metadata)?,
        }),
        EntityKind::RestaurantPremium => {
            let restaurant_id = RestaurantId::new(int_id(metadata, "restaurantId")?);
            let raw_destination = require_metadata(metadata, "destinationId")?;
            let destination_id = DestinationId::new(raw_destination).map_err(|e| {
                ProcessingError::InvalidMetadata {
                    field: "destinationId",
                    reason: e.to_string(),
                }
            })?;
            Ok(SubscriptionScope::Restaurant {
                restaurant_id,
                destination_id,
            })
        }
        EntityKind::TourOperatorPremium => Ok(SubscriptionScope::TourOperator {
            operator_id: TourOperatorId::new(int_id(metadata, "operatorId")?),
        }),
        EntityKind::PromotionUpgrade | EntityKind::PointsPackage => {
            Err(ProcessingError::InvalidMetadata {
                field: "type",
                reason: format!("{} does not describe a subscription scope", kind.as_str()),
            })
        }
    }
}

/// The catalog entity a promotion targets, required form.
///
/// A promotion upgrade names either a restaurant or a tour.
pub(crate) fn promoted_entity(
    metadata: &HashMap<String, String>,
) -> Result<PromotedEntity, ProcessingError> {
    if metadata.contains_key("restaurantId") {
        return Ok(PromotedEntity::Restaurant(RestaurantId::new(int_id(
            metadata,
            "restaurantId",
        )?)));
    }
    if metadata.contains_key("tourId") {
        return Ok(PromotedEntity::Tour(TourId::new(int_id(
            metadata, "tourId",
        )?)));
    }
    Err(ProcessingError::InvalidMetadata {
        field: "type",
        reason: "promotion names neither a restaurantId nor a tourId".to_string(),
    })
}

/// Lenient `(entity, user)` pair for fallback promotion lookups.
///
/// Returns `None` when either value is missing or unparseable; the caller
/// falls back on the subscription-id lookup alone.
pub(crate) fn fallback_identifiers(
    metadata: &HashMap<String, String>,
) -> Option<(PromotedEntity, UserId)> {
    let entity = promoted_entity(metadata).ok()?;
    let user = metadata
        .get("userId")
        .and_then(|raw| Uuid::parse_str(raw).ok())
        .map(UserId::from_uuid)?;
    Some((entity, user))
}

/// Billing cadence from the `premiumPlan` metadata, defaulting to monthly.
///
/// Only consulted for fallback period math, so a missing or unrecognized
/// plan is not an error.
pub(crate) fn cadence(metadata: &HashMap<String, String>) -> PlanCadence {
    metadata
        .get("premiumPlan")
        .and_then(|raw| PlanCadence::from_wire(raw))
        .unwrap_or_default()
}
