//! Promoted-listing aggregate.
//!
//! A time-bounded featured placement for a catalog entity, sold alongside a
//! subscription. Rows are created `pending` by the catalog flow before
//! checkout; this engine only activates, extends, and cancels them.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, ListingId, RestaurantId, SubscriptionId, Timestamp, TourId, UserId,
};

use super::PromotionStatus;

/// The catalog entity a placement promotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "listing_type", content = "entity_id", rename_all = "snake_case")]
pub enum PromotedEntity {
    Restaurant(RestaurantId),
    Tour(TourId),
}

impl PromotedEntity {
    /// Listing type discriminator as stored.
    pub fn listing_type(&self) -> &'static str {
        match self {
            PromotedEntity::Restaurant(_) => "restaurant",
            PromotedEntity::Tour(_) => "tour",
        }
    }

    /// Catalog row id of the promoted entity.
    pub fn entity_id(&self) -> i64 {
        match self {
            PromotedEntity::Restaurant(id) => id.as_i64(),
            PromotedEntity::Tour(id) => id.as_i64(),
        }
    }
}

impl std::fmt::Display for PromotedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.listing_type(), self.entity_id())
    }
}

/// A promoted placement.
///
/// # Invariants
///
/// - At most one `pending` or `active` row per entity at a time
/// - `stripe_subscription_id` is cleared when the row is cancelled
/// - `end_date` follows the owning subscription's `current_period_end`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionListing {
    /// Unique identifier for this placement.
    pub id: ListingId,

    /// The entity being promoted.
    pub entity: PromotedEntity,

    /// Platform user who purchased the placement. Used by the fallback
    /// cancellation lookup when the subscription link is missing.
    pub user_id: UserId,

    /// Current lifecycle status.
    pub status: PromotionStatus,

    /// When the placement went live.
    pub start_date: Option<Timestamp>,

    /// When the placement stops showing.
    pub end_date: Option<Timestamp>,

    /// Provider subscription funding this placement.
    pub stripe_subscription_id: Option<String>,

    /// Local subscription record this placement is bundled with.
    pub parent_subscription_id: Option<SubscriptionId>,

    /// When the row was created.
    pub created_at: Timestamp,

    /// When the row was last updated.
    pub updated_at: Timestamp,
}

impl PromotionListing {
    /// Creates a pending slot reservation.
    ///
    /// Normally written by the catalog flow before checkout; this engine
    /// only consumes pending rows.
    pub fn new_pending(entity: PromotedEntity, user_id: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            id: ListingId::new(),
            entity,
            user_id,
            status: PromotionStatus::Pending,
            start_date: None,
            end_date: None,
            stripe_subscription_id: None,
            parent_subscription_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an already-active placement.
    ///
    /// Fallback path for a paid event arriving with no pending row to
    /// convert; callers log the anomaly.
    pub fn new_active(
        entity: PromotedEntity,
        user_id: UserId,
        end_date: Timestamp,
        stripe_subscription_id: Option<String>,
        parent_subscription_id: Option<SubscriptionId>,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: ListingId::new(),
            entity,
            user_id,
            status: PromotionStatus::Active,
            start_date: Some(now),
            end_date: Some(end_date),
            stripe_subscription_id,
            parent_subscription_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Activates a pending placement after payment.
    ///
    /// Idempotent: activating an already-active row is a no-op, so repeated
    /// deliveries of the paid event converge on one active row.
    ///
    /// # Errors
    ///
    /// Returns error for cancelled or expired rows.
    pub fn activate(
        &mut self,
        end_date: Timestamp,
        stripe_subscription_id: Option<String>,
        parent_subscription_id: Option<SubscriptionId>,
    ) -> Result<(), DomainError> {
        if self.status == PromotionStatus::Active {
            return Ok(());
        }

        self.transition_to(PromotionStatus::Active)?;
        self.start_date = Some(Timestamp::now());
        self.end_date = Some(end_date);
        if stripe_subscription_id.is_some() {
            self.stripe_subscription_id = stripe_subscription_id;
        }
        if parent_subscription_id.is_some() {
            self.parent_subscription_id = parent_subscription_id;
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Extends the placement to a renewed subscription period.
    pub fn extend(&mut self, new_end: Timestamp) {
        self.end_date = Some(new_end);
        self.updated_at = Timestamp::now();
    }

    /// Cancels the placement and unlinks it from the provider.
    ///
    /// # Errors
    ///
    /// Returns error if the row is already terminal.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition_to(PromotionStatus::Cancelled)?;
        self.stripe_subscription_id = None;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Transition to a new status using the state machine.
    fn transition_to(&mut self, target: PromotionStatus) -> Result<(), DomainError> {
        use crate::domain::foundation::StateMachine;

        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition promotion from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
