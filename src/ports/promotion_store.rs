//! PromotionStore port - Interface for promoted-listing rows.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ListingId, UserId};
use crate::domain::promotion::{PromotedEntity, PromotionListing};

/// Port for persisting promoted placements.
///
/// Lookups mirror the ledger's ordered cancellation strategies: the
/// provider subscription link is authoritative, the `{entity, user}` pair
/// is the fallback when the link was never written or already cleared.
#[async_trait]
pub trait PromotionStore: Send + Sync {
    /// Oldest `pending` row for the entity, if any.
    async fn find_pending(
        &self,
        entity: PromotedEntity,
    ) -> Result<Option<PromotionListing>, DomainError>;

    /// Active rows funded by a provider subscription.
    async fn find_active_by_provider_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Vec<PromotionListing>, DomainError>;

    /// Active rows for an entity owned by a user; the fallback
    /// cancellation lookup.
    async fn find_active_by_entity_and_user(
        &self,
        entity: PromotedEntity,
        user_id: UserId,
    ) -> Result<Vec<PromotionListing>, DomainError>;

    /// Insert a new row.
    async fn insert(&self, listing: &PromotionListing) -> Result<(), DomainError>;

    /// Update an existing row by id.
    ///
    /// # Errors
    ///
    /// Returns `PromotionNotFound` when the row no longer exists.
    async fn update(&self, listing: &PromotionListing) -> Result<(), DomainError>;

    /// Delete every pending row for the entity except the one being kept.
    ///
    /// Cleans up duplicate reservations left by repeated checkout attempts.
    /// Returns the number of rows deleted.
    async fn delete_pending_except(
        &self,
        entity: PromotedEntity,
        keep: ListingId,
    ) -> Result<u64, DomainError>;
}
