//! CatalogStore port - Interface to the shared catalog tables.
//!
//! The catalog (restaurants, tours, operators) is owned by another service;
//! this engine touches exactly two things in it: the operator verification
//! gate and the denormalized promotion flags that make catalog reads cheap.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp, TourOperatorId};
use crate::domain::promotion::PromotedEntity;

/// Port for the catalog reads and mirrored flags this engine needs.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Whether the operator's out-of-band `verification_status` is
    /// `verified`. Activation of operator premium is refused otherwise.
    async fn operator_is_verified(
        &self,
        operator_id: TourOperatorId,
    ) -> Result<bool, DomainError>;

    /// Mirror promotion state onto the catalog row.
    ///
    /// `Some(until)` marks the entity promoted until that instant; `None`
    /// clears the flags. The PromotionListing row stays the source of
    /// truth; these columns are re-derivable from it.
    async fn set_promotion_flags(
        &self,
        entity: PromotedEntity,
        promoted_until: Option<Timestamp>,
    ) -> Result<(), DomainError>;
}
