//! SubscriptionStore port - Interface for reconciled subscription records.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::subscription::{SubscriptionRecord, SubscriptionScope};

/// Port for persisting subscription records.
///
/// Records are keyed by their scope's natural key (user id, restaurant +
/// destination, or operator id); the reconciler is the only writer of
/// `status` and `current_period_end`.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Find the record for a scope.
    async fn find_by_scope(
        &self,
        scope: &SubscriptionScope,
    ) -> Result<Option<SubscriptionRecord>, DomainError>;

    /// Insert or replace the record for its scope.
    ///
    /// `ON CONFLICT` on the natural key: concurrent checkout deliveries
    /// converge on one row, and activation works whether or not a pending
    /// row was provisioned beforehand.
    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), DomainError>;

    /// Update an existing record in place, keyed by its natural key.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionNotFound` when no row exists for the scope, so
    /// the caller can mark the event failed and let redelivery retry after
    /// the missing checkout event lands.
    async fn update(&self, record: &SubscriptionRecord) -> Result<(), DomainError>;
}
