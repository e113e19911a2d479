//! PointsStore port - Interface for point balances and credit records.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::points::{CreditResult, PointCredit, PointsAccount};

/// Port for crediting promotion points.
///
/// The whole exactly-once guarantee lives behind `apply_credit`:
/// implementations must write the credit record and move the balance in
/// one atomic step, keyed by the credit's `payment_intent_id`, so two
/// concurrent deliveries of the same purchase credit exactly once.
#[async_trait]
pub trait PointsStore: Send + Sync {
    /// Credit a purchase, exactly once per payment intent.
    ///
    /// Returns `CreditResult::Duplicate` (with no balance change) when the
    /// intent was already credited. Creates the user's account on first
    /// credit.
    async fn apply_credit(&self, credit: &PointCredit) -> Result<CreditResult, DomainError>;

    /// Current account for a user, if one exists.
    async fn find_account(&self, user_id: UserId) -> Result<Option<PointsAccount>, DomainError>;
}
