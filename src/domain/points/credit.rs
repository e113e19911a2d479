//! Point credit records and results.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

use super::PointsPackage;

/// One row per credited payment intent.
///
/// The `payment_intent_id` uniqueness is what makes crediting exactly-once:
/// the row is written in the same transaction as the balance increment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCredit {
    /// Provider payment intent; the dedup key.
    pub payment_intent_id: String,

    pub user_id: UserId,

    pub package: PointsPackage,

    /// Points granted, denormalized from the package for audit.
    pub points: i64,

    /// What the purchase was made from (checkout session or product ref).
    pub product_ref: Option<String>,

    pub credited_at: Timestamp,
}

impl PointCredit {
    pub fn new(
        payment_intent_id: impl Into<String>,
        user_id: UserId,
        package: PointsPackage,
        product_ref: Option<String>,
    ) -> Self {
        Self {
            payment_intent_id: payment_intent_id.into(),
            user_id,
            package,
            points: package.points(),
            product_ref,
            credited_at: Timestamp::now(),
        }
    }
}

/// Result of an apply-credit call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditResult {
    /// First time this payment intent was seen; the balance moved.
    Credited { points: i64, new_balance: i64 },
    /// The intent was credited by an earlier delivery; nothing changed.
    Duplicate,
}

impl CreditResult {
    pub fn is_first_credit(&self) -> bool {
        matches!(self, CreditResult::Credited { .. })
    }
}
