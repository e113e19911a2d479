//! Per-user points account.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId, ValidationError};

/// Running balance of promotion points for one user.
///
/// This engine only ever adds to the balance; the daily reset and tier
/// management belong to the catalog service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsAccount {
    pub user_id: UserId,

    /// Points available to spend today. Never negative.
    pub daily_points_available: i64,

    /// Account tier label, managed by the catalog service.
    pub tier: String,

    /// Date of the last daily reset, managed by the catalog service.
    pub last_daily_reset: NaiveDate,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PointsAccount {
    /// Creates a fresh account with an empty balance.
    pub fn new(user_id: UserId) -> Self {
        let now = Timestamp::now();
        Self {
            user_id,
            daily_points_available: 0,
            tier: "standard".to_string(),
            last_daily_reset: now.as_datetime().date_naive(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Adds purchased points to the balance.
    ///
    /// # Errors
    ///
    /// Returns error for a non-positive amount; package credits are always
    /// positive, so this only trips on a corrupted caller.
    pub fn credit(&mut self, points: i64) -> Result<(), ValidationError> {
        if points <= 0 {
            return Err(ValidationError::out_of_range("points", 1, i64::MAX, points));
        }
        self.daily_points_available += points;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}
