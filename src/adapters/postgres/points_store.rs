//! PostgreSQL implementation of PointsStore.
//!
//! The exactly-once guarantee is a single transaction: the credit row
//! insert is the dedup gate (primary key on `payment_intent_id`) and the
//! balance upsert rides on its success. Either both land or neither does.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::domain::points::{CreditResult, PointCredit, PointsAccount};
use crate::ports::PointsStore;

/// PostgreSQL implementation of the PointsStore port.
pub struct PostgresPointsStore {
    pool: PgPool,
}

impl PostgresPointsStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a points account.
#[derive(Debug, sqlx::FromRow)]
struct PointsAccountRow {
    user_id: Uuid,
    daily_points_available: i64,
    tier: String,
    last_daily_reset: NaiveDate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PointsAccountRow> for PointsAccount {
    fn from(row: PointsAccountRow) -> Self {
        PointsAccount {
            user_id: UserId::from_uuid(row.user_id),
            daily_points_available: row.daily_points_available,
            tier: row.tier,
            last_daily_reset: row.last_daily_reset,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        }
    }
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

#[async_trait]
impl PointsStore for PostgresPointsStore {
    async fn apply_credit(&self, credit: &PointCredit) -> Result<CreditResult, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin credit transaction", e))?;

        // Dedup gate: the credit row's primary key decides who wins.
        let inserted = sqlx::query(
            r#"
            INSERT INTO point_credits (
                payment_intent_id, user_id, package, points, product_ref, credited_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (payment_intent_id) DO NOTHING
            "#,
        )
        .bind(&credit.payment_intent_id)
        .bind(credit.user_id.as_uuid())
        .bind(credit.package.as_str())
        .bind(credit.points)
        .bind(&credit.product_ref)
        .bind(credit.credited_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to insert credit record", e))?;

        if inserted.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| db_error("Failed to roll back duplicate credit", e))?;
            return Ok(CreditResult::Duplicate);
        }

        let new_balance: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO points_accounts (
                user_id, daily_points_available, tier, last_daily_reset,
                created_at, updated_at
            ) VALUES ($1, $2, 'standard', CURRENT_DATE, NOW(), NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                daily_points_available =
                    points_accounts.daily_points_available + EXCLUDED.daily_points_available,
                updated_at = NOW()
            RETURNING daily_points_available
            "#,
        )
        .bind(credit.user_id.as_uuid())
        .bind(credit.points)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to move points balance", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit credit transaction", e))?;

        Ok(CreditResult::Credited {
            points: credit.points,
            new_balance,
        })
    }

    async fn find_account(&self, user_id: UserId) -> Result<Option<PointsAccount>, DomainError> {
        let row: Option<PointsAccountRow> = sqlx::query_as(
            r#"
            SELECT user_id, daily_points_available, tier, last_daily_reset,
                   created_at, updated_at
            FROM points_accounts
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find points account", e))?;

        Ok(row.map(PointsAccount::from))
    }
}
