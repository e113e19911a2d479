//! PostgreSQL implementation of SubscriptionStore.
//!
//! Rows live in `subscriptions`, one per scope. The scope is stored twice:
//! as discrete columns (`kind`, `user_id`, `restaurant_id`,
//! `destination_id`, `operator_id`) for querying, and as a derived
//! `scope_key` text column whose UNIQUE constraint is the upsert target.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DestinationId, DomainError, ErrorCode, RestaurantId, SubscriptionId, Timestamp,
    TourOperatorId, UserId,
};
use crate::domain::subscription::{
    PlanCadence, SubscriptionRecord, SubscriptionScope, SubscriptionStatus,
};
use crate::ports::SubscriptionStore;

/// PostgreSQL implementation of the SubscriptionStore port.
pub struct PostgresSubscriptionStore {
    pool: PgPool,
}

impl PostgresSubscriptionStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    kind: String,
    user_id: Option<Uuid>,
    restaurant_id: Option<i64>,
    destination_id: Option<String>,
    operator_id: Option<i64>,
    status: String,
    cadence: String,
    stripe_subscription_id: Option<String>,
    stripe_customer_id: Option<String>,
    stripe_price_id: Option<String>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let scope = scope_from_columns(
            &row.kind,
            row.user_id,
            row.restaurant_id,
            row.destination_id.as_deref(),
            row.operator_id,
        )?;
        let status = parse_status(&row.status)?;
        let cadence = parse_cadence(&row.cadence)?;

        Ok(SubscriptionRecord {
            id: SubscriptionId::from_uuid(row.id),
            scope,
            status,
            cadence,
            stripe_subscription_id: row.stripe_subscription_id,
            stripe_customer_id: row.stripe_customer_id,
            stripe_price_id: row.stripe_price_id,
            current_period_start: row.current_period_start.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DomainError> {
    match s {
        "pending" => Ok(SubscriptionStatus::Pending),
        "active" => Ok(SubscriptionStatus::Active),
        "pending_cancellation" => Ok(SubscriptionStatus::PendingCancellation),
        "inactive" => Ok(SubscriptionStatus::Inactive),
        "cancelled" => Ok(SubscriptionStatus::Cancelled),
        "expired" => Ok(SubscriptionStatus::Expired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )),
    }
}

fn parse_cadence(s: &str) -> Result<PlanCadence, DomainError> {
    PlanCadence::from_wire(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid cadence value: {}", s),
        )
    })
}

fn scope_kind(scope: &SubscriptionScope) -> &'static str {
    match scope {
        SubscriptionScope::User { .. } => "user",
        SubscriptionScope::Restaurant { .. } => "restaurant",
        SubscriptionScope::TourOperator { .. } => "tour_operator",
    }
}

/// The discrete column values for a scope, in table order.
type ScopeColumns = (Option<Uuid>, Option<i64>, Option<String>, Option<i64>);

fn scope_columns(scope: &SubscriptionScope) -> ScopeColumns {
    match scope {
        SubscriptionScope::User { user_id } => (Some(*user_id.as_uuid()), None, None, None),
        SubscriptionScope::Restaurant {
            restaurant_id,
            destination_id,
        } => (
            None,
            Some(restaurant_id.as_i64()),
            Some(destination_id.as_str().to_string()),
            None,
        ),
        SubscriptionScope::TourOperator { operator_id } => {
            (None, None, None, Some(operator_id.as_i64()))
        }
    }
}

fn scope_from_columns(
    kind: &str,
    user_id: Option<Uuid>,
    restaurant_id: Option<i64>,
    destination_id: Option<&str>,
    operator_id: Option<i64>,
) -> Result<SubscriptionScope, DomainError> {
    let missing = |column: &str| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Subscription row of kind {} is missing {}", kind, column),
        )
    };

    match kind {
        "user" => Ok(SubscriptionScope::User {
            user_id: UserId::from_uuid(user_id.ok_or_else(|| missing("user_id"))?),
        }),
        "restaurant" => Ok(SubscriptionScope::Restaurant {
            restaurant_id: RestaurantId::new(restaurant_id.ok_or_else(|| missing("restaurant_id"))?),
            destination_id: DestinationId::new(
                destination_id.ok_or_else(|| missing("destination_id"))?,
            )
            .map_err(DomainError::from)?,
        }),
        "tour_operator" => Ok(SubscriptionScope::TourOperator {
            operator_id: TourOperatorId::new(operator_id.ok_or_else(|| missing("operator_id"))?),
        }),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid scope kind: {}", kind),
        )),
    }
}

#[async_trait]
impl SubscriptionStore for PostgresSubscriptionStore {
    async fn find_by_scope(
        &self,
        scope: &SubscriptionScope,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, kind, user_id, restaurant_id, destination_id, operator_id,
                   status, cadence, stripe_subscription_id, stripe_customer_id,
                   stripe_price_id, current_period_start, current_period_end,
                   cancelled_at, created_at, updated_at
            FROM subscriptions
            WHERE scope_key = $1
            "#,
        )
        .bind(scope.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find subscription: {}", e),
            )
        })?;

        row.map(SubscriptionRecord::try_from).transpose()
    }

    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        let (user_id, restaurant_id, destination_id, operator_id) = scope_columns(&record.scope);

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, scope_key, kind, user_id, restaurant_id, destination_id,
                operator_id, status, cadence, stripe_subscription_id,
                stripe_customer_id, stripe_price_id, current_period_start,
                current_period_end, cancelled_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (scope_key) DO UPDATE SET
                status = EXCLUDED.status,
                cadence = EXCLUDED.cadence,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_price_id = EXCLUDED.stripe_price_id,
                current_period_start = EXCLUDED.current_period_start,
                current_period_end = EXCLUDED.current_period_end,
                cancelled_at = EXCLUDED.cancelled_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.scope.to_string())
        .bind(scope_kind(&record.scope))
        .bind(user_id)
        .bind(restaurant_id)
        .bind(destination_id)
        .bind(operator_id)
        .bind(record.status.as_str())
        .bind(record.cadence.as_str())
        .bind(&record.stripe_subscription_id)
        .bind(&record.stripe_customer_id)
        .bind(&record.stripe_price_id)
        .bind(record.current_period_start.map(|t| *t.as_datetime()))
        .bind(record.current_period_end.map(|t| *t.as_datetime()))
        .bind(record.cancelled_at.map(|t| *t.as_datetime()))
        .bind(record.created_at.as_datetime())
        .bind(record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to upsert subscription: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $2,
                cadence = $3,
                stripe_subscription_id = $4,
                stripe_customer_id = $5,
                stripe_price_id = $6,
                current_period_start = $7,
                current_period_end = $8,
                cancelled_at = $9,
                updated_at = $10
            WHERE scope_key = $1
            "#,
        )
        .bind(record.scope.to_string())
        .bind(record.status.as_str())
        .bind(record.cadence.as_str())
        .bind(&record.stripe_subscription_id)
        .bind(&record.stripe_customer_id)
        .bind(&record.stripe_price_id)
        .bind(record.current_period_start.map(|t| *t.as_datetime()))
        .bind(record.current_period_end.map(|t| *t.as_datetime()))
        .bind(record.cancelled_at.map(|t| *t.as_datetime()))
        .bind(record.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update subscription: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("No subscription row for scope {}", record.scope),
            ));
        }

        Ok(())
    }
}
