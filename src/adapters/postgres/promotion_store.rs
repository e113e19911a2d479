//! PostgreSQL implementation of PromotionStore.
//!
//! Promotion placements live in `promotion_listings`. An entity is
//! addressed by the `(listing_type, entity_id)` pair.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, ListingId, RestaurantId, SubscriptionId, Timestamp, TourId, UserId,
};
use crate::domain::promotion::{PromotedEntity, PromotionListing, PromotionStatus};
use crate::ports::PromotionStore;

/// PostgreSQL implementation of the PromotionStore port.
pub struct PostgresPromotionStore {
    pool: PgPool,
}

impl PostgresPromotionStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a promotion listing.
#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    id: Uuid,
    listing_type: String,
    entity_id: i64,
    user_id: Uuid,
    status: String,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    stripe_subscription_id: Option<String>,
    parent_subscription_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PromotionRow> for PromotionListing {
    type Error = DomainError;

    fn try_from(row: PromotionRow) -> Result<Self, Self::Error> {
        let entity = parse_entity(&row.listing_type, row.entity_id)?;
        let status = parse_status(&row.status)?;

        Ok(PromotionListing {
            id: ListingId::from_uuid(row.id),
            entity,
            user_id: UserId::from_uuid(row.user_id),
            status,
            start_date: row.start_date.map(Timestamp::from_datetime),
            end_date: row.end_date.map(Timestamp::from_datetime),
            stripe_subscription_id: row.stripe_subscription_id,
            parent_subscription_id: row.parent_subscription_id.map(SubscriptionId::from_uuid),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_entity(listing_type: &str, entity_id: i64) -> Result<PromotedEntity, DomainError> {
    match listing_type {
        "restaurant" => Ok(PromotedEntity::Restaurant(RestaurantId::new(entity_id))),
        "tour" => Ok(PromotedEntity::Tour(TourId::new(entity_id))),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid listing_type value: {}", listing_type),
        )),
    }
}

fn parse_status(s: &str) -> Result<PromotionStatus, DomainError> {
    match s {
        "pending" => Ok(PromotionStatus::Pending),
        "active" => Ok(PromotionStatus::Active),
        "cancelled" => Ok(PromotionStatus::Cancelled),
        "expired" => Ok(PromotionStatus::Expired),
        _ => Err(DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid status value: {}", s),
        )),
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, listing_type, entity_id, user_id, status, start_date, end_date,
           stripe_subscription_id, parent_subscription_id, created_at, updated_at
    FROM promotion_listings
"#;

#[async_trait]
impl PromotionStore for PostgresPromotionStore {
    async fn find_pending(
        &self,
        entity: PromotedEntity,
    ) -> Result<Option<PromotionListing>, DomainError> {
        let query = format!(
            "{} WHERE status = 'pending' AND listing_type = $1 AND entity_id = $2 \
             ORDER BY created_at ASC LIMIT 1",
            SELECT_COLUMNS
        );
        let row: Option<PromotionRow> = sqlx::query_as(&query)
            .bind(entity.listing_type())
            .bind(entity.entity_id())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to find pending promotion: {}", e),
                )
            })?;

        row.map(PromotionListing::try_from).transpose()
    }

    async fn find_active_by_provider_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Vec<PromotionListing>, DomainError> {
        let query = format!(
            "{} WHERE status = 'active' AND stripe_subscription_id = $1",
            SELECT_COLUMNS
        );
        let rows: Vec<PromotionRow> = sqlx::query_as(&query)
            .bind(stripe_subscription_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to find promotions by subscription: {}", e),
                )
            })?;

        rows.into_iter().map(PromotionListing::try_from).collect()
    }

    async fn find_active_by_entity_and_user(
        &self,
        entity: PromotedEntity,
        user_id: UserId,
    ) -> Result<Vec<PromotionListing>, DomainError> {
        let query = format!(
            "{} WHERE status = 'active' AND listing_type = $1 AND entity_id = $2 AND user_id = $3",
            SELECT_COLUMNS
        );
        let rows: Vec<PromotionRow> = sqlx::query_as(&query)
            .bind(entity.listing_type())
            .bind(entity.entity_id())
            .bind(user_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to find promotions by entity and user: {}", e),
                )
            })?;

        rows.into_iter().map(PromotionListing::try_from).collect()
    }

    async fn insert(&self, listing: &PromotionListing) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO promotion_listings (
                id, listing_type, entity_id, user_id, status, start_date,
                end_date, stripe_subscription_id, parent_subscription_id,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(listing.id.as_uuid())
        .bind(listing.entity.listing_type())
        .bind(listing.entity.entity_id())
        .bind(listing.user_id.as_uuid())
        .bind(listing.status.as_str())
        .bind(listing.start_date.map(|t| *t.as_datetime()))
        .bind(listing.end_date.map(|t| *t.as_datetime()))
        .bind(&listing.stripe_subscription_id)
        .bind(listing.parent_subscription_id.map(|id| *id.as_uuid()))
        .bind(listing.created_at.as_datetime())
        .bind(listing.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to insert promotion: {}", e),
            )
        })?;

        Ok(())
    }

    async fn update(&self, listing: &PromotionListing) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE promotion_listings SET
                status = $2,
                start_date = $3,
                end_date = $4,
                stripe_subscription_id = $5,
                parent_subscription_id = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(listing.id.as_uuid())
        .bind(listing.status.as_str())
        .bind(listing.start_date.map(|t| *t.as_datetime()))
        .bind(listing.end_date.map(|t| *t.as_datetime()))
        .bind(&listing.stripe_subscription_id)
        .bind(listing.parent_subscription_id.map(|id| *id.as_uuid()))
        .bind(listing.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to update promotion: {}", e),
            )
        })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::PromotionNotFound,
                format!("No promotion row with id {}", listing.id),
            ));
        }

        Ok(())
    }

    async fn delete_pending_except(
        &self,
        entity: PromotedEntity,
        keep: ListingId,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            DELETE FROM promotion_listings
            WHERE status = 'pending' AND listing_type = $1 AND entity_id = $2 AND id <> $3
            "#,
        )
        .bind(entity.listing_type())
        .bind(entity.entity_id())
        .bind(keep.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to delete pending promotions: {}", e),
            )
        })?;

        Ok(result.rows_affected())
    }
}
