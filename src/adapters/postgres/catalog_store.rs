//! PostgreSQL implementation of CatalogStore.
//!
//! The catalog tables (`restaurants`, `tours`, `tour_operators`) belong to
//! the catalog service; this adapter reads the operator verification gate
//! and writes the two denormalized promotion columns, nothing else.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, TourOperatorId};
use crate::domain::promotion::PromotedEntity;
use crate::ports::CatalogStore;

/// PostgreSQL implementation of the CatalogStore port.
pub struct PostgresCatalogStore {
    pool: PgPool,
}

impl PostgresCatalogStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    async fn operator_is_verified(
        &self,
        operator_id: TourOperatorId,
    ) -> Result<bool, DomainError> {
        let status: Option<String> = sqlx::query_scalar(
            r#"
            SELECT verification_status
            FROM tour_operators
            WHERE id = $1
            "#,
        )
        .bind(operator_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to read operator verification: {}", e),
            )
        })?;

        // A missing operator row counts as unverified.
        Ok(status.as_deref() == Some("verified"))
    }

    async fn set_promotion_flags(
        &self,
        entity: PromotedEntity,
        promoted_until: Option<Timestamp>,
    ) -> Result<(), DomainError> {
        let table = match entity {
            PromotedEntity::Restaurant(_) => "restaurants",
            PromotedEntity::Tour(_) => "tours",
        };
        let query = format!(
            "UPDATE {} SET is_promoted = $2, promoted_until = $3, updated_at = NOW() WHERE id = $1",
            table
        );

        let result = sqlx::query(&query)
            .bind(entity.entity_id())
            .bind(promoted_until.is_some())
            .bind(promoted_until.map(|t| *t.as_datetime()))
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Failed to mirror promotion flags: {}", e),
                )
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::EntityNotFound,
                format!("No catalog row for {}", entity),
            ));
        }

        Ok(())
    }
}
