//! PostgreSQL implementation of ProcessedEventStore.
//!
//! One row per verified webhook event, keyed by the provider's event id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::webhook::{EntityRefs, ProcessedEvent, ProcessingStatus};
use crate::ports::ProcessedEventStore;

/// PostgreSQL implementation of the ProcessedEventStore port.
///
/// The `processed_events` primary key on `event_id` is what makes
/// concurrent deliveries of the same event converge on one row.
pub struct PostgresProcessedEventStore {
    pool: PgPool,
}

impl PostgresProcessedEventStore {
    /// Creates a new store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a processed event.
#[derive(Debug, sqlx::FromRow)]
struct ProcessedEventRow {
    event_id: String,
    event_type: String,
    status: String,
    subscription_id: Option<String>,
    entity_id: Option<String>,
    user_id: Option<String>,
    error_message: Option<String>,
    processed_at: DateTime<Utc>,
}

impl TryFrom<ProcessedEventRow> for ProcessedEvent {
    type Error = DomainError;

    fn try_from(row: ProcessedEventRow) -> Result<Self, Self::Error> {
        let status = ProcessingStatus::from_str(&row.status).ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid status value: {}", row.status),
            )
        })?;

        Ok(ProcessedEvent {
            event_id: row.event_id,
            event_type: row.event_type,
            status,
            processed_at: Timestamp::from_datetime(row.processed_at),
            entity_refs: EntityRefs {
                subscription_id: row.subscription_id,
                entity_id: row.entity_id,
                user_id: row.user_id,
            },
            error_message: row.error_message,
        })
    }
}

#[async_trait]
impl ProcessedEventStore for PostgresProcessedEventStore {
    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEvent>, DomainError> {
        let row: Option<ProcessedEventRow> = sqlx::query_as(
            r#"
            SELECT event_id, event_type, status, subscription_id, entity_id,
                   user_id, error_message, processed_at
            FROM processed_events
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to find processed event: {}", e),
            )
        })?;

        row.map(ProcessedEvent::try_from).transpose()
    }

    async fn upsert(&self, record: &ProcessedEvent) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO processed_events (
                event_id, event_type, status, subscription_id, entity_id,
                user_id, error_message, processed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (event_id) DO UPDATE SET
                event_type = EXCLUDED.event_type,
                status = EXCLUDED.status,
                subscription_id = EXCLUDED.subscription_id,
                entity_id = EXCLUDED.entity_id,
                user_id = EXCLUDED.user_id,
                error_message = EXCLUDED.error_message,
                processed_at = EXCLUDED.processed_at
            "#,
        )
        .bind(&record.event_id)
        .bind(&record.event_type)
        .bind(record.status.as_str())
        .bind(&record.entity_refs.subscription_id)
        .bind(&record.entity_refs.entity_id)
        .bind(&record.entity_refs.user_id)
        .bind(&record.error_message)
        .bind(record.processed_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Failed to record processed event: {}", e),
            )
        })?;

        Ok(())
    }
}
