//! In-memory subscription store for testing.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in
//! production. It uses `.expect()` on lock operations which will panic if
//! locks are poisoned.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::domain::subscription::{SubscriptionRecord, SubscriptionScope};
use crate::ports::SubscriptionStore;

/// In-memory `SubscriptionStore` keyed by the scope's natural key.
///
/// Write errors are queued: each queued error fails exactly one `upsert`
/// or `update` call, which lets tests drive the reconciler's one-shot
/// write retry (queue one error: first write fails, retry succeeds; queue
/// two: both fail).
#[derive(Default)]
pub struct InMemorySubscriptionStore {
    rows: Mutex<HashMap<String, SubscriptionRecord>>,
    write_errors: Mutex<VecDeque<DomainError>>,
}

impl InMemorySubscriptionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row without going through the port.
    pub fn seed(&self, record: SubscriptionRecord) {
        self.rows
            .lock()
            .expect("InMemorySubscriptionStore: rows lock poisoned")
            .insert(record.scope.to_string(), record);
    }

    /// Queue an error for the next write (`upsert` or `update`).
    pub fn fail_next_write(&self, error: DomainError) {
        self.write_errors
            .lock()
            .expect("InMemorySubscriptionStore: write_errors lock poisoned")
            .push_back(error);
    }

    /// Number of rows (for test assertions).
    pub fn row_count(&self) -> usize {
        self.rows
            .lock()
            .expect("InMemorySubscriptionStore: rows lock poisoned")
            .len()
    }

    /// Fetch a row synchronously (for test assertions).
    pub fn get(&self, scope: &SubscriptionScope) -> Option<SubscriptionRecord> {
        self.rows
            .lock()
            .expect("InMemorySubscriptionStore: rows lock poisoned")
            .get(&scope.to_string())
            .cloned()
    }

    fn take_write_error(&self) -> Option<DomainError> {
        self.write_errors
            .lock()
            .expect("InMemorySubscriptionStore: write_errors lock poisoned")
            .pop_front()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn find_by_scope(
        &self,
        scope: &SubscriptionScope,
    ) -> Result<Option<SubscriptionRecord>, DomainError> {
        Ok(self
            .rows
            .lock()
            .expect("InMemorySubscriptionStore: rows lock poisoned")
            .get(&scope.to_string())
            .cloned())
    }

    async fn upsert(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        if let Some(error) = self.take_write_error() {
            return Err(error);
        }

        self.rows
            .lock()
            .expect("InMemorySubscriptionStore: rows lock poisoned")
            .insert(record.scope.to_string(), record.clone());
        Ok(())
    }

    async fn update(&self, record: &SubscriptionRecord) -> Result<(), DomainError> {
        if let Some(error) = self.take_write_error() {
            return Err(error);
        }

        let mut rows = self
            .rows
            .lock()
            .expect("InMemorySubscriptionStore: rows lock poisoned");
        let key = record.scope.to_string();
        if !rows.contains_key(&key) {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("No subscription row for scope {}", key),
            ));
        }
        rows.insert(key, record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::domain::subscription::{PlanCadence, SubscriptionStatus};

    fn user_scope() -> SubscriptionScope {
        SubscriptionScope::User {
            user_id: UserId::new(),
        }
    }

    #[tokio::test]
    async fn upsert_creates_then_replaces() {
        let store = InMemorySubscriptionStore::new();
        let scope = user_scope();

        let mut record = SubscriptionRecord::new_pending(scope.clone(), PlanCadence::Monthly);
        store.upsert(&record).await.unwrap();
        assert_eq!(store.row_count(), 1);

        record.status = SubscriptionStatus::Active;
        store.upsert(&record).await.unwrap();

        assert_eq!(store.row_count(), 1);
        let stored = store.get(&scope).unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn update_requires_existing_row() {
        let store = InMemorySubscriptionStore::new();
        let record = SubscriptionRecord::new_pending(user_scope(), PlanCadence::Monthly);

        let result = store.update(&record).await;

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code, ErrorCode::SubscriptionNotFound);
    }

    #[tokio::test]
    async fn find_by_scope_misses_other_scopes() {
        let store = InMemorySubscriptionStore::new();
        store.seed(SubscriptionRecord::new_pending(
            user_scope(),
            PlanCadence::Monthly,
        ));

        let found = store.find_by_scope(&user_scope()).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn queued_error_fails_exactly_one_write() {
        let store = InMemorySubscriptionStore::new();
        let record = SubscriptionRecord::new_pending(user_scope(), PlanCadence::Monthly);
        store.fail_next_write(DomainError::database("deadlock"));

        assert!(store.upsert(&record).await.is_err());
        assert!(store.upsert(&record).await.is_ok());
    }
}
