//! In-memory idempotency ledger for testing.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in
//! production. It uses `.expect()` on lock operations which will panic if
//! locks are poisoned.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::webhook::ProcessedEvent;
use crate::ports::ProcessedEventStore;

/// In-memory `ProcessedEventStore` keyed by provider event id.
///
/// Queued errors let tests exercise the processor's fail-open lookup and
/// its swallow-and-log mark step: each queued error fails exactly one call,
/// after which the store behaves normally again.
#[derive(Default)]
pub struct InMemoryProcessedEventStore {
    records: Mutex<HashMap<String, ProcessedEvent>>,
    find_errors: Mutex<VecDeque<DomainError>>,
    upsert_errors: Mutex<VecDeque<DomainError>>,
}

impl InMemoryProcessedEventStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error for the next `find` call.
    pub fn fail_next_find(&self, error: DomainError) {
        self.find_errors
            .lock()
            .expect("InMemoryProcessedEventStore: find_errors lock poisoned")
            .push_back(error);
    }

    /// Queue an error for the next `upsert` call.
    pub fn fail_next_upsert(&self, error: DomainError) {
        self.upsert_errors
            .lock()
            .expect("InMemoryProcessedEventStore: upsert_errors lock poisoned")
            .push_back(error);
    }

    /// Number of recorded events (for test assertions).
    pub fn record_count(&self) -> usize {
        self.records
            .lock()
            .expect("InMemoryProcessedEventStore: records lock poisoned")
            .len()
    }

    /// Fetch a record synchronously (for test assertions).
    pub fn get(&self, event_id: &str) -> Option<ProcessedEvent> {
        self.records
            .lock()
            .expect("InMemoryProcessedEventStore: records lock poisoned")
            .get(event_id)
            .cloned()
    }
}

#[async_trait]
impl ProcessedEventStore for InMemoryProcessedEventStore {
    async fn find(&self, event_id: &str) -> Result<Option<ProcessedEvent>, DomainError> {
        if let Some(error) = self
            .find_errors
            .lock()
            .expect("InMemoryProcessedEventStore: find_errors lock poisoned")
            .pop_front()
        {
            return Err(error);
        }

        Ok(self
            .records
            .lock()
            .expect("InMemoryProcessedEventStore: records lock poisoned")
            .get(event_id)
            .cloned())
    }

    async fn upsert(&self, record: &ProcessedEvent) -> Result<(), DomainError> {
        if let Some(error) = self
            .upsert_errors
            .lock()
            .expect("InMemoryProcessedEventStore: upsert_errors lock poisoned")
            .pop_front()
        {
            return Err(error);
        }

        self.records
            .lock()
            .expect("InMemoryProcessedEventStore: records lock poisoned")
            .insert(record.event_id.clone(), record.clone());
        Ok(())
    }
}
