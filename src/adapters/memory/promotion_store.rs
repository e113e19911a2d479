//! In-memory promotion store for testing.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in
//! production. It uses `.expect()` on lock operations which will panic if
//! locks are poisoned.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, ListingId, UserId};
use crate::domain::promotion::{PromotedEntity, PromotionListing, PromotionStatus};
use crate::ports::PromotionStore;

/// In-memory `PromotionStore` backed by a plain row list.
#[derive(Default)]
pub struct InMemoryPromotionStore {
    rows: Mutex<Vec<PromotionListing>>,
}

impl InMemoryPromotionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row without going through the port.
    pub fn seed(&self, listing: PromotionListing) {
        self.rows
            .lock()
            .expect("InMemoryPromotionStore: rows lock poisoned")
            .push(listing);
    }

    /// All rows (for test assertions).
    pub fn all_rows(&self) -> Vec<PromotionListing> {
        self.rows
            .lock()
            .expect("InMemoryPromotionStore: rows lock poisoned")
            .clone()
    }

    /// Number of rows (for test assertions).
    pub fn row_count(&self) -> usize {
        self.rows
            .lock()
            .expect("InMemoryPromotionStore: rows lock poisoned")
            .len()
    }

    /// Fetch a row by id (for test assertions).
    pub fn get(&self, id: ListingId) -> Option<PromotionListing> {
        self.rows
            .lock()
            .expect("InMemoryPromotionStore: rows lock poisoned")
            .iter()
            .find(|l| l.id == id)
            .cloned()
    }
}

#[async_trait]
impl PromotionStore for InMemoryPromotionStore {
    async fn find_pending(
        &self,
        entity: PromotedEntity,
    ) -> Result<Option<PromotionListing>, DomainError> {
        let rows = self
            .rows
            .lock()
            .expect("InMemoryPromotionStore: rows lock poisoned");
        Ok(rows
            .iter()
            .filter(|l| l.status == PromotionStatus::Pending && l.entity == entity)
            .min_by_key(|l| l.created_at.as_unix_secs())
            .cloned())
    }

    async fn find_active_by_provider_id(
        &self,
        stripe_subscription_id: &str,
    ) -> Result<Vec<PromotionListing>, DomainError> {
        let rows = self
            .rows
            .lock()
            .expect("InMemoryPromotionStore: rows lock poisoned");
        Ok(rows
            .iter()
            .filter(|l| {
                l.status == PromotionStatus::Active
                    && l.stripe_subscription_id.as_deref() == Some(stripe_subscription_id)
            })
            .cloned()
            .collect())
    }

    async fn find_active_by_entity_and_user(
        &self,
        entity: PromotedEntity,
        user_id: UserId,
    ) -> Result<Vec<PromotionListing>, DomainError> {
        let rows = self
            .rows
            .lock()
            .expect("InMemoryPromotionStore: rows lock poisoned");
        Ok(rows
            .iter()
            .filter(|l| {
                l.status == PromotionStatus::Active && l.entity == entity && l.user_id == user_id
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, listing: &PromotionListing) -> Result<(), DomainError> {
        self.rows
            .lock()
            .expect("InMemoryPromotionStore: rows lock poisoned")
            .push(listing.clone());
        Ok(())
    }

    async fn update(&self, listing: &PromotionListing) -> Result<(), DomainError> {
        let mut rows = self
            .rows
            .lock()
            .expect("InMemoryPromotionStore: rows lock poisoned");
        match rows.iter_mut().find(|l| l.id == listing.id) {
            Some(row) => {
                *row = listing.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::PromotionNotFound,
                format!("No promotion row with id {}", listing.id),
            )),
        }
    }

    async fn delete_pending_except(
        &self,
        entity: PromotedEntity,
        keep: ListingId,
    ) -> Result<u64, DomainError> {
        let mut rows = self
            .rows
            .lock()
            .expect("InMemoryPromotionStore: rows lock poisoned");
        let before = rows.len();
        rows.retain(|l| {
            !(l.status == PromotionStatus::Pending && l.entity == entity && l.id != keep)
        });
        Ok((before - rows.len()) as u64)
    }
}
