//! In-memory catalog store for testing.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in
//! production. It uses `.expect()` on lock operations which will panic if
//! locks are poisoned.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp, TourOperatorId};
use crate::domain::promotion::PromotedEntity;
use crate::ports::CatalogStore;

/// In-memory `CatalogStore`: a verified-operator set plus the last flag
/// write per entity.
#[derive(Default)]
pub struct InMemoryCatalogStore {
    verified_operators: Mutex<HashSet<TourOperatorId>>,
    promotion_flags: Mutex<HashMap<String, Option<Timestamp>>>,
}

impl InMemoryCatalogStore {
    /// Creates an empty store. No operator is verified until marked so.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an operator as verified.
    pub fn mark_operator_verified(&self, operator_id: TourOperatorId) {
        self.verified_operators
            .lock()
            .expect("InMemoryCatalogStore: verified_operators lock poisoned")
            .insert(operator_id);
    }

    /// The last flag write for an entity, if any (for test assertions).
    ///
    /// Outer `None` means the entity was never touched; inner `None` means
    /// the flags were cleared.
    pub fn flag_state(&self, entity: PromotedEntity) -> Option<Option<Timestamp>> {
        self.promotion_flags
            .lock()
            .expect("InMemoryCatalogStore: promotion_flags lock poisoned")
            .get(&entity.to_string())
            .copied()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn operator_is_verified(
        &self,
        operator_id: TourOperatorId,
    ) -> Result<bool, DomainError> {
        Ok(self
            .verified_operators
            .lock()
            .expect("InMemoryCatalogStore: verified_operators lock poisoned")
            .contains(&operator_id))
    }

    async fn set_promotion_flags(
        &self,
        entity: PromotedEntity,
        promoted_until: Option<Timestamp>,
    ) -> Result<(), DomainError> {
        self.promotion_flags
            .lock()
            .expect("InMemoryCatalogStore: promotion_flags lock poisoned")
            .insert(entity.to_string(), promoted_until);
        Ok(())
    }
}
