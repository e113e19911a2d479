//! In-memory points store for testing.
//!
//! # Security Note
//!
//! This adapter is for **testing only** and should not be used in
//! production. It uses `.expect()` on lock operations which will panic if
//! locks are poisoned.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};
use crate::domain::points::{CreditResult, PointCredit, PointsAccount};
use crate::ports::PointsStore;

/// Accounts and credit records behind one lock, so a credit's dedup check
/// and balance write are atomic the same way the Postgres transaction
/// makes them.
#[derive(Default)]
struct PointsState {
    accounts: HashMap<UserId, PointsAccount>,
    credits: HashMap<String, PointCredit>,
}

/// In-memory `PointsStore` with per-payment-intent dedup.
#[derive(Default)]
pub struct InMemoryPointsStore {
    state: Mutex<PointsState>,
    credit_errors: Mutex<VecDeque<DomainError>>,
}

impl InMemoryPointsStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error for the next `apply_credit` call.
    pub fn fail_next_credit(&self, error: DomainError) {
        self.credit_errors
            .lock()
            .expect("InMemoryPointsStore: credit_errors lock poisoned")
            .push_back(error);
    }

    /// Number of credit records (for test assertions).
    pub fn credit_count(&self) -> usize {
        self.state
            .lock()
            .expect("InMemoryPointsStore: state lock poisoned")
            .credits
            .len()
    }

    /// Current balance for a user (for test assertions).
    pub fn balance_of(&self, user_id: UserId) -> Option<i64> {
        self.state
            .lock()
            .expect("InMemoryPointsStore: state lock poisoned")
            .accounts
            .get(&user_id)
            .map(|a| a.daily_points_available)
    }
}

#[async_trait]
impl PointsStore for InMemoryPointsStore {
    async fn apply_credit(&self, credit: &PointCredit) -> Result<CreditResult, DomainError> {
        if let Some(error) = self
            .credit_errors
            .lock()
            .expect("InMemoryPointsStore: credit_errors lock poisoned")
            .pop_front()
        {
            return Err(error);
        }

        let mut state = self
            .state
            .lock()
            .expect("InMemoryPointsStore: state lock poisoned");

        if state.credits.contains_key(&credit.payment_intent_id) {
            return Ok(CreditResult::Duplicate);
        }

        let account = state
            .accounts
            .entry(credit.user_id)
            .or_insert_with(|| PointsAccount::new(credit.user_id));
        account.credit(credit.points)?;
        let new_balance = account.daily_points_available;

        state
            .credits
            .insert(credit.payment_intent_id.clone(), credit.clone());

        Ok(CreditResult::Credited {
            points: credit.points,
            new_balance,
        })
    }

    async fn find_account(&self, user_id: UserId) -> Result<Option<PointsAccount>, DomainError> {
        Ok(self
            .state
            .lock()
            .expect("InMemoryPointsStore: state lock poisoned")
            .accounts
            .get(&user_id)
            .cloned())
    }
}
