//! Mock payment provider for testing.
//!
//! Provides a configurable mock implementation of `PaymentProvider` for
//! unit and integration tests. Supports:
//! - Pre-configured subscriptions
//! - Error injection
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::webhook::ProviderSubscription;
use crate::ports::{PaymentProvider, ProviderApiError};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
/// mock.add_subscription(MockPaymentProvider::active_subscription("sub_123", period_end));
///
/// // Inject errors
/// mock.set_error(ProviderApiError::network("Test outage"));
///
/// let result = mock.get_subscription("sub_123").await;
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    /// Pre-configured subscriptions by provider id.
    subscriptions: HashMap<String, ProviderSubscription>,

    /// Error to return on next call (consumed).
    next_error: Option<ProviderApiError>,

    /// Requested subscription ids, in call order.
    call_log: Vec<String>,
}

impl MockPaymentProvider {
    /// Create a new mock provider with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription to the "upstream".
    pub fn add_subscription(&self, subscription: ProviderSubscription) {
        let id = subscription.id.clone();
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .insert(id, subscription);
    }

    /// Set an error to return on the next call.
    pub fn set_error(&self, error: ProviderApiError) {
        self.inner.lock().unwrap().next_error = Some(error);
    }

    /// All requested subscription ids, in order.
    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().call_log.clone()
    }

    /// Count of `get_subscription` calls.
    pub fn call_count(&self) -> usize {
        self.inner.lock().unwrap().call_log.len()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Fixture Builders
    // ════════════════════════════════════════════════════════════════════════════

    /// An active subscription with the given period end.
    pub fn active_subscription(id: &str, period_end: i64) -> ProviderSubscription {
        Self::subscription_with_status(id, "active", Some(period_end))
    }

    /// A subscription in an arbitrary provider status.
    pub fn subscription_with_status(
        id: &str,
        status: &str,
        period_end: Option<i64>,
    ) -> ProviderSubscription {
        ProviderSubscription {
            id: id.to_string(),
            customer: Some("cus_mock".to_string()),
            status: status.to_string(),
            current_period_start: period_end.map(|end| end - 30 * 24 * 60 * 60),
            current_period_end: period_end,
            cancel_at_period_end: false,
            canceled_at: None,
            metadata: HashMap::new(),
            items: Default::default(),
        }
    }
}

impl Clone for MockPaymentProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<ProviderSubscription>, ProviderApiError> {
        let mut state = self.inner.lock().unwrap();
        state.call_log.push(subscription_id.to_string());

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(state.subscriptions.get(subscription_id).cloned())
    }
}
