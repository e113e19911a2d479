//! Webhook route definitions.

use axum::routing::post;
use axum::Router;

use super::handlers::{handle_payment_event, WebhookAppState};

/// Webhook endpoints without a prefix.
pub fn webhook_routes() -> Router<WebhookAppState> {
    Router::new().route("/payment-events", post(handle_payment_event))
}

/// Webhook endpoints nested under `/webhooks`.
pub fn webhook_router() -> Router<WebhookAppState> {
    Router::new().nest("/webhooks", webhook_routes())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use secrecy::SecretString;

    use crate::adapters::memory::{
        InMemoryCatalogStore, InMemoryPointsStore, InMemoryProcessedEventStore,
        InMemoryPromotionStore, InMemorySubscriptionStore, MockPaymentProvider,
        RecordingNotificationDispatcher,
    };
    use crate::config::FeaturesConfig;

    use super::*;

    fn test_state() -> WebhookAppState {
        WebhookAppState {
            processed_events: Arc::new(InMemoryProcessedEventStore::new()),
            subscriptions: Arc::new(InMemorySubscriptionStore::new()),
            promotions: Arc::new(InMemoryPromotionStore::new()),
            points: Arc::new(InMemoryPointsStore::new()),
            catalog: Arc::new(InMemoryCatalogStore::new()),
            payment_provider: Arc::new(MockPaymentProvider::new()),
            notifications: Arc::new(RecordingNotificationDispatcher::new()),
            webhook_secret: SecretString::new("whsec_test_secret".to_string()),
            features: FeaturesConfig::default(),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════════
    // Router Construction Tests
    // ════════════════════════════════════════════════════════════════════════════════

    #[test]
    fn webhook_routes_can_be_built_with_state() {
        let _router: Router = webhook_routes().with_state(test_state());
    }

    #[test]
    fn webhook_router_nests_under_prefix() {
        let _router: Router = webhook_router().with_state(test_state());
    }

    #[test]
    fn state_builds_a_processor() {
        let state = test_state();
        let _processor = state.processor();
    }
}
