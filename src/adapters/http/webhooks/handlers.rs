//! HTTP handler for provider webhook deliveries.
//!
//! This is deliberately a thin shell: it lifts the raw body and signature
//! header out of the request and hands them to the processing pipeline.
//! The pipeline decides between the only two answers this endpoint gives,
//! 400 for deliveries that fail verification and 200 for everything else.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use secrecy::{ExposeSecret, SecretString};

use crate::application::{
    Acknowledgement, EventRouter, PointsCreditApplier, ProcessWebhookCommand, PromotionLedger,
    SubscriptionReconciler, WebhookProcessor,
};
use crate::config::FeaturesConfig;
use crate::domain::webhook::{ProcessingError, WebhookVerifier};
use crate::ports::{
    CatalogStore, NotificationDispatcher, PaymentProvider, PointsStore, ProcessedEventStore,
    PromotionStore, SubscriptionStore,
};

use super::dto::{ErrorResponse, WebhookAck};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared application state containing all dependencies.
///
/// This struct is cloned for each request and contains Arc-wrapped
/// dependencies for efficient sharing across handlers.
#[derive(Clone)]
pub struct WebhookAppState {
    pub processed_events: Arc<dyn ProcessedEventStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub promotions: Arc<dyn PromotionStore>,
    pub points: Arc<dyn PointsStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub notifications: Arc<dyn NotificationDispatcher>,
    pub webhook_secret: SecretString,
    pub features: FeaturesConfig,
}

impl WebhookAppState {
    /// Create the processing pipeline on demand from the shared state.
    pub fn processor(&self) -> WebhookProcessor {
        let promotions = Arc::new(PromotionLedger::new(
            self.promotions.clone(),
            self.catalog.clone(),
            self.payment_provider.clone(),
        ));
        let subscriptions = Arc::new(SubscriptionReconciler::new(
            self.subscriptions.clone(),
            self.payment_provider.clone(),
            self.catalog.clone(),
            self.notifications.clone(),
            promotions.clone(),
        ));
        let points = Arc::new(PointsCreditApplier::new(
            self.points.clone(),
            self.notifications.clone(),
        ));

        WebhookProcessor::new(
            WebhookVerifier::new(self.webhook_secret.expose_secret()),
            self.processed_events.clone(),
            EventRouter::new(self.features.clone()),
            subscriptions,
            promotions,
            points,
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/payment-events
///
/// Receives a provider delivery, verifies it, and runs it through the
/// pipeline. The body must be read raw; the signature covers the exact
/// bytes on the wire, so any re-serialization would break verification.
pub async fn handle_payment_event(
    State(state): State<WebhookAppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let command = ProcessWebhookCommand {
        payload: body.to_vec(),
        signature,
    };
    let acknowledgement = state.processor().process(command).await?;

    if matches!(acknowledgement, Acknowledgement::Duplicate) {
        tracing::debug!("acknowledged duplicate delivery");
    }

    Ok((StatusCode::OK, Json(WebhookAck::received())))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts processing errors to HTTP responses.
pub struct WebhookApiError(ProcessingError);

impl From<ProcessingError> for WebhookApiError {
    fn from(err: ProcessingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.0.status_code();
        let body = ErrorResponse::new(self.0.to_string());

        if status == StatusCode::BAD_REQUEST {
            tracing::warn!(error = %body.error, "webhook delivery rejected");
        }

        (status, Json(body)).into_response()
    }
}
