//! Webhook processing pipeline.
//!
//! Every delivery walks the same path: verify the signature, check the
//! idempotency gate, route, dispatch, record the outcome. Only the
//! verification steps can reject a delivery; once a payload proves it came
//! from the provider, the answer is always an acknowledgement, with the
//! outcome (applied, skipped, or failed) recorded in the event store.

use std::sync::Arc;

use crate::application::handlers::{
    retry_once, PointsCreditApplier, PromotionLedger, SubscriptionReconciler,
};
use crate::domain::webhook::{
    EntityRefs, Outcome, ProcessedEvent, ProcessingError, ProviderEvent, SkipReason,
    WebhookVerifier,
};
use crate::ports::ProcessedEventStore;

use super::{EventRouter, RoutedCommand};

/// One raw delivery, exactly as it arrived.
#[derive(Debug)]
pub struct ProcessWebhookCommand {
    /// Raw request body. Verification runs over these exact bytes.
    pub payload: Vec<u8>,

    /// The provider's signature header, when the request carried one.
    pub signature: Option<String>,
}

/// How a verified delivery was answered.
#[derive(Debug)]
pub enum Acknowledgement {
    /// The event ran (or deliberately did not); the outcome was recorded.
    Handled(Outcome),
    /// An earlier delivery already processed this event id.
    Duplicate,
}

/// The webhook pipeline.
pub struct WebhookProcessor {
    verifier: WebhookVerifier,
    events: Arc<dyn ProcessedEventStore>,
    router: EventRouter,
    subscriptions: Arc<SubscriptionReconciler>,
    promotions: Arc<PromotionLedger>,
    points: Arc<PointsCreditApplier>,
}

impl WebhookProcessor {
    pub fn new(
        verifier: WebhookVerifier,
        events: Arc<dyn ProcessedEventStore>,
        router: EventRouter,
        subscriptions: Arc<SubscriptionReconciler>,
        promotions: Arc<PromotionLedger>,
        points: Arc<PointsCreditApplier>,
    ) -> Self {
        Self {
            verifier,
            events,
            router,
            subscriptions,
            promotions,
            points,
        }
    }

    /// Runs one delivery through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error only for deliveries that fail verification: a
    /// missing or invalid signature, a stale or future timestamp, or a
    /// body that is not a provider event. Those deserve a rejection so the
    /// provider retries (or an operator notices a misconfigured secret).
    /// Every verified delivery is acknowledged, whatever its outcome.
    pub async fn process(
        &self,
        command: ProcessWebhookCommand,
    ) -> Result<Acknowledgement, ProcessingError> {
        let signature = command
            .signature
            .as_deref()
            .ok_or(ProcessingError::InvalidSignature)?;
        let event = self.verifier.verify_and_parse(&command.payload, signature)?;

        // Idempotency gate. A lookup failure fails open: re-running a
        // handler is safe (they all converge), dropping an event is not.
        match self.events.find(&event.id).await {
            Ok(Some(existing)) if existing.status.blocks_reprocessing() => {
                tracing::info!(event_id = %event.id, "duplicate delivery, already processed");
                return Ok(Acknowledgement::Duplicate);
            }
            Ok(_) => {}
            Err(error) => {
                tracing::warn!(
                    event_id = %event.id,
                    %error,
                    "idempotency lookup failed, processing anyway"
                );
            }
        }

        let outcome = match self.router.route(&event) {
            Ok(routed) => {
                let refs = routed.entity_refs();
                let outcome = self.dispatch(routed).await;
                self.record(&event, refs, &outcome).await;
                outcome
            }
            Err(error) => {
                let outcome = Outcome::Failed(error);
                self.record(&event, EntityRefs::default(), &outcome).await;
                outcome
            }
        };

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            outcome = outcome.label(),
            "webhook event processed"
        );
        Ok(Acknowledgement::Handled(outcome))
    }

    async fn dispatch(&self, command: RoutedCommand) -> Outcome {
        match command {
            RoutedCommand::ActivateSubscription { kind, session } => {
                self.subscriptions.activate_from_checkout(kind, &session).await
            }
            RoutedCommand::ActivatePromotion { session } => {
                self.promotions.activate_from_checkout(&session).await
            }
            RoutedCommand::CreditPoints { session } => {
                self.points.apply_from_checkout(&session).await
            }
            RoutedCommand::ReconcileSubscription { kind, subscription } => {
                self.subscriptions.reconcile(kind, &subscription).await
            }
            RoutedCommand::ReconcilePromotion { subscription } => {
                self.promotions.reconcile(&subscription).await
            }
            RoutedCommand::FinalizeDeletion { kind, subscription } => {
                self.subscriptions.finalize_deletion(kind, &subscription).await
            }
            RoutedCommand::CancelPromotion { subscription } => {
                self.promotions.cancel_subscription(&subscription).await
            }
            RoutedCommand::ReconcileFailedInvoice { invoice } => {
                self.subscriptions.reconcile_failed_invoice(&invoice).await
            }
            RoutedCommand::Unhandled {
                event_type,
                entity_kind,
            } => Outcome::Skipped(SkipReason::UnhandledEvent {
                event_type,
                entity_kind,
            }),
        }
    }

    /// Writes the event-store row. Bookkeeping failures are logged, never
    /// surfaced; a handled event must not turn into a provider-visible
    /// error after its side effects are already committed.
    async fn record(&self, event: &ProviderEvent, refs: EntityRefs, outcome: &Outcome) {
        let record = ProcessedEvent::from_outcome(
            event.id.as_str(),
            event.event_type.as_str(),
            refs,
            outcome,
        );
        if let Err(error) =
            retry_once("processed_events.upsert", || self.events.upsert(&record)).await
        {
            tracing::error!(event_id = %event.id, %error, "failed to record event outcome");
        }
    }
}
