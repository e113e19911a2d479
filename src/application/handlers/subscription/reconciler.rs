//! Subscription reconciler: converges local subscription records onto the
//! payment provider's view.
//!
//! Checkout completion activates records after re-fetching the subscription
//! from the provider (the webhook payload alone is never trusted for
//! activation). Lifecycle updates overwrite local status with whatever the
//! provider reports, so redeliveries and out-of-order events settle on the
//! same final state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::handlers::{metadata, retry_once, PromotionLedger};
use crate::domain::foundation::{Timestamp, TourId};
use crate::domain::promotion::PromotedEntity;
use crate::domain::subscription::{
    is_activatable_provider_status, PlanCadence, ProviderStatusMapping, SubscriptionRecord,
    SubscriptionScope, SubscriptionStatus,
};
use crate::domain::webhook::{
    CheckoutSession, EntityKind, Invoice, Outcome, ProcessingError, ProviderSubscription,
    SkipReason,
};
use crate::ports::{CatalogStore, NotificationDispatcher, PaymentProvider, SubscriptionStore};

/// Handler for subscription checkout and lifecycle events.
pub struct SubscriptionReconciler {
    subscriptions: Arc<dyn SubscriptionStore>,
    payment_provider: Arc<dyn PaymentProvider>,
    catalog: Arc<dyn CatalogStore>,
    notifications: Arc<dyn NotificationDispatcher>,
    promotions: Arc<PromotionLedger>,
}

impl SubscriptionReconciler {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        payment_provider: Arc<dyn PaymentProvider>,
        catalog: Arc<dyn CatalogStore>,
        notifications: Arc<dyn NotificationDispatcher>,
        promotions: Arc<PromotionLedger>,
    ) -> Self {
        Self {
            subscriptions,
            payment_provider,
            catalog,
            notifications,
            promotions,
        }
    }

    /// Activates a subscription from a paid checkout session.
    pub async fn activate_from_checkout(
        &self,
        kind: EntityKind,
        session: &CheckoutSession,
    ) -> Outcome {
        match self.try_activate_from_checkout(kind, session).await {
            Ok(outcome) => outcome,
            Err(error) => Outcome::Failed(error),
        }
    }

    /// Mirrors a provider lifecycle update onto the local record.
    pub async fn reconcile(&self, kind: EntityKind, subscription: &ProviderSubscription) -> Outcome {
        let mapping = SubscriptionStatus::map_provider_status(
            &subscription.status,
            subscription.cancel_at_period_end,
        );
        let target = match mapping {
            ProviderStatusMapping::KeepCurrent => {
                tracing::info!(
                    subscription_id = %subscription.id,
                    status = %subscription.status,
                    "dunning in progress, leaving local record untouched"
                );
                return Outcome::Skipped(SkipReason::TransientProviderState(
                    subscription.status.clone(),
                ));
            }
            ProviderStatusMapping::Set(target) => target,
        };

        match self.apply(kind, subscription, target).await {
            Ok(outcome) => outcome,
            Err(error) => Outcome::Failed(error),
        }
    }

    /// Finalizes a provider-side deletion.
    ///
    /// Deletion events sometimes embed the subscription's last status
    /// rather than `canceled`, so the target is forced rather than mapped.
    pub async fn finalize_deletion(
        &self,
        kind: EntityKind,
        subscription: &ProviderSubscription,
    ) -> Outcome {
        match self
            .apply(kind, subscription, SubscriptionStatus::Cancelled)
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => Outcome::Failed(error),
        }
    }

    /// Reconciles the subscription behind a failed invoice.
    ///
    /// The invoice itself is not acted on. Its subscription is re-fetched
    /// and pushed through the normal reconcile path, which leaves dunning
    /// states alone and cancels subscriptions the provider already gave
    /// up on.
    pub async fn reconcile_failed_invoice(&self, invoice: &Invoice) -> Outcome {
        match self.try_reconcile_failed_invoice(invoice).await {
            Ok(outcome) => outcome,
            Err(error) => Outcome::Failed(error),
        }
    }

    async fn try_activate_from_checkout(
        &self,
        kind: EntityKind,
        session: &CheckoutSession,
    ) -> Result<Outcome, ProcessingError> {
        if !session.is_paid() {
            return Ok(Outcome::Skipped(SkipReason::UnpaidSession(
                session.payment_status.clone(),
            )));
        }

        let scope = metadata::subscription_scope(kind, &session.metadata)?;
        let subscription_id = session.subscription.as_deref().ok_or_else(|| {
            ProcessingError::MalformedObject(format!(
                "checkout session {} has no subscription reference",
                session.id
            ))
        })?;

        self.require_verified_operator(&scope).await?;

        let subscription = self.fetch_verified(subscription_id).await?;
        let cadence = metadata::cadence(&session.metadata);
        let period_start = subscription.period_start().unwrap_or_else(Timestamp::now);
        let period_end = self.period_end_or_fallback(&subscription, cadence);

        let record = match self.subscriptions.find_by_scope(&scope).await? {
            Some(mut existing) => {
                existing.activate(
                    cadence,
                    subscription.id.clone(),
                    subscription.customer.clone(),
                    subscription.price_id().map(str::to_string),
                    period_start,
                    period_end,
                )?;
                existing
            }
            None => {
                tracing::info!(%scope, "paid checkout found no local row, creating active record");
                SubscriptionRecord::new_active(
                    scope.clone(),
                    cadence,
                    subscription.id.clone(),
                    subscription.customer.clone(),
                    subscription.price_id().map(str::to_string),
                    period_start,
                    period_end,
                )
            }
        };
        retry_once("subscriptions.upsert", || self.subscriptions.upsert(&record)).await?;

        // Premium plans can bundle a promoted placement; if the catalog flow
        // reserved one, it goes live with the subscription.
        if let Some(entity) = bundled_entity(&scope, &session.metadata) {
            self.promotions
                .activate_bundled(entity, period_end, &subscription.id, Some(record.id))
                .await?;
        }

        tracing::info!(%scope, subscription_id = %subscription.id, "subscription activated");
        self.notify_activated(&scope, cadence, period_end);
        Ok(Outcome::Applied)
    }

    async fn try_reconcile_failed_invoice(
        &self,
        invoice: &Invoice,
    ) -> Result<Outcome, ProcessingError> {
        let Some(subscription_id) = invoice.subscription.as_deref() else {
            tracing::info!(invoice_id = %invoice.id, "failed invoice has no subscription");
            return Ok(Outcome::Skipped(SkipReason::UnhandledEvent {
                event_type: "invoice.payment_failed".to_string(),
                entity_kind: None,
            }));
        };

        let subscription = self
            .payment_provider
            .get_subscription(subscription_id)
            .await?
            .ok_or_else(|| {
                ProcessingError::VerificationFailed(format!(
                    "subscription {} not found upstream",
                    subscription_id
                ))
            })?;

        match subscription.entity_kind() {
            Some(EntityKind::PromotionUpgrade) => {
                Ok(self.promotions.reconcile(&subscription).await)
            }
            Some(EntityKind::PointsPackage) | None => {
                Ok(Outcome::Skipped(SkipReason::UnhandledEvent {
                    event_type: "invoice.payment_failed".to_string(),
                    entity_kind: subscription.metadata.get("type").cloned(),
                }))
            }
            Some(kind) => Ok(self.reconcile(kind, &subscription).await),
        }
    }

    /// Applies a mapped target status to the scope's record.
    async fn apply(
        &self,
        kind: EntityKind,
        subscription: &ProviderSubscription,
        target: SubscriptionStatus,
    ) -> Result<Outcome, ProcessingError> {
        let scope = metadata::subscription_scope(kind, &subscription.metadata)?;
        let existing = self.subscriptions.find_by_scope(&scope).await?;

        // Reconciliation can be the first event that grants benefits, in
        // which case the operator gate still applies.
        let newly_granting = target.grants_benefits()
            && !existing.as_ref().map(|r| r.grants_benefits()).unwrap_or(false);
        if newly_granting {
            self.require_verified_operator(&scope).await?;
        }

        let cadence = existing
            .as_ref()
            .map(|record| record.cadence)
            .unwrap_or_else(|| metadata::cadence(&subscription.metadata));
        let period_end = self.period_end_or_fallback(subscription, cadence);

        let mut record = match existing {
            Some(record) => record,
            None => {
                tracing::info!(
                    %scope,
                    subscription_id = %subscription.id,
                    "lifecycle event arrived before checkout, creating record"
                );
                let mut record = SubscriptionRecord::new_pending(scope.clone(), cadence);
                record.stripe_subscription_id = Some(subscription.id.clone());
                record.stripe_customer_id = subscription.customer.clone();
                record.stripe_price_id = subscription.price_id().map(str::to_string);
                record.current_period_start = subscription.period_start();
                record
            }
        };

        record.apply_provider_state(target, period_end);
        retry_once("subscriptions.upsert", || self.subscriptions.upsert(&record)).await?;

        if target == SubscriptionStatus::Cancelled {
            let fallback = metadata::fallback_identifiers(&subscription.metadata);
            let cancelled = self.promotions.cancel_linked(&subscription.id, fallback).await?;
            if cancelled > 0 {
                tracing::info!(
                    subscription_id = %subscription.id,
                    cancelled,
                    "placements funded by cancelled subscription were ended"
                );
            }
        }

        tracing::info!(%scope, status = %record.status, "subscription reconciled");
        Ok(Outcome::Applied)
    }

    /// Re-fetches the subscription and confirms it is running upstream.
    async fn fetch_verified(
        &self,
        subscription_id: &str,
    ) -> Result<ProviderSubscription, ProcessingError> {
        let subscription = self
            .payment_provider
            .get_subscription(subscription_id)
            .await?
            .ok_or_else(|| {
                ProcessingError::VerificationFailed(format!(
                    "subscription {} not found upstream",
                    subscription_id
                ))
            })?;

        if !is_activatable_provider_status(&subscription.status) {
            return Err(ProcessingError::VerificationFailed(format!(
                "subscription {} is {} upstream, activation requires active or trialing",
                subscription.id, subscription.status
            )));
        }
        Ok(subscription)
    }

    async fn require_verified_operator(
        &self,
        scope: &SubscriptionScope,
    ) -> Result<(), ProcessingError> {
        let SubscriptionScope::TourOperator { operator_id } = scope else {
            return Ok(());
        };
        if !self.catalog.operator_is_verified(*operator_id).await? {
            return Err(ProcessingError::OperatorNotVerified(operator_id.as_i64()));
        }
        Ok(())
    }

    fn period_end_or_fallback(
        &self,
        subscription: &ProviderSubscription,
        cadence: PlanCadence,
    ) -> Timestamp {
        subscription.period_end().unwrap_or_else(|| {
            tracing::warn!(
                subscription_id = %subscription.id,
                cadence = %cadence,
                "provider omitted current_period_end, synthesizing from cadence"
            );
            cadence.fallback_period_end(Timestamp::now())
        })
    }

    /// Fire-and-forget activation notice. Failures never affect the event.
    fn notify_activated(&self, scope: &SubscriptionScope, cadence: PlanCadence, period_end: Timestamp) {
        let notifications = self.notifications.clone();
        let recipient = scope.to_string();
        let params = HashMap::from([
            ("plan".to_string(), cadence.to_string()),
            (
                "periodEnd".to_string(),
                period_end.as_datetime().to_rfc3339(),
            ),
        ]);
        tokio::spawn(async move {
            if let Err(error) = notifications
                .send("subscription_activated", &recipient, params)
                .await
            {
                tracing::warn!(%recipient, %error, "activation notification failed");
            }
        });
    }
}

/// Placement bundled with a premium plan, if the plan carries one.
///
/// Restaurant premium always promotes the restaurant itself. Tour operator
/// premium promotes a tour only when checkout metadata names one.
fn bundled_entity(
    scope: &SubscriptionScope,
    metadata: &HashMap<String, String>,
) -> Option<PromotedEntity> {
    match scope {
        SubscriptionScope::Restaurant { restaurant_id, .. } => {
            Some(PromotedEntity::Restaurant(*restaurant_id))
        }
        SubscriptionScope::TourOperator { .. } => metadata
            .get("tourId")
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(|id| PromotedEntity::Tour(TourId::new(id))),
        SubscriptionScope::User { .. } => None,
    }
}
