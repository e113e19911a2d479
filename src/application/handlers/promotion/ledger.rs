//! Promotion ledger: the single writer of PromotionListing lifecycle state.
//!
//! Placements are reserved as `pending` rows by the catalog flow before
//! checkout; this ledger converts them to `active` on payment, extends them
//! on renewal, and cancels them when the funding subscription dies. Every
//! change is mirrored onto the catalog entity's denormalized
//! `is_promoted`/`promoted_until` flags, which stay re-derivable from the
//! listing rows.

use std::sync::Arc;

use crate::application::handlers::{metadata, retry_once};
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::domain::promotion::{PromotedEntity, PromotionListing};
use crate::domain::subscription::{is_activatable_provider_status, PlanCadence};
use crate::domain::webhook::{
    CheckoutSession, Outcome, ProcessingError, ProviderSubscription, SkipReason,
};
use crate::ports::{CatalogStore, PaymentProvider, PromotionStore};

/// Handler for promoted-listing lifecycle events.
pub struct PromotionLedger {
    promotions: Arc<dyn PromotionStore>,
    catalog: Arc<dyn CatalogStore>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl PromotionLedger {
    pub fn new(
        promotions: Arc<dyn PromotionStore>,
        catalog: Arc<dyn CatalogStore>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            promotions,
            catalog,
            payment_provider,
        }
    }

    /// Activates a placement from a paid `promotion_upgrade` checkout.
    pub async fn activate_from_checkout(&self, session: &CheckoutSession) -> Outcome {
        match self.try_activate_from_checkout(session).await {
            Ok(outcome) => outcome,
            Err(error) => Outcome::Failed(error),
        }
    }

    /// Reconciles placements against a provider subscription update.
    pub async fn reconcile(&self, subscription: &ProviderSubscription) -> Outcome {
        match self.try_reconcile(subscription).await {
            Ok(outcome) => outcome,
            Err(error) => Outcome::Failed(error),
        }
    }

    /// Cancels placements funded by a deleted provider subscription.
    pub async fn cancel_subscription(&self, subscription: &ProviderSubscription) -> Outcome {
        let fallback = metadata::fallback_identifiers(&subscription.metadata);
        match self.cancel_linked(&subscription.id, fallback).await {
            Ok(0) => {
                tracing::info!(
                    subscription_id = %subscription.id,
                    "no active placements linked to deleted subscription"
                );
                Outcome::Applied
            }
            Ok(cancelled) => {
                tracing::info!(
                    subscription_id = %subscription.id,
                    cancelled,
                    "placements cancelled for deleted subscription"
                );
                Outcome::Applied
            }
            Err(error) => Outcome::Failed(error),
        }
    }

    /// Activates any pending placement bundled with a premium subscription.
    ///
    /// Opportunistic: zero pending rows means nothing to do. Unlike the
    /// standalone upgrade path there is no fallback insert, because premium
    /// plans do not imply a placement was purchased.
    pub async fn activate_bundled(
        &self,
        entity: PromotedEntity,
        end_date: Timestamp,
        stripe_subscription_id: &str,
        parent_subscription_id: Option<SubscriptionId>,
    ) -> Result<(), ProcessingError> {
        if self
            .activate_pending(entity, end_date, stripe_subscription_id, parent_subscription_id)
            .await?
        {
            tracing::info!(%entity, "bundled placement activated alongside premium subscription");
        }
        Ok(())
    }

    /// Cancels every active placement funded by the given subscription.
    ///
    /// Lookup strategies in priority order: the `stripe_subscription_id`
    /// link is authoritative; when it matches nothing, fall back to the
    /// `{entity, user, active}` natural key carried in event metadata.
    /// Returns how many placements were cancelled; zero means the local
    /// state already converged.
    pub async fn cancel_linked(
        &self,
        stripe_subscription_id: &str,
        fallback: Option<(PromotedEntity, UserId)>,
    ) -> Result<u64, ProcessingError> {
        let mut listings = self
            .promotions
            .find_active_by_provider_id(stripe_subscription_id)
            .await?;

        if listings.is_empty() {
            if let Some((entity, user_id)) = fallback {
                tracing::info!(
                    %stripe_subscription_id,
                    %entity,
                    "no placement linked by subscription id, trying entity/user lookup"
                );
                listings = self
                    .promotions
                    .find_active_by_entity_and_user(entity, user_id)
                    .await?;
            }
        }

        let mut cancelled = 0u64;
        for mut listing in listings {
            let entity = listing.entity;
            listing.cancel()?;
            retry_once("promotions.update", || self.promotions.update(&listing)).await?;
            self.mirror_flags(entity, None).await?;
            cancelled += 1;
        }
        Ok(cancelled)
    }

    async fn try_activate_from_checkout(
        &self,
        session: &CheckoutSession,
    ) -> Result<Outcome, ProcessingError> {
        if !session.is_paid() {
            return Ok(Outcome::Skipped(SkipReason::UnpaidSession(
                session.payment_status.clone(),
            )));
        }

        let entity = metadata::promoted_entity(&session.metadata)?;
        let user_id = metadata::user_id(&session.metadata)?;
        let subscription_id = session.subscription.as_deref().ok_or_else(|| {
            ProcessingError::MalformedObject(format!(
                "checkout session {} has no subscription reference",
                session.id
            ))
        })?;

        let subscription = self.fetch_verified(subscription_id).await?;
        let cadence = metadata::cadence(&session.metadata);
        let end_date = self.end_date_or_fallback(&subscription, cadence);

        if self
            .activate_pending(entity, end_date, &subscription.id, None)
            .await?
        {
            tracing::info!(%entity, subscription_id = %subscription.id, "placement activated");
            return Ok(Outcome::Applied);
        }

        // A redelivery or an out-of-order subscription.updated may already
        // have activated the row; converge its end date instead of
        // inserting a duplicate.
        let already_active = self
            .promotions
            .find_active_by_provider_id(&subscription.id)
            .await?;
        if !already_active.is_empty() {
            for mut listing in already_active {
                listing.extend(end_date);
                retry_once("promotions.update", || self.promotions.update(&listing)).await?;
            }
            self.mirror_flags(entity, Some(end_date)).await?;
            return Ok(Outcome::Applied);
        }

        tracing::warn!(
            %entity,
            session_id = %session.id,
            "paid promotion checkout found no pending row, inserting active placement"
        );
        let listing = PromotionListing::new_active(
            entity,
            user_id,
            end_date,
            Some(subscription.id.clone()),
            None,
        );
        retry_once("promotions.insert", || self.promotions.insert(&listing)).await?;
        self.mirror_flags(entity, Some(end_date)).await?;
        Ok(Outcome::Applied)
    }

    async fn try_reconcile(
        &self,
        subscription: &ProviderSubscription,
    ) -> Result<Outcome, ProcessingError> {
        match subscription.status.as_str() {
            "canceled" | "unpaid" => {
                let fallback = metadata::fallback_identifiers(&subscription.metadata);
                let cancelled = self.cancel_linked(&subscription.id, fallback).await?;
                tracing::info!(
                    subscription_id = %subscription.id,
                    cancelled,
                    "placements cancelled after terminal provider status"
                );
                Ok(Outcome::Applied)
            }
            // A scheduled cancellation keeps the paid placement running
            // until the period end, so both active shapes just extend.
            "active" => self.extend_linked(subscription).await,
            other => Ok(Outcome::Skipped(SkipReason::TransientProviderState(
                other.to_string(),
            ))),
        }
    }

    /// Extends active placements to the renewed billing period.
    async fn extend_linked(
        &self,
        subscription: &ProviderSubscription,
    ) -> Result<Outcome, ProcessingError> {
        let cadence = metadata::cadence(&subscription.metadata);
        let end_date = self.end_date_or_fallback(subscription, cadence);

        let linked = self
            .promotions
            .find_active_by_provider_id(&subscription.id)
            .await?;

        if linked.is_empty() {
            // The renewal may have raced ahead of the checkout event.
            if let Ok(entity) = metadata::promoted_entity(&subscription.metadata) {
                if self
                    .activate_pending(entity, end_date, &subscription.id, None)
                    .await?
                {
                    return Ok(Outcome::Applied);
                }
            }
            return Err(ProcessingError::RecordNotFound(format!(
                "no placements linked to subscription {}",
                subscription.id
            )));
        }

        for mut listing in linked {
            let entity = listing.entity;
            listing.extend(end_date);
            retry_once("promotions.update", || self.promotions.update(&listing)).await?;
            self.mirror_flags(entity, Some(end_date)).await?;
        }
        Ok(Outcome::Applied)
    }

    /// Converts the entity's pending row to active, cleaning up duplicates.
    ///
    /// Returns false when the entity has no pending row.
    async fn activate_pending(
        &self,
        entity: PromotedEntity,
        end_date: Timestamp,
        stripe_subscription_id: &str,
        parent_subscription_id: Option<SubscriptionId>,
    ) -> Result<bool, ProcessingError> {
        let Some(mut listing) = self.promotions.find_pending(entity).await? else {
            return Ok(false);
        };

        listing.activate(
            end_date,
            Some(stripe_subscription_id.to_string()),
            parent_subscription_id,
        )?;
        retry_once("promotions.update", || self.promotions.update(&listing)).await?;

        let removed = self
            .promotions
            .delete_pending_except(entity, listing.id)
            .await?;
        if removed > 0 {
            tracing::info!(%entity, removed, "removed duplicate pending placement rows");
        }

        self.mirror_flags(entity, listing.end_date).await?;
        Ok(true)
    }

    /// Re-fetches the funding subscription and confirms it is running.
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

    fn end_date_or_fallback(
        &self,
        subscription: &ProviderSubscription,
        cadence: PlanCadence,
    ) -> Timestamp {
        subscription.period_end().unwrap_or_else(|| {
            tracing::warn!(
                subscription_id = %subscription.id,
                cadence = %cadence,
                "provider omitted current_period_end, synthesizing placement end date"
            );
            cadence.fallback_period_end(Timestamp::now())
        })
    }

    async fn mirror_flags(
        &self,
        entity: PromotedEntity,
        promoted_until: Option<Timestamp>,
    ) -> Result<(), ProcessingError> {
        retry_once("catalog.set_promotion_flags", || {
            self.catalog.set_promotion_flags(entity, promoted_until)
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::adapters::memory::{
        InMemoryCatalogStore, InMemoryPromotionStore, MockPaymentProvider,
    };
    use crate::domain::foundation::RestaurantId;
    use crate::domain::promotion::PromotionStatus;
    use crate::ports::ProviderApiError;

    // ══════════════════════════════════════════════════════════════
    // Test Helpers
    // ══════════════════════════════════════════════════════════════

    struct Harness {
        promotions: Arc<InMemoryPromotionStore>,
        catalog: Arc<InMemoryCatalogStore>,
        provider: Arc<MockPaymentProvider>,
        ledger: PromotionLedger,
    }

    fn harness() -> Harness {
        let promotions = Arc::new(InMemoryPromotionStore::new());
        let catalog = Arc::new(InMemoryCatalogStore::new());
        let provider = Arc::new(MockPaymentProvider::new());
        let ledger = PromotionLedger::new(
            promotions.clone(),
            catalog.clone(),
            provider.clone(),
        );
        Harness {
            promotions,
            catalog,
            provider,
            ledger,
        }
    }

    fn restaurant() -> PromotedEntity {
        PromotedEntity::Restaurant(RestaurantId::new(42))
    }

    fn upgrade_session(subscription: Option<&str>) -> CheckoutSession {
        let mut metadata = HashMap::new();
        metadata.insert("type".to_string(), "promotion_upgrade".to_string());
        metadata.insert("restaurantId".to_string(), "42".to_string());
        metadata.insert(
            "userId".to_string(),
            "550e8400-e29b-41d4-a716-446655440000".to_string(),
        );
        CheckoutSession {
            id: "cs_upgrade".to_string(),
            customer: Some("cus_1".to_string()),
            subscription: subscription.map(str::to_string),
            payment_intent: None,
            payment_status: "paid".to_string(),
            mode: Some("subscription".to_string()),
            metadata,
        }
    }

    fn user_id() -> UserId {
        UserId::from_uuid(uuid::Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap())
    }

    fn provider_subscription(status: &str, period_end: Option<i64>) -> ProviderSubscription {
        let mut subscription =
            MockPaymentProvider::subscription_with_status("sub_promo", status, period_end);
        subscription
            .metadata
            .insert("type".to_string(), "promotion_upgrade".to_string());
        subscription
            .metadata
            .insert("restaurantId".to_string(), "42".to_string());
        subscription.metadata.insert(
            "userId".to_string(),
            "550e8400-e29b-41d4-a716-446655440000".to_string(),
        );
        subscription
    }

    fn far_future_unix() -> i64 {
        Timestamp::now().add_days(30).as_unix_secs()
    }

    // ══════════════════════════════════════════════════════════════
    // Checkout Activation Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn pending_row_activates_in_place() {
        let h = harness();
        let pending = PromotionListing::new_pending(restaurant(), user_id());
        let pending_id = pending.id;
        h.promotions.seed(pending);
        h.provider.add_subscription(MockPaymentProvider::active_subscription(
            "sub_promo",
            far_future_unix(),
        ));

        let outcome = h
            .ledger
            .activate_from_checkout(&upgrade_session(Some("sub_promo")))
            .await;

        assert!(outcome.is_applied());
        let row = h.promotions.get(pending_id).unwrap();
        assert_eq!(row.status, PromotionStatus::Active);
        assert_eq!(row.stripe_subscription_id.as_deref(), Some("sub_promo"));
        assert_eq!(h.promotions.row_count(), 1);
        // Mirrored flags follow the placement
        assert_eq!(
            h.catalog.flag_state(restaurant()),
            Some(row.end_date)
        );
    }

    #[tokio::test]
    async fn duplicate_pending_rows_are_cleaned_up() {
        let h = harness();
        let first = PromotionListing::new_pending(restaurant(), user_id());
        let first_id = first.id;
        h.promotions.seed(first);
        h.promotions.seed(PromotionListing::new_pending(restaurant(), user_id()));
        h.promotions.seed(PromotionListing::new_pending(restaurant(), user_id()));
        h.provider.add_subscription(MockPaymentProvider::active_subscription(
            "sub_promo",
            far_future_unix(),
        ));

        let outcome = h
            .ledger
            .activate_from_checkout(&upgrade_session(Some("sub_promo")))
            .await;

        assert!(outcome.is_applied());
        assert_eq!(h.promotions.row_count(), 1);
        assert_eq!(
            h.promotions.get(first_id).unwrap().status,
            PromotionStatus::Active
        );
    }

    #[tokio::test]
    async fn missing_pending_row_falls_back_to_insert() {
        let h = harness();
        h.provider.add_subscription(MockPaymentProvider::active_subscription(
            "sub_promo",
            far_future_unix(),
        ));

        let outcome = h
            .ledger
            .activate_from_checkout(&upgrade_session(Some("sub_promo")))
            .await;

        assert!(outcome.is_applied());
        let rows = h.promotions.all_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, PromotionStatus::Active);
        assert_eq!(rows[0].user_id, user_id());
    }

    #[tokio::test]
    async fn redelivered_checkout_converges_on_one_active_row() {
        let h = harness();
        h.promotions.seed(PromotionListing::new_pending(restaurant(), user_id()));
        h.provider.add_subscription(MockPaymentProvider::active_subscription(
            "sub_promo",
            far_future_unix(),
        ));
        let session = upgrade_session(Some("sub_promo"));

        assert!(h.ledger.activate_from_checkout(&session).await.is_applied());
        assert!(h.ledger.activate_from_checkout(&session).await.is_applied());

        let rows = h.promotions.all_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, PromotionStatus::Active);
    }

    #[tokio::test]
    async fn unpaid_checkout_is_skipped() {
        let h = harness();
        let mut session = upgrade_session(Some("sub_promo"));
        session.payment_status = "unpaid".to_string();

        let outcome = h.ledger.activate_from_checkout(&session).await;

        assert!(matches!(
            outcome,
            Outcome::Skipped(SkipReason::UnpaidSession(_))
        ));
        assert_eq!(h.promotions.row_count(), 0);
        assert_eq!(h.provider.call_count(), 0);
    }

    #[tokio::test]
    async fn inactive_upstream_subscription_fails_verification() {
        let h = harness();
        h.promotions.seed(PromotionListing::new_pending(restaurant(), user_id()));
        h.provider.add_subscription(MockPaymentProvider::subscription_with_status(
            "sub_promo",
            "incomplete",
            None,
        ));

        let outcome = h
            .ledger
            .activate_from_checkout(&upgrade_session(Some("sub_promo")))
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(ProcessingError::VerificationFailed(_))
        ));
        assert_eq!(
            h.promotions.all_rows()[0].status,
            PromotionStatus::Pending
        );
    }

    #[tokio::test]
    async fn provider_outage_fails_the_event() {
        let h = harness();
        h.provider.set_error(ProviderApiError::network("upstream timeout"));

        let outcome = h
            .ledger
            .activate_from_checkout(&upgrade_session(Some("sub_promo")))
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(ProcessingError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn checkout_without_subscription_reference_fails() {
        let h = harness();

        let outcome = h.ledger.activate_from_checkout(&upgrade_session(None)).await;

        assert!(matches!(
            outcome,
            Outcome::Failed(ProcessingError::MalformedObject(_))
        ));
    }

    // ══════════════════════════════════════════════════════════════
    // Renewal Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn renewal_extends_linked_placements() {
        let h = harness();
        let initial_end = Timestamp::now().add_days(3);
        let listing = PromotionListing::new_active(
            restaurant(),
            user_id(),
            initial_end,
            Some("sub_promo".to_string()),
            None,
        );
        let listing_id = listing.id;
        h.promotions.seed(listing);

        let renewed_end = far_future_unix();
        let outcome = h
            .ledger
            .reconcile(&provider_subscription("active", Some(renewed_end)))
            .await;

        assert!(outcome.is_applied());
        let row = h.promotions.get(listing_id).unwrap();
        assert_eq!(row.end_date.unwrap().as_unix_secs(), renewed_end);
        assert_eq!(
            h.catalog.flag_state(restaurant()).flatten().unwrap().as_unix_secs(),
            renewed_end
        );
    }

    #[tokio::test]
    async fn renewal_before_checkout_activates_the_pending_row() {
        let h = harness();
        h.promotions.seed(PromotionListing::new_pending(restaurant(), user_id()));

        let outcome = h
            .ledger
            .reconcile(&provider_subscription("active", Some(far_future_unix())))
            .await;

        assert!(outcome.is_applied());
        assert_eq!(
            h.promotions.all_rows()[0].status,
            PromotionStatus::Active
        );
    }

    #[tokio::test]
    async fn renewal_with_nothing_to_extend_is_a_recorded_failure() {
        let h = harness();

        let outcome = h
            .ledger
            .reconcile(&provider_subscription("active", Some(far_future_unix())))
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(ProcessingError::RecordNotFound(_))
        ));
    }

    #[tokio::test]
    async fn past_due_leaves_placements_untouched() {
        let h = harness();
        let end = Timestamp::now().add_days(10);
        let listing = PromotionListing::new_active(
            restaurant(),
            user_id(),
            end,
            Some("sub_promo".to_string()),
            None,
        );
        let listing_id = listing.id;
        h.promotions.seed(listing);

        let outcome = h
            .ledger
            .reconcile(&provider_subscription("past_due", None))
            .await;

        assert!(matches!(
            outcome,
            Outcome::Skipped(SkipReason::TransientProviderState(_))
        ));
        let row = h.promotions.get(listing_id).unwrap();
        assert_eq!(row.status, PromotionStatus::Active);
        assert_eq!(row.end_date, Some(end));
    }

    // ══════════════════════════════════════════════════════════════
    // Cancellation Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn deleted_subscription_cancels_linked_placements() {
        let h = harness();
        let listing = PromotionListing::new_active(
            restaurant(),
            user_id(),
            Timestamp::now().add_days(20),
            Some("sub_promo".to_string()),
            None,
        );
        let listing_id = listing.id;
        h.promotions.seed(listing);

        let outcome = h
            .ledger
            .cancel_subscription(&provider_subscription("canceled", None))
            .await;

        assert!(outcome.is_applied());
        let row = h.promotions.get(listing_id).unwrap();
        assert_eq!(row.status, PromotionStatus::Cancelled);
        assert!(row.stripe_subscription_id.is_none());
        // Un-promoted flags mirrored back
        assert_eq!(h.catalog.flag_state(restaurant()), Some(None));
    }

    #[tokio::test]
    async fn cancellation_falls_back_to_entity_and_user_lookup() {
        let h = harness();
        // Link field was never written, so only the natural key can find it
        let listing = PromotionListing::new_active(
            restaurant(),
            user_id(),
            Timestamp::now().add_days(20),
            None,
            None,
        );
        let listing_id = listing.id;
        h.promotions.seed(listing);

        let outcome = h
            .ledger
            .cancel_subscription(&provider_subscription("canceled", None))
            .await;

        assert!(outcome.is_applied());
        assert_eq!(
            h.promotions.get(listing_id).unwrap().status,
            PromotionStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn unpaid_status_cancels_like_deletion() {
        let h = harness();
        let listing = PromotionListing::new_active(
            restaurant(),
            user_id(),
            Timestamp::now().add_days(20),
            Some("sub_promo".to_string()),
            None,
        );
        let listing_id = listing.id;
        h.promotions.seed(listing);

        let outcome = h
            .ledger
            .reconcile(&provider_subscription("unpaid", None))
            .await;

        assert!(outcome.is_applied());
        assert_eq!(
            h.promotions.get(listing_id).unwrap().status,
            PromotionStatus::Cancelled
        );
    }

    #[tokio::test]
    async fn cancelling_nothing_still_converges() {
        let h = harness();

        let outcome = h
            .ledger
            .cancel_subscription(&provider_subscription("canceled", None))
            .await;

        assert!(outcome.is_applied());
    }

    // ══════════════════════════════════════════════════════════════
    // Bundled Activation Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn bundled_activation_consumes_pending_row() {
        let h = harness();
        let pending = PromotionListing::new_pending(restaurant(), user_id());
        let pending_id = pending.id;
        h.promotions.seed(pending);
        let parent = SubscriptionId::new();
        let end = Timestamp::now().add_days(30);

        h.ledger
            .activate_bundled(restaurant(), end, "sub_premium", Some(parent))
            .await
            .unwrap();

        let row = h.promotions.get(pending_id).unwrap();
        assert_eq!(row.status, PromotionStatus::Active);
        assert_eq!(row.parent_subscription_id, Some(parent));
        assert_eq!(row.stripe_subscription_id.as_deref(), Some("sub_premium"));
    }

    #[tokio::test]
    async fn bundled_activation_without_pending_row_inserts_nothing() {
        let h = harness();

        h.ledger
            .activate_bundled(
                restaurant(),
                Timestamp::now().add_days(30),
                "sub_premium",
                None,
            )
            .await
            .unwrap();

        assert_eq!(h.promotions.row_count(), 0);
        assert_eq!(h.catalog.flag_state(restaurant()), None);
    }
}
