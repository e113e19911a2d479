//! Points credit applier: turns paid one-time checkouts into point balances.
//!
//! Crediting is keyed by the provider payment intent, so a redelivered or
//! duplicated event finds the existing credit row and leaves the balance
//! alone. The store performs the row insert and balance increment in one
//! transaction.

use std::collections::HashMap;
use std::sync::Arc;

use crate::application::handlers::{metadata, retry_once};
use crate::domain::points::{CreditResult, PointCredit, PointsPackage};
use crate::domain::webhook::{CheckoutSession, Outcome, ProcessingError, SkipReason};
use crate::ports::{NotificationDispatcher, PointsStore};

/// Handler for points package purchases.
pub struct PointsCreditApplier {
    points: Arc<dyn PointsStore>,
    notifications: Arc<dyn NotificationDispatcher>,
}

impl PointsCreditApplier {
    pub fn new(
        points: Arc<dyn PointsStore>,
        notifications: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            points,
            notifications,
        }
    }

    /// Credits the purchased package to the buyer's account.
    pub async fn apply_from_checkout(&self, session: &CheckoutSession) -> Outcome {
        match self.try_apply_from_checkout(session).await {
            Ok(outcome) => outcome,
            Err(error) => Outcome::Failed(error),
        }
    }

    async fn try_apply_from_checkout(
        &self,
        session: &CheckoutSession,
    ) -> Result<Outcome, ProcessingError> {
        if !session.is_paid() {
            return Ok(Outcome::Skipped(SkipReason::UnpaidSession(
                session.payment_status.clone(),
            )));
        }

        let user_id = metadata::user_id(&session.metadata)?;
        let package_name = session.meta("packageName")?;
        let Some(package) = PointsPackage::from_wire(package_name) else {
            return Ok(Outcome::Failed(ProcessingError::UnknownPackage(
                package_name.to_string(),
            )));
        };

        // One-time payments carry an intent, not a subscription.
        let payment_intent = session.payment_intent.as_deref().ok_or_else(|| {
            ProcessingError::MalformedObject(format!(
                "checkout session {} has no payment intent",
                session.id
            ))
        })?;

        let credit = PointCredit::new(payment_intent, user_id, package, Some(session.id.clone()));
        let result = retry_once("points.apply_credit", || self.points.apply_credit(&credit)).await?;

        match result {
            CreditResult::Credited { points, new_balance } => {
                tracing::info!(
                    %user_id,
                    package = package.as_str(),
                    points,
                    new_balance,
                    "points credited"
                );
                self.notify_credited(user_id.to_string(), points, new_balance);
                Ok(Outcome::Applied)
            }
            CreditResult::Duplicate => {
                tracing::info!(
                    payment_intent,
                    "payment intent already credited, skipping"
                );
                Ok(Outcome::Skipped(SkipReason::AlreadyCredited))
            }
        }
    }

    /// Fire-and-forget purchase notice. Only the first credit notifies.
    fn notify_credited(&self, recipient: String, points: i64, new_balance: i64) {
        let notifications = self.notifications.clone();
        let params = HashMap::from([
            ("points".to_string(), points.to_string()),
            ("balance".to_string(), new_balance.to_string()),
        ]);
        tokio::spawn(async move {
            if let Err(error) = notifications
                .send("points_credited", &recipient, params)
                .await
            {
                tracing::warn!(%recipient, %error, "points notification failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::adapters::memory::{InMemoryPointsStore, RecordingNotificationDispatcher};
    use crate::domain::foundation::{DomainError, ErrorCode, UserId};

    // ══════════════════════════════════════════════════════════════
    // Test Helpers
    // ══════════════════════════════════════════════════════════════

    struct Harness {
        points: Arc<InMemoryPointsStore>,
        notifications: Arc<RecordingNotificationDispatcher>,
        applier: PointsCreditApplier,
    }

    fn harness() -> Harness {
        let points = Arc::new(InMemoryPointsStore::new());
        let notifications = Arc::new(RecordingNotificationDispatcher::new());
        let applier = PointsCreditApplier::new(points.clone(), notifications.clone());
        Harness {
            points,
            notifications,
            applier,
        }
    }

    fn buyer() -> UserId {
        UserId::from_uuid(uuid::Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap())
    }

    fn package_session(package: &str, payment_intent: Option<&str>) -> CheckoutSession {
        let mut metadata = HashMap::new();
        metadata.insert("type".to_string(), "points_package".to_string());
        metadata.insert(
            "userId".to_string(),
            "550e8400-e29b-41d4-a716-446655440000".to_string(),
        );
        metadata.insert("packageName".to_string(), package.to_string());
        CheckoutSession {
            id: "cs_points".to_string(),
            customer: Some("cus_1".to_string()),
            subscription: None,
            payment_intent: payment_intent.map(str::to_string),
            payment_status: "paid".to_string(),
            mode: Some("payment".to_string()),
            metadata,
        }
    }

    async fn drain_spawned_tasks() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Crediting Tests
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn paid_package_credits_the_balance() {
        let h = harness();

        let outcome = h
            .applier
            .apply_from_checkout(&package_session("plus", Some("pi_1")))
            .await;

        assert!(outcome.is_applied());
        assert_eq!(h.points.balance_of(buyer()), Some(30));
        assert_eq!(h.points.credit_count(), 1);

        drain_spawned_tasks().await;
        assert!(h.notifications.was_sent("points_credited"));
    }

    #[tokio::test]
    async fn each_package_grants_its_tier() {
        let h = harness();

        h.applier
            .apply_from_checkout(&package_session("starter", Some("pi_1")))
            .await;
        h.applier
            .apply_from_checkout(&package_session("plus", Some("pi_2")))
            .await;
        h.applier
            .apply_from_checkout(&package_session("max", Some("pi_3")))
            .await;

        assert_eq!(h.points.balance_of(buyer()), Some(10 + 30 + 75));
        assert_eq!(h.points.credit_count(), 3);
    }

    #[tokio::test]
    async fn redelivered_intent_credits_exactly_once() {
        let h = harness();
        let session = package_session("max", Some("pi_1"));

        let first = h.applier.apply_from_checkout(&session).await;
        let second = h.applier.apply_from_checkout(&session).await;

        assert!(first.is_applied());
        assert!(matches!(
            second,
            Outcome::Skipped(SkipReason::AlreadyCredited)
        ));
        assert_eq!(h.points.balance_of(buyer()), Some(75));
        assert_eq!(h.points.credit_count(), 1);

        // Only the first delivery notifies
        drain_spawned_tasks().await;
        assert_eq!(h.notifications.sent_count(), 1);
    }

    #[tokio::test]
    async fn unknown_package_is_a_recorded_failure() {
        let h = harness();

        let outcome = h
            .applier
            .apply_from_checkout(&package_session("mega", Some("pi_1")))
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(ProcessingError::UnknownPackage(name)) if name == "mega"
        ));
        assert_eq!(h.points.credit_count(), 0);
    }

    #[tokio::test]
    async fn unpaid_session_is_skipped() {
        let h = harness();
        let mut session = package_session("plus", Some("pi_1"));
        session.payment_status = "unpaid".to_string();

        let outcome = h.applier.apply_from_checkout(&session).await;

        assert!(matches!(
            outcome,
            Outcome::Skipped(SkipReason::UnpaidSession(_))
        ));
        assert_eq!(h.points.credit_count(), 0);
    }

    #[tokio::test]
    async fn missing_payment_intent_fails() {
        let h = harness();

        let outcome = h
            .applier
            .apply_from_checkout(&package_session("plus", None))
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(ProcessingError::MalformedObject(_))
        ));
    }

    #[tokio::test]
    async fn missing_package_name_fails() {
        let h = harness();
        let mut session = package_session("plus", Some("pi_1"));
        session.metadata.remove("packageName");

        let outcome = h.applier.apply_from_checkout(&session).await;

        assert!(matches!(
            outcome,
            Outcome::Failed(ProcessingError::MissingMetadata("packageName"))
        ));
    }

    #[tokio::test]
    async fn transient_write_failure_is_retried() {
        let h = harness();
        h.points.fail_next_credit(DomainError::new(
            ErrorCode::DatabaseError,
            "deadlock detected",
        ));

        let outcome = h
            .applier
            .apply_from_checkout(&package_session("starter", Some("pi_1")))
            .await;

        assert!(outcome.is_applied());
        assert_eq!(h.points.balance_of(buyer()), Some(10));
    }

    #[tokio::test]
    async fn notification_failure_keeps_the_credit() {
        let h = harness();
        h.notifications.fail_next_send(DomainError::new(
            ErrorCode::NotificationError,
            "relay unavailable",
        ));

        let outcome = h
            .applier
            .apply_from_checkout(&package_session("plus", Some("pi_1")))
            .await;
        drain_spawned_tasks().await;

        assert!(outcome.is_applied());
        assert_eq!(h.points.balance_of(buyer()), Some(30));
    }
}
