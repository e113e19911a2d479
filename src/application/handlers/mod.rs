//! Application handlers for the webhook processing pipeline.
//!
//! The webhook processor verifies and deduplicates deliveries, the router
//! resolves each event into a closed command, and the per-family handlers
//! (subscription reconciler, promotion ledger, points credit applier) apply
//! the command and report an explicit [`Outcome`].
//!
//! [`Outcome`]: crate::domain::webhook::Outcome

pub mod points;
pub mod promotion;
pub mod subscription;
pub mod webhook;

pub(crate) mod metadata;

use std::future::Future;

use crate::domain::foundation::DomainError;

pub use points::PointsCreditApplier;
pub use promotion::PromotionLedger;
pub use subscription::SubscriptionReconciler;
pub use webhook::{
    Acknowledgement, EventRouter, ProcessWebhookCommand, RoutedCommand, WebhookProcessor,
};

/// Runs a store write, retrying once on failure.
///
/// Entity writes are absolute-value updates keyed by natural keys, so an
/// immediate retry is safe. A second failure propagates and the event is
/// recorded as failed for the provider's redelivery to re-run.
pub(crate) async fn retry_once<T, F, Fut>(write: &'static str, mut op: F) -> Result<T, DomainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    match op().await {
        Ok(value) => Ok(value),
        Err(first) => {
            tracing::warn!(write, error = %first, "store write failed, retrying once");
            op().await
        }
    }
}
