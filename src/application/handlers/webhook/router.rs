//! Event routing: maps a verified provider event onto a handler command.
//!
//! Routing is a pure function of (event type, entity family) plus the
//! per-family capability flags. Anything outside the closed set is an
//! `Unhandled` command, which the processor records and acknowledges so
//! the provider stops redelivering events we will never act on.

use crate::config::FeaturesConfig;
use crate::domain::webhook::{
    CheckoutSession, EntityKind, EntityRefs, EventKind, Invoice, ProcessingError, ProviderEvent,
    ProviderSubscription,
};

/// A routed event, ready for its handler.
#[derive(Debug)]
pub enum RoutedCommand {
    /// Paid checkout for one of the subscription families.
    ActivateSubscription {
        kind: EntityKind,
        session: CheckoutSession,
    },
    /// Paid checkout for a standalone promoted-listing upgrade.
    ActivatePromotion { session: CheckoutSession },
    /// Paid one-time checkout for a points package.
    CreditPoints { session: CheckoutSession },
    /// Lifecycle update for a subscription family.
    ReconcileSubscription {
        kind: EntityKind,
        subscription: ProviderSubscription,
    },
    /// Lifecycle update for a promotion-funding subscription.
    ReconcilePromotion { subscription: ProviderSubscription },
    /// Upstream deletion of a subscription family record.
    FinalizeDeletion {
        kind: EntityKind,
        subscription: ProviderSubscription,
    },
    /// Upstream deletion of a promotion-funding subscription.
    CancelPromotion { subscription: ProviderSubscription },
    /// Failed payment attempt; the backing subscription gets re-checked.
    ReconcileFailedInvoice { invoice: Invoice },
    /// Recorded and acknowledged without side effects.
    Unhandled {
        event_type: String,
        entity_kind: Option<String>,
    },
}

impl RoutedCommand {
    /// Best-effort audit references for the event-store row.
    pub fn entity_refs(&self) -> EntityRefs {
        match self {
            Self::ActivateSubscription { session, .. }
            | Self::ActivatePromotion { session }
            | Self::CreditPoints { session } => session_refs(session),
            Self::ReconcileSubscription { subscription, .. }
            | Self::ReconcilePromotion { subscription }
            | Self::FinalizeDeletion { subscription, .. }
            | Self::CancelPromotion { subscription } => subscription_refs(subscription),
            Self::ReconcileFailedInvoice { invoice } => {
                let mut refs = EntityRefs::default();
                if let Some(subscription_id) = &invoice.subscription {
                    refs = refs.with_subscription(subscription_id);
                }
                refs
            }
            Self::Unhandled { .. } => EntityRefs::default(),
        }
    }
}

fn session_refs(session: &CheckoutSession) -> EntityRefs {
    let mut refs = EntityRefs::default();
    if let Some(subscription_id) = &session.subscription {
        refs = refs.with_subscription(subscription_id);
    }
    if let Some(entity_id) = metadata_entity_id(&session.metadata) {
        refs = refs.with_entity(entity_id);
    }
    if let Some(user_id) = session.metadata.get("userId") {
        refs = refs.with_user(user_id);
    }
    refs
}

fn subscription_refs(subscription: &ProviderSubscription) -> EntityRefs {
    let mut refs = EntityRefs::default().with_subscription(&subscription.id);
    if let Some(entity_id) = metadata_entity_id(&subscription.metadata) {
        refs = refs.with_entity(entity_id);
    }
    if let Some(user_id) = subscription.metadata.get("userId") {
        refs = refs.with_user(user_id);
    }
    refs
}

fn metadata_entity_id(
    metadata: &std::collections::HashMap<String, String>,
) -> Option<String> {
    if let Some(id) = metadata.get("restaurantId") {
        return Some(format!("restaurant:{}", id));
    }
    if let Some(id) = metadata.get("tourId") {
        return Some(format!("tour:{}", id));
    }
    metadata
        .get("operatorId")
        .map(|id| format!("operator:{}", id))
}

/// Routes verified events to commands.
pub struct EventRouter {
    features: FeaturesConfig,
}

impl EventRouter {
    pub fn new(features: FeaturesConfig) -> Self {
        Self { features }
    }

    /// Decide what, if anything, to do with a verified event.
    ///
    /// # Errors
    ///
    /// Returns `MalformedObject` when the payload does not decode as the
    /// shape its event type promises. Unknown event types and unknown
    /// entity families are not errors; they route to `Unhandled`.
    pub fn route(&self, event: &ProviderEvent) -> Result<RoutedCommand, ProcessingError> {
        match event.kind() {
            EventKind::CheckoutSessionCompleted => {
                let session: CheckoutSession = decode(event)?;
                Ok(self.route_checkout(event, session))
            }
            EventKind::SubscriptionUpdated => {
                let subscription: ProviderSubscription = decode(event)?;
                Ok(self.route_subscription_update(event, subscription))
            }
            EventKind::SubscriptionDeleted => {
                let subscription: ProviderSubscription = decode(event)?;
                Ok(self.route_subscription_deletion(event, subscription))
            }
            EventKind::InvoicePaymentFailed => {
                let invoice: Invoice = decode(event)?;
                Ok(RoutedCommand::ReconcileFailedInvoice { invoice })
            }
            EventKind::Unknown => Ok(self.unhandled(event, None)),
        }
    }

    fn route_checkout(&self, event: &ProviderEvent, session: CheckoutSession) -> RoutedCommand {
        match session.entity_kind() {
            Some(kind) if !self.family_enabled(kind) => self.disabled(event, kind),
            Some(EntityKind::PromotionUpgrade) => RoutedCommand::ActivatePromotion { session },
            Some(EntityKind::PointsPackage) => RoutedCommand::CreditPoints { session },
            Some(kind) => RoutedCommand::ActivateSubscription { kind, session },
            None => self.unhandled(event, session.metadata.get("type").cloned()),
        }
    }

    fn route_subscription_update(
        &self,
        event: &ProviderEvent,
        subscription: ProviderSubscription,
    ) -> RoutedCommand {
        match subscription.entity_kind() {
            Some(kind) if !self.family_enabled(kind) => self.disabled(event, kind),
            Some(EntityKind::PromotionUpgrade) => RoutedCommand::ReconcilePromotion { subscription },
            Some(EntityKind::PointsPackage) | None => {
                self.unhandled(event, subscription.metadata.get("type").cloned())
            }
            Some(kind) => RoutedCommand::ReconcileSubscription { kind, subscription },
        }
    }

    fn route_subscription_deletion(
        &self,
        event: &ProviderEvent,
        subscription: ProviderSubscription,
    ) -> RoutedCommand {
        match subscription.entity_kind() {
            Some(kind) if !self.family_enabled(kind) => self.disabled(event, kind),
            Some(EntityKind::PromotionUpgrade) => RoutedCommand::CancelPromotion { subscription },
            Some(EntityKind::PointsPackage) | None => {
                self.unhandled(event, subscription.metadata.get("type").cloned())
            }
            Some(kind) => RoutedCommand::FinalizeDeletion { kind, subscription },
        }
    }

    fn family_enabled(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::UserSubscription => self.features.user_subscriptions,
            EntityKind::RestaurantPremium => self.features.restaurant_premium,
            EntityKind::TourOperatorPremium => self.features.tour_operator_premium,
            EntityKind::PromotionUpgrade => self.features.promotion_upgrades,
            EntityKind::PointsPackage => self.features.points_packages,
        }
    }

    fn disabled(&self, event: &ProviderEvent, kind: EntityKind) -> RoutedCommand {
        tracing::info!(
            event_id = %event.id,
            entity_kind = kind.as_str(),
            "entity family disabled, acknowledging without processing"
        );
        RoutedCommand::Unhandled {
            event_type: event.event_type.clone(),
            entity_kind: Some(kind.as_str().to_string()),
        }
    }

    fn unhandled(&self, event: &ProviderEvent, entity_kind: Option<String>) -> RoutedCommand {
        RoutedCommand::Unhandled {
            event_type: event.event_type.clone(),
            entity_kind,
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(event: &ProviderEvent) -> Result<T, ProcessingError> {
    event.deserialize_object().map_err(|error| {
        ProcessingError::MalformedObject(format!(
            "event {} object does not match {}: {}",
            event.id, event.event_type, error
        ))
    })
}
