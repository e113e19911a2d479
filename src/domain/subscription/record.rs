//! Subscription record aggregate.
//!
//! One row per scope: a user's membership, a restaurant's premium listing
//! within a destination, or a tour operator's premium account. The record
//! mirrors whatever the payment provider last told us.
//!
//! # Design Decisions
//!
//! - **One per scope**: Unique constraint on the scope's natural key
//! - **Provider is authoritative**: reconciliation overwrites local status
//!   so stale rows converge instead of wedging
//! - **Period start preserved**: only activation sets it; reconciliation
//!   never touches it

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp};

use super::{PlanCadence, SubscriptionScope, SubscriptionStatus};

/// A reconciled subscription.
///
/// # Invariants
///
/// - `id` is globally unique
/// - `scope` is unique (one record per user / restaurant / operator)
/// - `stripe_subscription_id` is cleared when the record is cancelled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Unique identifier for this record.
    pub id: SubscriptionId,

    /// Who or what this subscription belongs to.
    pub scope: SubscriptionScope,

    /// Current status in the lifecycle.
    pub status: SubscriptionStatus,

    /// Billing cadence, used for fallback period math.
    pub cadence: PlanCadence,

    /// Provider subscription id while the subscription is live.
    pub stripe_subscription_id: Option<String>,

    /// Provider customer id.
    pub stripe_customer_id: Option<String>,

    /// Provider price id of the purchased plan.
    pub stripe_price_id: Option<String>,

    /// Start of the current billing period. Set at activation, preserved
    /// by reconciliation.
    pub current_period_start: Option<Timestamp>,

    /// End of the current billing period, taken verbatim from the provider
    /// whenever it supplies one.
    pub current_period_end: Option<Timestamp>,

    /// When the subscription was cancelled (if cancelled).
    pub cancelled_at: Option<Timestamp>,

    /// When the record was created.
    pub created_at: Timestamp,

    /// When the record was last updated.
    pub updated_at: Timestamp,
}

impl SubscriptionRecord {
    /// Creates a record awaiting its first confirmed payment.
    ///
    /// Checkout session creation (outside this engine) writes these rows;
    /// the webhook pipeline activates them.
    pub fn new_pending(scope: SubscriptionScope, cadence: PlanCadence) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            scope,
            status: SubscriptionStatus::Pending,
            cadence,
            stripe_subscription_id: None,
            stripe_customer_id: None,
            stripe_price_id: None,
            current_period_start: None,
            current_period_end: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates an already-active record.
    ///
    /// Used when a verified checkout completes and no local row exists,
    /// which happens when checkout ran before this engine was deployed or
    /// the pending insert was lost.
    pub fn new_active(
        scope: SubscriptionScope,
        cadence: PlanCadence,
        stripe_subscription_id: String,
        stripe_customer_id: Option<String>,
        stripe_price_id: Option<String>,
        period_start: Timestamp,
        period_end: Timestamp,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            scope,
            status: SubscriptionStatus::Active,
            cadence,
            stripe_subscription_id: Some(stripe_subscription_id),
            stripe_customer_id,
            stripe_price_id,
            current_period_start: Some(period_start),
            current_period_end: Some(period_end),
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if this record currently grants premium benefits.
    ///
    /// A scheduled cancellation keeps benefits until the paid period ends.
    pub fn grants_benefits(&self) -> bool {
        if !self.status.grants_benefits() {
            return false;
        }

        if self.status == SubscriptionStatus::PendingCancellation {
            if let Some(end) = self.current_period_end {
                return Timestamp::now() <= end;
            }
        }

        true
    }

    /// Activates this record after a verified checkout.
    ///
    /// Links the provider ids, starts the billing period, and clears any
    /// earlier cancellation. Local command, so the state machine applies.
    ///
    /// # Errors
    ///
    /// Returns error if transition from current status is not allowed.
    pub fn activate(
        &mut self,
        cadence: PlanCadence,
        stripe_subscription_id: String,
        stripe_customer_id: Option<String>,
        stripe_price_id: Option<String>,
        period_start: Timestamp,
        period_end: Timestamp,
    ) -> Result<(), DomainError> {
        self.transition_to(SubscriptionStatus::Active)?;
        self.cadence = cadence;
        self.stripe_subscription_id = Some(stripe_subscription_id);
        if stripe_customer_id.is_some() {
            self.stripe_customer_id = stripe_customer_id;
        }
        if stripe_price_id.is_some() {
            self.stripe_price_id = stripe_price_id;
        }
        self.current_period_start = Some(period_start);
        self.current_period_end = Some(period_end);
        self.cancelled_at = None;
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Overwrites local state with what the provider reported.
    ///
    /// Deliberately bypasses the state machine: the provider already made
    /// the transition, and refusing to mirror it would leave the row stale
    /// forever. `current_period_start` is preserved.
    pub fn apply_provider_state(
        &mut self,
        new_status: SubscriptionStatus,
        period_end: Timestamp,
    ) {
        self.status = new_status;
        self.current_period_end = Some(period_end);

        if new_status == SubscriptionStatus::Cancelled {
            self.stripe_subscription_id = None;
            if self.cancelled_at.is_none() {
                self.cancelled_at = Some(Timestamp::now());
            }
        }

        self.updated_at = Timestamp::now();
    }

    /// Transition to a new status using the state machine.
    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        use crate::domain::foundation::StateMachine;

        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {:?} to {:?}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
