//! Subscription domain: records reconciled from the payment provider and
//! the status mapping every webhook handler shares.

pub mod plan;
pub mod record;
pub mod scope;
pub mod status;

pub use plan::PlanCadence;
pub use record::SubscriptionRecord;
pub use scope::SubscriptionScope;
pub use status::{is_activatable_provider_status, ProviderStatusMapping, SubscriptionStatus};
