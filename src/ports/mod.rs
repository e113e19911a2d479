//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `ProcessedEventStore` - Webhook idempotency ledger
//! - `SubscriptionStore` - Subscription rows keyed by entity scope
//! - `PromotionStore` - Promotion placement rows
//! - `PointsStore` - Point balances and credit dedup
//! - `CatalogStore` - Mirrored flags on catalog rows
//!
//! ## Outbound Ports
//!
//! - `PaymentProvider` - Upstream billing API (subscription re-fetch)
//! - `NotificationDispatcher` - Fire-and-forget user notifications

mod catalog_store;
mod notification_dispatcher;
mod payment_provider;
mod points_store;
mod processed_event_store;
mod promotion_store;
mod subscription_store;

pub use catalog_store::CatalogStore;
pub use notification_dispatcher::NotificationDispatcher;
pub use payment_provider::{PaymentProvider, ProviderApiError, ProviderErrorCode};
pub use points_store::PointsStore;
pub use processed_event_store::ProcessedEventStore;
pub use promotion_store::PromotionStore;
pub use subscription_store::SubscriptionStore;
