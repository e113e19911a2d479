//! In-memory adapters for testing and local development.
//!
//! Each store keeps its rows behind a lock and mirrors the semantics of
//! its Postgres counterpart (upsert keys, uniqueness guarantees, row
//! counts). The payment provider and notification dispatcher are
//! configurable mocks with error injection and call tracking.
//!
//! None of these adapters should be wired into a production binary.

mod catalog_store;
mod event_store;
mod notifications;
mod payment_provider;
mod points_store;
mod promotion_store;
mod subscription_store;

pub use catalog_store::InMemoryCatalogStore;
pub use event_store::InMemoryProcessedEventStore;
pub use notifications::{RecordingNotificationDispatcher, SentNotification};
pub use payment_provider::MockPaymentProvider;
pub use points_store::InMemoryPointsStore;
pub use promotion_store::InMemoryPromotionStore;
pub use subscription_store::InMemorySubscriptionStore;
