//! PostgreSQL adapters - Database implementations for the persistence ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresProcessedEventStore` - Webhook idempotency ledger
//! - `PostgresSubscriptionStore` - Subscription rows keyed by scope
//! - `PostgresPromotionStore` - Promotion placement rows
//! - `PostgresPointsStore` - Transactional point credits
//! - `PostgresCatalogStore` - Catalog verification reads and flag mirrors

mod catalog_store;
mod event_store;
mod points_store;
mod promotion_store;
mod subscription_store;

pub use catalog_store::PostgresCatalogStore;
pub use event_store::PostgresProcessedEventStore;
pub use points_store::PostgresPointsStore;
pub use promotion_store::PostgresPromotionStore;
pub use subscription_store::PostgresSubscriptionStore;
