//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `http` - Axum routers for webhook ingestion and health probes
//! - `postgres` - PostgreSQL-backed persistence stores
//! - `stripe` - Stripe REST API client
//! - `notifications` - Notification relay HTTP client
//! - `memory` - In-memory implementations for tests

pub mod http;
pub mod memory;
pub mod notifications;
pub mod postgres;
pub mod stripe;
