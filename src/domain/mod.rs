//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `webhook` - Provider event envelope, signature verification, idempotency records
//! - `subscription` - Reconciled subscription records and the provider status mapping
//! - `promotion` - Promoted-listing placements and their lifecycle
//! - `points` - Promotion point packages, accounts, and credit records

pub mod foundation;
pub mod points;
pub mod promotion;
pub mod subscription;
pub mod webhook;
