//! Padharo commerce backend - payment webhooks, subscriptions, promotions.
//!
//! This crate receives Stripe webhook deliveries and reconciles them into
//! the marketplace's subscription records, promoted-listing placements,
//! and reward point balances, with an idempotency ledger guarding against
//! duplicate deliveries.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
