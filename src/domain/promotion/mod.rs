//! Promotion domain: promoted-listing placements and their lifecycle.

pub mod listing;
pub mod status;

pub use listing::{PromotedEntity, PromotionListing};
pub use status::PromotionStatus;
