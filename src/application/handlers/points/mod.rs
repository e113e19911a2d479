pub mod credit_applier;

pub use credit_applier::PointsCreditApplier;
