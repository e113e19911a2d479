//! Points domain: a la carte promotion credits purchased in packages.

pub mod account;
pub mod credit;
pub mod package;

pub use account::PointsAccount;
pub use credit::{CreditResult, PointCredit};
pub use package::PointsPackage;
