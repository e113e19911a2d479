//! Point package catalog.

use serde::{Deserialize, Serialize};

/// A purchasable bundle of promotion points.
///
/// The package name travels in checkout metadata as `packageName`; an
/// unrecognized name fails the event rather than guessing an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointsPackage {
    Starter,
    Plus,
    Max,
}

impl PointsPackage {
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "starter" => Some(PointsPackage::Starter),
            "plus" => Some(PointsPackage::Plus),
            "max" => Some(PointsPackage::Max),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PointsPackage::Starter => "starter",
            PointsPackage::Plus => "plus",
            PointsPackage::Max => "max",
        }
    }

    /// Points credited when the package is purchased.
    pub fn points(&self) -> i64 {
        match self {
            PointsPackage::Starter => 10,
            PointsPackage::Plus => 30,
            PointsPackage::Max => 75,
        }
    }
}

impl std::fmt::Display for PointsPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
