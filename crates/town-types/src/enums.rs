//! Enumeration types shared across the town.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The closed set of building kinds a town can contain.
///
/// The lowercase name doubles as the word an agent uses in a plan
/// ("go to cafe"), so [`BuildingType::as_str`] is part of the action
/// vocabulary and must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum BuildingType {
    /// A private home. The only place where resting has an effect.
    House,
    /// A cafe.
    Cafe,
    /// An open park.
    Park,
    /// A shop.
    Shop,
    /// An office building.
    Office,
}

impl BuildingType {
    /// Every building type, in the order plan text is scanned for them.
    pub const ALL: [Self; 5] = [Self::House, Self::Cafe, Self::Park, Self::Shop, Self::Office];

    /// Lowercase name of the building type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::House => "house",
            Self::Cafe => "cafe",
            Self::Park => "park",
            Self::Shop => "shop",
            Self::Office => "office",
        }
    }

    /// Human-readable description shown to observers.
    pub const fn description(self) -> &'static str {
        match self {
            Self::House => "A cozy house with a small garden",
            Self::Cafe => "A bustling cafe with the aroma of fresh coffee",
            Self::Park => "A peaceful park with trees and benches",
            Self::Shop => "A local shop selling various goods",
            Self::Office => "A modern office building",
        }
    }
}

impl core::fmt::Display for BuildingType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
