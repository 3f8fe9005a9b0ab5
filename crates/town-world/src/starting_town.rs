//! The default town layout and the builder that turns a layout into a map.

use town_types::{BuildingType, Position, Size};
use tracing::info;

use crate::building::Building;
use crate::error::WorldError;
use crate::grid::TownMap;

/// Default grid width.
pub const DEFAULT_WIDTH: i32 = 50;

/// Default grid height.
pub const DEFAULT_HEIGHT: i32 = 50;

/// A building as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BuildingSpec {
    /// Unique id.
    pub id: String,
    /// Building kind.
    #[serde(rename = "type")]
    pub kind: BuildingType,
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in cells.
    pub width: i32,
    /// Height in cells.
    pub height: i32,
}

impl BuildingSpec {
    fn new(id: &str, kind: BuildingType, x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            id: id.to_owned(),
            kind,
            x,
            y,
            width,
            height,
        }
    }

    /// Turn the spec into an empty building.
    pub fn build(&self) -> Building {
        Building::new(
            self.id.clone(),
            self.kind,
            Position::new(self.x, self.y),
            Size::new(self.width, self.height),
        )
    }
}

/// The six buildings of the starting town, in registration order.
pub fn default_layout() -> Vec<BuildingSpec> {
    vec![
        BuildingSpec::new("house1", BuildingType::House, 5, 5, 3, 3),
        BuildingSpec::new("house2", BuildingType::House, 15, 8, 3, 3),
        BuildingSpec::new("cafe1", BuildingType::Cafe, 10, 15, 4, 3),
        BuildingSpec::new("park1", BuildingType::Park, 20, 20, 5, 5),
        BuildingSpec::new("shop1", BuildingType::Shop, 8, 25, 3, 3),
        BuildingSpec::new("office1", BuildingType::Office, 25, 10, 4, 4),
    ]
}

/// Build a grid and register every building of `layout` in order.
///
/// # Errors
///
/// Propagates any [`WorldError`] from grid creation or registration.
pub fn build_town(width: i32, height: i32, layout: &[BuildingSpec]) -> Result<TownMap, WorldError> {
    let mut map = TownMap::new(width, height)?;
    for spec in layout {
        map.add_building(spec.build())?;
    }
    info!(width, height, buildings = layout.len(), "Town map built");
    Ok(map)
}

/// The default 50x50 town.
///
/// # Errors
///
/// Only fails if the built-in layout is inconsistent.
pub fn create_starting_town() -> Result<TownMap, WorldError> {
    build_town(DEFAULT_WIDTH, DEFAULT_HEIGHT, &default_layout())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn starting_town_has_every_kind() {
        let map = create_starting_town().unwrap();
        assert_eq!(map.buildings().len(), 6);
        for kind in BuildingType::ALL {
            assert!(map.buildings().iter().any(|b| b.kind == kind), "missing {kind}");
        }
        let cafe = map.building("cafe1").unwrap();
        assert_eq!(cafe.origin, Position::new(10, 15));
        assert_eq!(cafe.size, Size::new(4, 3));
    }

    #[test]
    fn layout_parses_from_json() {
        let spec: BuildingSpec = serde_json::from_str(
            r#"{"id":"cafe9","type":"cafe","x":1,"y":2,"width":3,"height":4}"#,
        )
        .unwrap();
        assert_eq!(spec.kind, BuildingType::Cafe);
        assert_eq!(spec.build().size, Size::new(3, 4));
    }

    #[test]
    fn small_grid_rejects_default_layout() {
        assert!(build_town(10, 10, &default_layout()).is_err());
    }
}
