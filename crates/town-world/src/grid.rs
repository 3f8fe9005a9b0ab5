//! The town grid: bounds, buildings, and agent positions.
//!
//! [`TownMap`] is the single authority on where agents stand. It answers
//! spatial queries and mediates every position change so that no two
//! agents ever share a cell. The map itself holds no lock; callers share it
//! behind one and get atomic check-then-set for free because
//! [`TownMap::attempt_move`] takes `&mut self`.

use std::collections::BTreeMap;

use town_types::{AgentId, BuildingType, Position};
use tracing::debug;

use crate::building::Building;
use crate::error::WorldError;

/// Furthest an agent travels in one move.
pub const STEP_LENGTH: i32 = 1;

/// Grid dimensions, buildings, and live agent positions.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TownMap {
    width: i32,
    height: i32,
    /// Registration order is query order.
    buildings: Vec<Building>,
    positions: BTreeMap<AgentId, Position>,
}

impl TownMap {
    /// Create an empty grid.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] unless both sides are
    /// positive.
    pub fn new(width: i32, height: i32) -> Result<Self, WorldError> {
        if width <= 0 || height <= 0 {
            return Err(WorldError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            buildings: Vec::new(),
            positions: BTreeMap::new(),
        })
    }

    /// Grid width in cells.
    pub const fn width(&self) -> i32 {
        self.width
    }

    /// Grid height in cells.
    pub const fn height(&self) -> i32 {
        self.height
    }

    // -------------------------------------------------------------------
    // Buildings
    // -------------------------------------------------------------------

    /// Register a building.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::DuplicateBuilding`] for a reused id and
    /// [`WorldError::BuildingOutOfBounds`] when the rectangle is empty or
    /// leaves the grid.
    pub fn add_building(&mut self, building: Building) -> Result<(), WorldError> {
        if self.buildings.iter().any(|b| b.id == building.id) {
            return Err(WorldError::DuplicateBuilding(building.id));
        }
        let far_corner = Position::new(
            building.origin.x.saturating_add(building.size.width).saturating_sub(1),
            building.origin.y.saturating_add(building.size.height).saturating_sub(1),
        );
        if building.size.width <= 0
            || building.size.height <= 0
            || !self.is_valid_position(building.origin)
            || !self.is_valid_position(far_corner)
        {
            return Err(WorldError::BuildingOutOfBounds { id: building.id });
        }
        self.buildings.push(building);
        Ok(())
    }

    /// All buildings in registration order.
    pub fn buildings(&self) -> &[Building] {
        &self.buildings
    }

    /// Look up a building by id.
    pub fn building(&self, id: &str) -> Option<&Building> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// The first registered building containing `position`.
    pub fn building_at(&self, position: Position) -> Option<&Building> {
        self.buildings.iter().find(|b| b.contains(position))
    }

    /// The building of `kind` closest to `from`, measured to its corner.
    ///
    /// Ties go to the building registered first.
    pub fn nearest_building(&self, from: Position, kind: BuildingType) -> Option<&Building> {
        self.buildings
            .iter()
            .filter(|b| b.kind == kind)
            .fold(None, |best: Option<&Building>, candidate| match best {
                Some(current) if current.distance_from(from) <= candidate.distance_from(from) => {
                    Some(current)
                }
                _ => Some(candidate),
            })
    }

    /// Cells of a building that nobody stands on.
    pub fn free_cells(&self, building: &Building) -> Vec<Position> {
        building
            .cells()
            .filter(|cell| self.occupant_of(*cell).is_none())
            .collect()
    }

    // -------------------------------------------------------------------
    // Agents
    // -------------------------------------------------------------------

    /// Whether the cell is inside `[0, width) x [0, height)`.
    pub const fn is_valid_position(&self, position: Position) -> bool {
        position.x >= 0 && position.y >= 0 && position.x < self.width && position.y < self.height
    }

    /// Where an agent stands.
    pub fn position_of(&self, agent: AgentId) -> Option<Position> {
        self.positions.get(&agent).copied()
    }

    /// The agent standing on a cell, if any.
    pub fn occupant_of(&self, position: Position) -> Option<AgentId> {
        self.positions
            .iter()
            .find(|(_, p)| **p == position)
            .map(|(id, _)| *id)
    }

    /// Agents within `radius` of `position`, the caller included.
    pub fn nearby_agents(&self, position: Position, radius: f64) -> Vec<AgentId> {
        self.positions
            .iter()
            .filter(|(_, p)| position.distance_to(**p) <= radius)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Put an agent on the grid for the first time.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] or [`WorldError::Occupied`] when
    /// the cell cannot take the agent.
    pub fn place_agent(&mut self, agent: AgentId, position: Position) -> Result<(), WorldError> {
        if !self.is_valid_position(position) {
            return Err(WorldError::OutOfBounds(position));
        }
        if let Some(occupant) = self.occupant_of(position).filter(|id| *id != agent) {
            return Err(WorldError::Occupied { position, occupant });
        }
        self.relocate(agent, position);
        Ok(())
    }

    /// Take one step toward `target`.
    ///
    /// The agent moves only when the next cell is inside the grid and free
    /// of other agents. Returns whether the agent now stands on that cell.
    /// Unknown agents never move.
    pub fn attempt_move(&mut self, agent: AgentId, target: Position) -> bool {
        let Some(current) = self.position_of(agent) else {
            return false;
        };
        let next = current.step_toward(target, STEP_LENGTH);
        if next == current {
            return false;
        }

        if !self.is_valid_position(next) {
            debug!(%agent, %next, "move rejected: out of bounds");
            return false;
        }
        if let Some(occupant) = self.occupant_of(next).filter(|id| *id != agent) {
            debug!(%agent, %next, %occupant, "move rejected: cell occupied");
            return false;
        }

        self.relocate(agent, next);
        true
    }

    /// Set a position and keep building occupant lists in step with it.
    fn relocate(&mut self, agent: AgentId, to: Position) {
        let from = self.positions.insert(agent, to);

        let old_index = from.and_then(|p| self.building_index_at(p));
        let new_index = self.building_index_at(to);
        if old_index == new_index && from.is_some() {
            return;
        }
        if let Some(building) = old_index.and_then(|i| self.buildings.get_mut(i)) {
            building.leave(agent);
        }
        if let Some(building) = new_index.and_then(|i| self.buildings.get_mut(i)) {
            building.enter(agent);
        }
    }

    fn building_index_at(&self, position: Position) -> Option<usize> {
        self.buildings.iter().position(|b| b.contains(position))
    }
}
