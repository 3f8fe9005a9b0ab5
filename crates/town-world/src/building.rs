//! Buildings: fixed rectangles on the grid that track who is inside.

use town_types::{AgentId, BuildingType, BuildingView, Position, Size};

/// A building registered at town creation.
///
/// Its rectangle is half-open on the max edge: a cell belongs to the
/// building when `origin <= cell < origin + size` on both axes.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Building {
    /// Stable identifier, unique within the town.
    pub id: String,
    /// Kind of building.
    pub kind: BuildingType,
    /// Top-left corner.
    pub origin: Position,
    /// Footprint.
    pub size: Size,
    /// Agents currently inside, in arrival order.
    occupants: Vec<AgentId>,
}

impl Building {
    /// Create an empty building.
    pub fn new(id: impl Into<String>, kind: BuildingType, origin: Position, size: Size) -> Self {
        Self {
            id: id.into(),
            kind,
            origin,
            size,
            occupants: Vec::new(),
        }
    }

    /// Whether the cell lies inside this building.
    pub const fn contains(&self, position: Position) -> bool {
        position.x >= self.origin.x
            && position.y >= self.origin.y
            && position.x < self.origin.x.saturating_add(self.size.width)
            && position.y < self.origin.y.saturating_add(self.size.height)
    }

    /// Every cell covered by the building, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        let (x0, y0) = (self.origin.x, self.origin.y);
        let x1 = x0.saturating_add(self.size.width);
        let y1 = y0.saturating_add(self.size.height);
        (y0..y1).flat_map(move |y| (x0..x1).map(move |x| Position::new(x, y)))
    }

    /// Straight-line distance from a cell to the building's corner.
    pub fn distance_from(&self, position: Position) -> f64 {
        position.distance_to(self.origin)
    }

    /// Fixed human-readable description.
    pub const fn description(&self) -> &'static str {
        self.kind.description()
    }

    /// Agents currently inside.
    pub fn occupants(&self) -> &[AgentId] {
        &self.occupants
    }

    pub(crate) fn enter(&mut self, agent: AgentId) {
        if !self.occupants.contains(&agent) {
            self.occupants.push(agent);
        }
    }

    pub(crate) fn leave(&mut self, agent: AgentId) {
        self.occupants.retain(|id| *id != agent);
    }

    /// Deep-copied view for observers.
    pub fn view(&self) -> BuildingView {
        BuildingView {
            id: self.id.clone(),
            building_type: self.kind,
            position: self.origin,
            size: self.size,
            description: self.description().to_owned(),
            occupants: self.occupants.clone(),
        }
    }
}
