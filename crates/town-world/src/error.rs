//! Error types for the `town-world` crate.

use town_types::{AgentId, Position};

/// Errors raised while laying out the town or placing agents.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The grid would have no cells.
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: i32,
        /// Requested height.
        height: i32,
    },

    /// A building id was registered twice.
    #[error("duplicate building id: {0}")]
    DuplicateBuilding(String),

    /// A building has a non-positive size or sticks out of the grid.
    #[error("building {id} does not fit inside the grid")]
    BuildingOutOfBounds {
        /// The offending building.
        id: String,
    },

    /// A position lies outside the grid.
    #[error("position {0} is outside the grid")]
    OutOfBounds(Position),

    /// Another agent already stands on the cell.
    #[error("position {position} is occupied by agent {occupant}")]
    Occupied {
        /// The contested cell.
        position: Position,
        /// The agent standing there.
        occupant: AgentId,
    },
}
