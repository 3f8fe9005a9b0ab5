//! Spatial model for the AI Town simulation.
//!
//! # Modules
//!
//! - [`building`] -- Rectangular buildings with occupant tracking
//! - [`grid`] -- [`TownMap`]: bounds, spatial queries, and conflict-free moves
//! - [`starting_town`] -- Default layout and layout-to-map builder
//! - [`error`] -- [`WorldError`]

pub mod building;
pub mod error;
pub mod grid;
pub mod starting_town;

pub use building::Building;
pub use error::WorldError;
pub use grid::{STEP_LENGTH, TownMap};
pub use starting_town::{BuildingSpec, build_town, create_starting_town, default_layout};
