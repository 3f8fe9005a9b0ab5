//! Shared type definitions for the AI Town simulation.
//!
//! Every crate in the workspace speaks these types. They are exported to
//! `TypeScript` via `ts-rs` for browser clients.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for agent identities
//! - [`enums`] -- Building kinds
//! - [`structs`] -- Positions, conversations, and memories
//! - [`snapshot`] -- Serializable world and agent views

pub mod enums;
pub mod ids;
pub mod snapshot;
pub mod structs;

pub use enums::BuildingType;
pub use ids::AgentId;
pub use snapshot::{AgentDetail, AgentView, BuildingView, RelationshipView, WorldState};
pub use structs::{Conversation, MemoryEntry, Position, Size};
