//! Serializable point-in-time views of the town.
//!
//! Snapshots are deep copies built while the simulation lock is held, so a
//! reader never sees an agent halfway through an update. They are what the
//! transport layer forwards to browsers.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::BuildingType;
use crate::ids::AgentId;
use crate::structs::{Conversation, MemoryEntry, Position, Size};

/// A building as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BuildingView {
    /// Configured building id (e.g. `cafe1`).
    pub id: String,
    /// Kind of building.
    #[serde(rename = "type")]
    pub building_type: BuildingType,
    /// Top-left corner.
    pub position: Position,
    /// Footprint.
    pub size: Size,
    /// Fixed description derived from the type.
    pub description: String,
    /// Agents currently inside.
    pub occupants: Vec<AgentId>,
}

/// Public summary of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentView {
    /// Agent identity.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Current cell.
    pub position: Position,
    /// Free-text mood.
    pub mood: String,
    /// Label of what the agent is doing.
    pub current_action: String,
}

/// The complete world state pushed to observers after every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct WorldState {
    /// Grid width in cells.
    pub width: i32,
    /// Grid height in cells.
    pub height: i32,
    /// Number of completed ticks.
    pub tick: u64,
    /// Simulated time of the last completed tick.
    pub time: DateTime<Utc>,
    /// Whether the tick loop is running.
    pub running: bool,
    /// All buildings in registration order.
    pub buildings: Vec<BuildingView>,
    /// All agents in the order they joined.
    pub agents: Vec<AgentView>,
    /// The most recent conversations, oldest first.
    pub conversations: Vec<Conversation>,
}

/// How one agent feels about another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RelationshipView {
    /// The other agent.
    pub agent_id: AgentId,
    /// The other agent's display name.
    pub name: String,
    /// Accumulated relationship score.
    #[ts(as = "String")]
    pub score: Decimal,
}

/// Full detail for a single agent, served on request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AgentDetail {
    /// Public summary fields.
    #[serde(flatten)]
    pub summary: AgentView,
    /// Personality description used in prompts.
    pub personality: String,
    /// Energy in `[0, 100]`.
    #[ts(as = "String")]
    pub energy: Decimal,
    /// Hunger in `[0, 100]`.
    #[ts(as = "String")]
    pub hunger: Decimal,
    /// Declared goals.
    pub goals: Vec<String>,
    /// Building the agent stands in, if any.
    pub building: Option<String>,
    /// Relationships with every agent met so far.
    pub relationships: Vec<RelationshipView>,
    /// Highest ranked memories.
    pub memories: Vec<MemoryEntry>,
    /// Recent conversations the agent took part in, oldest first.
    pub conversations: Vec<Conversation>,
    /// When the agent last made a decision.
    pub last_decision_at: DateTime<Utc>,
}
