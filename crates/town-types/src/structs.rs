//! Core value types: grid positions, conversations, and memories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::AgentId;

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// An integer cell on the town grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Position {
    /// Column, growing to the right.
    pub x: i32,
    /// Row, growing downwards.
    pub y: i32,
}

impl Position {
    /// Create a position from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(self, other: Self) -> f64 {
        let dx = f64::from(other.x) - f64::from(self.x);
        let dy = f64::from(other.y) - f64::from(self.y);
        dx.hypot(dy)
    }

    /// The cell reached by walking at most `max_step` units toward `target`.
    ///
    /// When the target is within reach it is returned as is. Otherwise the
    /// direction vector is scaled to `max_step` and each component is
    /// rounded to the nearest cell.
    #[allow(clippy::cast_possible_truncation)]
    pub fn step_toward(self, target: Self, max_step: i32) -> Self {
        let reach = f64::from(max_step);
        let distance = self.distance_to(target);
        if distance <= reach {
            return target;
        }

        let dx = f64::from(target.x) - f64::from(self.x);
        let dy = f64::from(target.y) - f64::from(self.y);
        // |dx / distance * reach| <= reach, so the casts cannot overflow.
        let step_x = (dx / distance * reach).round() as i32;
        let step_y = (dy / distance * reach).round() as i32;

        Self {
            x: self.x.saturating_add(step_x),
            y: self.y.saturating_add(step_y),
        }
    }
}

impl core::fmt::Display for Position {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Width and height of an axis-aligned rectangle, in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Size {
    /// Extent along the x axis.
    pub width: i32,
    /// Extent along the y axis.
    pub height: i32,
}

impl Size {
    /// Create a size from its extents.
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// One utterance exchanged between two agents.
///
/// Immutable once recorded. The same record is appended to the town log
/// and to the private histories of both participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Conversation {
    /// Display name of the agent who spoke.
    pub speaker: String,
    /// Identity of the agent who spoke.
    pub speaker_id: AgentId,
    /// Display name of the agent spoken to.
    pub listener: String,
    /// Identity of the agent spoken to.
    pub listener_id: AgentId,
    /// What was said.
    pub message: String,
    /// When it was said.
    pub timestamp: DateTime<Utc>,
    /// Where the speaker stood.
    pub location: Position,
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// A single remembered experience owned by one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MemoryEntry {
    /// Free-text description of what happened.
    pub content: String,
    /// Importance in `[0, 1]`; higher memories survive pruning longer.
    #[ts(as = "String")]
    pub importance: Decimal,
    /// When the memory was formed.
    pub created_at: DateTime<Utc>,
    /// Where the agent was, if known.
    pub location: Option<Position>,
    /// Other agents involved in the experience.
    pub related_agents: Vec<AgentId>,
}

impl MemoryEntry {
    /// A memory with no location and no related agents.
    pub fn new(content: impl Into<String>, importance: Decimal, created_at: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            importance,
            created_at,
            location: None,
            related_agents: Vec::new(),
        }
    }

    /// Attach the place where the memory was formed.
    #[must_use]
    pub fn at(mut self, location: Position) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach another agent involved in the memory.
    #[must_use]
    pub fn involving(mut self, agent: AgentId) -> Self {
        self.related_agents.push(agent);
        self
    }
}
