//! The agent record: identity, needs, memory, and social ties.
//!
//! An agent's position is not stored here. The town map owns positions so
//! that it can guarantee one agent per cell.

use chrono::{DateTime, TimeDelta, Utc};
use town_types::{AgentDetail, AgentId, AgentView, MemoryEntry, Position};

use crate::config::{MemoryConfig, VitalsConfig};
use crate::conversation::ConversationLog;
use crate::memory::MemoryStore;
use crate::social::Relationships;
use crate::vitals::Vitals;

/// Mood of a freshly created agent.
pub const INITIAL_MOOD: &str = "neutral";

/// Action label of a freshly created agent.
pub const INITIAL_ACTION: &str = "standing";

/// Memories included in an [`AgentDetail`].
const DETAIL_MEMORIES: usize = 10;

/// Conversations included in an [`AgentDetail`].
const DETAIL_CONVERSATIONS: usize = 10;

/// A simulated townsperson.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Identity.
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Personality description woven into prompts.
    pub personality: String,
    /// Free-text mood.
    pub mood: String,
    /// Label of the current activity.
    pub current_action: String,
    /// Energy and hunger.
    pub vitals: Vitals,
    /// Private memory.
    pub memory: MemoryStore,
    /// Scores toward other agents.
    pub relationships: Relationships,
    /// Declared goals.
    pub goals: Vec<String>,
    /// Conversations this agent took part in.
    pub conversations: ConversationLog,
    /// When the agent last made a decision.
    pub last_decision_at: DateTime<Utc>,
}

impl Agent {
    /// Create an agent that will make its first decision one cooldown
    /// after `now`.
    pub fn new(
        id: AgentId,
        name: impl Into<String>,
        personality: impl Into<String>,
        goals: Vec<String>,
        memory: &MemoryConfig,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            personality: personality.into(),
            mood: INITIAL_MOOD.to_owned(),
            current_action: INITIAL_ACTION.to_owned(),
            vitals: Vitals::default(),
            memory: MemoryStore::new(memory.capacity),
            relationships: Relationships::new(),
            goals,
            conversations: ConversationLog::new(memory.history_capacity),
            last_decision_at: now,
        }
    }

    /// Whether at least `cooldown` has passed since the last decision.
    pub fn is_due(&self, now: DateTime<Utc>, cooldown: TimeDelta) -> bool {
        now.signed_duration_since(self.last_decision_at) >= cooldown
    }

    /// Record a memory.
    pub fn remember(&mut self, entry: MemoryEntry) {
        self.memory.add(entry);
    }

    /// Let bodily needs override the mood when they are pressing.
    pub fn refresh_mood(&mut self, config: &VitalsConfig) {
        if let Some(mood) = self.vitals.pressing_mood(config) {
            mood.clone_into(&mut self.mood);
        }
    }

    /// Public summary at the given position.
    pub fn view(&self, position: Position) -> AgentView {
        AgentView {
            id: self.id,
            name: self.name.clone(),
            position,
            mood: self.mood.clone(),
            current_action: self.current_action.clone(),
        }
    }

    /// Full detail at the given position.
    ///
    /// `name_of` resolves relationship targets to display names.
    pub fn detail(
        &self,
        position: Position,
        building: Option<String>,
        name_of: impl Fn(AgentId) -> Option<String>,
    ) -> AgentDetail {
        AgentDetail {
            summary: self.view(position),
            personality: self.personality.clone(),
            energy: self.vitals.energy,
            hunger: self.vitals.hunger,
            goals: self.goals.clone(),
            building,
            relationships: self
                .relationships
                .iter()
                .map(|(agent_id, score)| town_types::RelationshipView {
                    agent_id,
                    name: name_of(agent_id).unwrap_or_default(),
                    score,
                })
                .collect(),
            memories: self.memory.iter().take(DETAIL_MEMORIES).cloned().collect(),
            conversations: self.conversations.recent(DETAIL_CONVERSATIONS),
            last_decision_at: self.last_decision_at,
        }
    }
}
