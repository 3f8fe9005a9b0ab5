//! Perception: what an agent knows when it starts thinking.
//!
//! A [`Perception`] is an owned copy of everything the planning prompts
//! need. It is captured while the town lock is held and then carried
//! across model calls, so nothing that happens during planning can change
//! what the agent saw.

use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use serde::Serialize;
use town_agents::MemoryConfig;
use town_types::{AgentId, Position};
use tracing::warn;

use crate::prompt::PromptEngine;
use crate::town::Town;

/// Radius within which other agents count as nearby.
pub const PERCEPTION_RADIUS: f64 = 3.0;

/// Radius within which another agent can be spoken to.
pub const TALK_RADIUS: f64 = 2.0;

/// Location label used when an agent stands in no building.
pub const OUTSIDE: &str = "outside";

/// Someone close enough to talk to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Partner {
    /// Identity.
    #[serde(skip)]
    pub id: AgentId,
    /// Display name.
    pub name: String,
    /// Personality description.
    pub personality: String,
    /// Whether the perceiving agent likes them.
    pub friendly: bool,
    /// The perceiving agent's memories about talking to them.
    pub memories: Vec<String>,
}

/// An agent's view of itself and its surroundings at the start of a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Perception {
    /// Who is perceiving.
    #[serde(skip)]
    pub agent_id: AgentId,
    /// Display name.
    pub name: String,
    /// Personality description.
    pub personality: String,
    /// Where the agent stands.
    #[serde(skip)]
    pub position: Position,
    /// Building type the agent stands in, or `outside`.
    pub location: String,
    /// Current mood.
    pub mood: String,
    /// Current energy.
    pub energy: Decimal,
    /// Current hunger.
    pub hunger: Decimal,
    /// Names of agents within [`PERCEPTION_RADIUS`], excluding self.
    pub nearby: Vec<String>,
    /// Declared goals.
    pub goals: Vec<String>,
    /// Rendered situation summary.
    pub context: String,
    /// Memories relevant to the situation.
    pub memories: Vec<String>,
    /// A randomly chosen agent within [`TALK_RADIUS`].
    pub partner: Option<Partner>,
}

/// Capture what `agent_id` perceives right now.
///
/// Returns `None` if the agent is unknown or not on the map.
pub fn perceive(
    town: &mut Town,
    agent_id: AgentId,
    prompts: &PromptEngine,
    memory: &MemoryConfig,
) -> Option<Perception> {
    let position = town.map.position_of(agent_id)?;
    let agent = town.agents.get(&agent_id)?;

    let location = town
        .map
        .building_at(position)
        .map_or_else(|| OUTSIDE.to_owned(), |b| b.kind.to_string());
    let nearby = town
        .map
        .nearby_agents(position, PERCEPTION_RADIUS)
        .into_iter()
        .filter(|id| *id != agent_id)
        .filter_map(|id| town.name_of(id).map(ToOwned::to_owned))
        .collect();

    let mut perception = Perception {
        agent_id,
        name: agent.name.clone(),
        personality: agent.personality.clone(),
        position,
        location,
        mood: agent.mood.clone(),
        energy: agent.vitals.energy,
        hunger: agent.vitals.hunger,
        nearby,
        goals: agent.goals.clone(),
        context: String::new(),
        memories: Vec::new(),
        partner: None,
    };

    perception.context = prompts.render("context.j2", &perception).unwrap_or_else(|e| {
        warn!(agent = %perception.name, error = %e, "Context template failed, using plain summary");
        format!(
            "You are {}, a {} AI agent in AI Town. Current location: {}",
            perception.name, perception.personality, perception.location
        )
    });
    perception.memories = agent
        .memory
        .relevant(&perception.context, memory.retrieval_limit)
        .into_iter()
        .take(memory.prompt_memories)
        .collect();

    let candidates: Vec<AgentId> = town
        .map
        .nearby_agents(position, TALK_RADIUS)
        .into_iter()
        .filter(|id| *id != agent_id)
        .collect();
    let chosen = candidates.choose(&mut town.rng).copied();
    perception.partner = chosen.and_then(|id| partner(town, agent_id, id, memory));

    Some(perception)
}

fn partner(town: &Town, agent_id: AgentId, other: AgentId, memory: &MemoryConfig) -> Option<Partner> {
    let me = town.agents.get(&agent_id)?;
    let them = town.agents.get(&other)?;
    let memories = me
        .memory
        .relevant(&format!("conversation with {}", them.name), memory.retrieval_limit)
        .into_iter()
        .take(memory.conversation_memories)
        .collect();
    Some(Partner {
        id: other,
        name: them.name.clone(),
        personality: them.personality.clone(),
        friendly: me.relationships.is_friendly(other),
        memories,
    })
}
