//! The shared simulation state.
//!
//! [`Town`] bundles everything the tick mutates: the clock, the grid, the
//! agents, the town-wide conversation log, and the random source. The
//! simulation keeps exactly one behind a single `RwLock`, and every
//! mutation happens while holding its write half.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use town_agents::{Agent, ConversationLog, MemoryConfig};
use town_types::{AgentDetail, AgentId, Position, WorldState};
use town_world::{TownMap, WorldError, build_town};
use tracing::info;

use crate::clock::WorldClock;
use crate::config::{SeedAgent, SimulationConfig};

/// Errors from adding an agent to the town.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    /// The requested home building does not exist.
    #[error("unknown building: {0}")]
    UnknownBuilding(String),

    /// Every candidate building is full.
    #[error("no free cell left in any candidate building")]
    TownFull,

    /// The grid refused the placement.
    #[error("placement failed: {source}")]
    World {
        /// The underlying grid error.
        #[from]
        source: WorldError,
    },
}

/// Everything needed to create an agent.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct NewAgent {
    /// Display name.
    pub name: String,
    /// Personality description.
    pub personality: String,
    /// Declared goals.
    #[serde(default)]
    pub goals: Vec<String>,
    /// Building to spawn in; any building when absent.
    #[serde(default)]
    pub home: Option<String>,
}

impl NewAgent {
    /// An agent with no goals that may spawn anywhere.
    pub fn new(name: impl Into<String>, personality: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            personality: personality.into(),
            goals: Vec::new(),
            home: None,
        }
    }

    /// Spawn inside the building with this id.
    #[must_use]
    pub fn at_home(mut self, building: impl Into<String>) -> Self {
        self.home = Some(building.into());
        self
    }

    /// Declare goals.
    #[must_use]
    pub fn with_goals(mut self, goals: Vec<String>) -> Self {
        self.goals = goals;
        self
    }
}

impl From<&SeedAgent> for NewAgent {
    fn from(seed: &SeedAgent) -> Self {
        Self {
            name: seed.name.clone(),
            personality: seed.personality.clone(),
            goals: seed.goals.clone(),
            home: seed.home.clone(),
        }
    }
}

/// Mutable world state guarded by the simulation lock.
#[derive(Debug)]
pub struct Town {
    /// Tick counter and simulated time.
    pub clock: WorldClock,
    /// Grid, buildings, and positions.
    pub map: TownMap,
    /// Agents by identity.
    pub agents: BTreeMap<AgentId, Agent>,
    /// Agent identities in joining order.
    pub roster: Vec<AgentId>,
    /// Town-wide conversation log.
    pub conversations: ConversationLog,
    /// Source of every random choice.
    pub rng: StdRng,
}

impl Town {
    /// Build the town described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError`] if the layout does not fit the grid.
    pub fn new(config: &SimulationConfig, now: DateTime<Utc>) -> Result<Self, WorldError> {
        let map = build_town(config.world.width, config.world.height, &config.buildings)?;
        Ok(Self {
            clock: WorldClock::new(now),
            map,
            agents: BTreeMap::new(),
            roster: Vec::new(),
            conversations: ConversationLog::new(config.world.conversation_log_capacity),
            rng: StdRng::seed_from_u64(config.world.seed),
        })
    }

    /// Create an agent and place it on a random free cell of a random
    /// building (or of its requested home).
    ///
    /// # Errors
    ///
    /// Returns [`SpawnError::UnknownBuilding`] for a bad home and
    /// [`SpawnError::TownFull`] when no candidate building has room.
    pub fn add_agent(
        &mut self,
        new: NewAgent,
        memory: &MemoryConfig,
        now: DateTime<Utc>,
    ) -> Result<AgentId, SpawnError> {
        let candidates = match new.home.as_deref() {
            Some(id) => vec![
                self.map
                    .building(id)
                    .ok_or_else(|| SpawnError::UnknownBuilding(id.to_owned()))?,
            ],
            None => self.map.buildings().iter().collect(),
        };
        let open: Vec<Vec<Position>> = candidates
            .into_iter()
            .map(|building| self.map.free_cells(building))
            .filter(|cells| !cells.is_empty())
            .collect();
        let position = open
            .choose(&mut self.rng)
            .and_then(|cells| cells.choose(&mut self.rng))
            .copied()
            .ok_or(SpawnError::TownFull)?;

        let id = AgentId::new();
        self.map.place_agent(id, position)?;
        let agent = Agent::new(id, new.name, new.personality, new.goals, memory, now);
        info!(agent = %agent.name, %id, %position, "Agent joined the town");
        self.agents.insert(id, agent);
        self.roster.push(id);
        Ok(id)
    }

    /// Display name of an agent.
    pub fn name_of(&self, id: AgentId) -> Option<&str> {
        self.agents.get(&id).map(|a| a.name.as_str())
    }

    /// Deep-copied world view with the last `conversations` utterances.
    pub fn snapshot(&self, conversations: usize, running: bool) -> WorldState {
        WorldState {
            width: self.map.width(),
            height: self.map.height(),
            tick: self.clock.tick(),
            time: self.clock.time(),
            running,
            buildings: self.map.buildings().iter().map(town_world::Building::view).collect(),
            agents: self
                .roster
                .iter()
                .filter_map(|id| {
                    let agent = self.agents.get(id)?;
                    let position = self.map.position_of(*id)?;
                    Some(agent.view(position))
                })
                .collect(),
            conversations: self.conversations.recent(conversations),
        }
    }

    /// Full detail for one agent.
    pub fn agent_detail(&self, id: AgentId) -> Option<AgentDetail> {
        let agent = self.agents.get(&id)?;
        let position = self.map.position_of(id)?;
        let building = self.map.building_at(position).map(|b| b.id.clone());
        Some(agent.detail(position, building, |other| {
            self.name_of(other).map(ToOwned::to_owned)
        }))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use town_world::BuildingSpec;
    use town_types::BuildingType;

    use super::*;

    fn tiny_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.world.width = 10;
        config.world.height = 10;
        config.buildings = vec![BuildingSpec {
            id: String::from("hut"),
            kind: BuildingType::House,
            x: 0,
            y: 0,
            width: 2,
            height: 1,
        }];
        config
    }

    #[test]
    fn agents_spawn_inside_buildings() {
        let config = SimulationConfig::default();
        let mut town = Town::new(&config, Utc::now()).unwrap();
        for i in 0..20 {
            let id = town
                .add_agent(NewAgent::new(format!("agent{i}"), "curious"), &config.memory, Utc::now())
                .unwrap();
            let position = town.map.position_of(id).unwrap();
            assert!(town.map.building_at(position).is_some());
        }
        assert_eq!(town.roster.len(), 20);
    }

    #[test]
    fn home_building_is_honored() {
        let config = SimulationConfig::default();
        let mut town = Town::new(&config, Utc::now()).unwrap();
        let id = town
            .add_agent(NewAgent::new("Alice", "friendly").at_home("house1"), &config.memory, Utc::now())
            .unwrap();
        let position = town.map.position_of(id).unwrap();
        assert!((5..8).contains(&position.x) && (5..8).contains(&position.y));

        let err = town
            .add_agent(NewAgent::new("Bob", "quiet").at_home("castle"), &config.memory, Utc::now())
            .unwrap_err();
        assert!(matches!(err, SpawnError::UnknownBuilding(_)));
    }

    #[test]
    fn full_town_refuses_agents() {
        let config = tiny_config();
        let mut town = Town::new(&config, Utc::now()).unwrap();
        for name in ["a", "b"] {
            town.add_agent(NewAgent::new(name, "x"), &config.memory, Utc::now()).unwrap();
        }
        let err = town.add_agent(NewAgent::new("c", "x"), &config.memory, Utc::now()).unwrap_err();
        assert!(matches!(err, SpawnError::TownFull));
    }

    #[test]
    fn snapshot_lists_agents_in_joining_order() {
        let config = SimulationConfig::default();
        let mut town = Town::new(&config, Utc::now()).unwrap();
        for name in ["Alice", "Bob", "Charlie"] {
            town.add_agent(NewAgent::new(name, "x"), &config.memory, Utc::now()).unwrap();
        }
        let state = town.snapshot(10, false);
        let names: Vec<&str> = state.agents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Charlie"]);
        assert_eq!(state.buildings.len(), 6);
        let occupants: usize = state.buildings.iter().map(|b| b.occupants.len()).sum();
        assert_eq!(occupants, 3);
    }
}
