//! One simulation tick.
//!
//! A tick has three phases:
//!
//! 1. **Perception** under the write lock: the roster is captured and
//!    every agent whose cooldown has elapsed gets a [`Perception`].
//! 2. **Planning** with no lock held: all due agents ask the model
//!    concurrently.
//! 3. **Resolution** under one write lock: drift for every agent of the
//!    captured roster, decisions in roster order, clock advance, and the
//!    snapshot. Nothing awaits while this lock is held.
//!
//! Agents added while a tick is in flight take part from the next tick.

use chrono::{TimeDelta, Utc};
use futures::future::join_all;
use town_agents::{MemoryConfig, VitalsConfig};
use town_types::WorldState;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::decision::DecisionEngine;
use crate::perception::{Perception, perceive};
use crate::resolution::{Outcome, resolve};
use crate::town::Town;

/// Settings the tick reads on every run.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSettings {
    /// Minimum time between two decisions of the same agent.
    pub cooldown: TimeDelta,
    /// Conversations included in the snapshot.
    pub snapshot_conversations: usize,
    /// Metabolism and mood thresholds.
    pub vitals: VitalsConfig,
    /// Memory retrieval limits.
    pub memory: MemoryConfig,
}

/// What a tick did, plus the snapshot taken at its end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSummary {
    /// Number of the completed tick.
    pub tick: u64,
    /// Agents in the roster at tick start.
    pub agents: usize,
    /// Decisions resolved.
    pub decisions: usize,
    /// Successful moves.
    pub moves: usize,
    /// Conversations recorded.
    pub conversations: usize,
    /// Decisions that used a fallback.
    pub fallbacks: usize,
    /// World state after the tick.
    pub snapshot: WorldState,
}

/// Run one tick against the shared town.
pub async fn run_tick(
    town: &RwLock<Town>,
    engine: &DecisionEngine,
    settings: &TickSettings,
    running: bool,
) -> TickSummary {
    // Phase 1: perception.
    let now = Utc::now();
    let (roster, perceptions) = {
        let mut guard = town.write().await;
        let roster = guard.roster.clone();
        let due: Vec<_> = roster
            .iter()
            .copied()
            .filter(|id| {
                guard
                    .agents
                    .get(id)
                    .is_some_and(|a| a.is_due(now, settings.cooldown))
            })
            .collect();
        let perceptions: Vec<Perception> = due
            .into_iter()
            .filter_map(|id| perceive(&mut guard, id, engine.prompts(), &settings.memory))
            .collect();
        (roster, perceptions)
    };

    // Phase 2: planning.
    let decisions = join_all(perceptions.iter().map(|p| engine.decide(p))).await;

    // Phase 3: resolution.
    let mut guard = town.write().await;
    for id in &roster {
        if let Some(agent) = guard.agents.get_mut(id) {
            agent.vitals.drift(&settings.vitals);
            agent.refresh_mood(&settings.vitals);
        }
    }

    let mut moves: usize = 0;
    let mut conversations: usize = 0;
    let mut fallbacks: usize = 0;
    for decision in &decisions {
        if decision.fell_back {
            fallbacks = fallbacks.saturating_add(1);
        }
        match resolve(&mut guard, decision, now, &settings.vitals) {
            Some(Outcome::Moved { moved: true, .. }) => moves = moves.saturating_add(1),
            Some(Outcome::Talked { .. }) => conversations = conversations.saturating_add(1),
            _ => {}
        }
    }

    let tick = guard.clock.advance(now);
    let snapshot = guard.snapshot(settings.snapshot_conversations, running);
    drop(guard);

    let summary = TickSummary {
        tick,
        agents: roster.len(),
        decisions: decisions.len(),
        moves,
        conversations,
        fallbacks,
        snapshot,
    };
    if summary.decisions > 0 {
        info!(
            tick,
            agents = summary.agents,
            decisions = summary.decisions,
            moves,
            conversations,
            fallbacks,
            "Tick complete"
        );
    } else {
        debug!(tick, agents = summary.agents, "Tick complete");
    }
    summary
}
