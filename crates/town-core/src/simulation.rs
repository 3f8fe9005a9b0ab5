//! The simulation facade shared with the transport layer.
//!
//! [`Simulation`] owns the town behind one `RwLock`, the decision engine,
//! and at most one background tick worker. It is meant to be wrapped in
//! an [`Arc`] and called from any number of request handlers while the
//! worker runs.
//!
//! # Lifecycle
//!
//! `start` and `stop` are idempotent and serialized by an async mutex, so
//! exactly one tick loop can be active. `stop` waits for the worker to
//! finish; a tick that is still planning is abandoned, a tick that is
//! resolving completes first.
//!
//! Loop ticks, [`Simulation::step`] and [`Simulation::force_plan`] all hold
//! the tick gate for their whole perceive-to-resolve span, so they run one
//! after another and never decide for the same agent twice.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, Notify, RwLock, broadcast};
use tokio::task::JoinHandle;
use town_types::{AgentDetail, AgentId, WorldState};
use town_world::WorldError;
use tracing::{debug, info, warn};

use crate::command::interpret;
use crate::config::{ConfigError, SimulationConfig};
use crate::decision::DecisionEngine;
use crate::model::{LanguageModel, ProviderError};
use crate::perception::perceive;
use crate::prompt::{PromptEngine, PromptError};
use crate::resolution::{Outcome, resolve};
use crate::runner::{Broadcaster, SimulationResult, log_simulation_end, run_simulation};
use crate::tick::{TickSettings, TickSummary, run_tick};
use crate::town::{NewAgent, SpawnError, Town};

/// Snapshots buffered per subscriber before it starts lagging.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Errors from the simulation facade.
#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    /// The configuration is invalid.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The town layout could not be built.
    #[error("world error: {source}")]
    World {
        /// The underlying grid error.
        #[from]
        source: WorldError,
    },

    /// Prompt templates could not be loaded.
    #[error("prompt error: {source}")]
    Prompt {
        /// The underlying template error.
        #[from]
        source: PromptError,
    },

    /// No building has room for another agent.
    #[error("the town is full")]
    TownFull,

    /// The requested building does not exist.
    #[error("unknown building: {0}")]
    UnknownBuilding(String),

    /// The language model cannot serve requests.
    #[error("language model not ready: {source}")]
    NotReady {
        /// Why the model refused.
        source: ProviderError,
    },

    /// No agent has this identity.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),
}

impl From<SpawnError> for SimulationError {
    fn from(error: SpawnError) -> Self {
        match error {
            SpawnError::UnknownBuilding(id) => Self::UnknownBuilding(id),
            SpawnError::TownFull => Self::TownFull,
            SpawnError::World { source } => Self::World { source },
        }
    }
}

/// Result of [`Simulation::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// A new tick loop was spawned.
    Started,
    /// A tick loop was already active.
    AlreadyRunning,
}

/// Result of [`Simulation::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    /// The active tick loop was stopped.
    Stopped,
    /// No tick loop was active.
    NotRunning,
}

struct Worker {
    stop: Arc<Notify>,
    handle: JoinHandle<SimulationResult>,
}

/// A running or idle AI Town.
pub struct Simulation {
    name: String,
    town: Arc<RwLock<Town>>,
    tick_gate: Arc<Mutex<()>>,
    engine: Arc<DecisionEngine>,
    settings: Arc<TickSettings>,
    tick_interval: Duration,
    updates: broadcast::Sender<WorldState>,
    worker: Mutex<Option<Worker>>,
    running: AtomicBool,
}

impl Simulation {
    /// Build a simulation from configuration and a language model.
    ///
    /// Prompt templates come from `templates_dir` when set, with built-in
    /// templates filling any gaps.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError`] if the configuration is invalid, the
    /// layout does not fit, or templates cannot be loaded.
    pub fn new(config: &SimulationConfig, model: Arc<dyn LanguageModel>) -> Result<Self, SimulationError> {
        config.validate()?;
        let prompts = match config.templates_dir.as_deref() {
            Some(dir) => PromptEngine::from_dir(Path::new(dir))?,
            None => PromptEngine::builtin()?,
        };
        let town = Town::new(config, Utc::now())?;
        let engine = DecisionEngine::new(model, prompts, config.llm.clone());
        let cooldown_ms = i64::try_from(config.world.decision_cooldown_ms).unwrap_or(i64::MAX);
        let settings = TickSettings {
            cooldown: TimeDelta::try_milliseconds(cooldown_ms).unwrap_or(TimeDelta::MAX),
            snapshot_conversations: config.world.snapshot_conversations,
            vitals: config.vitals.clone(),
            memory: config.memory.clone(),
        };
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        info!(
            world = %config.world.name,
            width = config.world.width,
            height = config.world.height,
            buildings = config.buildings.len(),
            model = %config.llm.model,
            "Simulation created"
        );
        Ok(Self {
            name: config.world.name.clone(),
            town: Arc::new(RwLock::new(town)),
            tick_gate: Arc::new(Mutex::new(())),
            engine: Arc::new(engine),
            settings: Arc::new(settings),
            tick_interval: Duration::from_millis(config.world.tick_interval_ms),
            updates,
            worker: Mutex::new(None),
            running: AtomicBool::new(false),
        })
    }

    /// Name of the town.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the language model backend.
    pub fn model_name(&self) -> &str {
        self.engine.model().name()
    }

    // -------------------------------------------------------------------
    // Agents
    // -------------------------------------------------------------------

    /// Create an agent and place it in a building.
    ///
    /// The agent takes part in ticks that start after this returns.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::UnknownBuilding`] or
    /// [`SimulationError::TownFull`] when it cannot be placed.
    pub async fn add_agent(&self, new: NewAgent) -> Result<AgentId, SimulationError> {
        let mut town = self.town.write().await;
        Ok(town.add_agent(new, &self.settings.memory, Utc::now())?)
    }

    /// Full detail of one agent.
    pub async fn agent(&self, id: AgentId) -> Option<AgentDetail> {
        self.town.read().await.agent_detail(id)
    }

    /// Run a given plan for one agent immediately, bypassing the model for
    /// planning. Speech is still generated when the plan is to talk.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::UnknownAgent`] if the agent does not
    /// exist.
    pub async fn force_plan(&self, id: AgentId, plan: &str) -> Result<Outcome, SimulationError> {
        let _tick = self.tick_gate.lock().await;
        let now = Utc::now();
        let perception = {
            let mut town = self.town.write().await;
            perceive(&mut town, id, self.engine.prompts(), &self.settings.memory)
                .ok_or(SimulationError::UnknownAgent(id))?
        };

        let decision = self
            .engine
            .follow_through(&perception, plan.to_owned(), interpret(plan))
            .await;

        let (outcome, snapshot) = {
            let mut town = self.town.write().await;
            let outcome = resolve(&mut town, &decision, now, &self.settings.vitals)
                .ok_or(SimulationError::UnknownAgent(id))?;
            (outcome, town.snapshot(self.settings.snapshot_conversations, self.is_running()))
        };
        debug!(agent = %perception.name, %plan, ?outcome, "Forced plan resolved");
        self.publish(snapshot);
        Ok(outcome)
    }

    // -------------------------------------------------------------------
    // World state
    // -------------------------------------------------------------------

    /// A deep copy of the current world state.
    pub async fn snapshot(&self) -> WorldState {
        self.town
            .read()
            .await
            .snapshot(self.settings.snapshot_conversations, self.is_running())
    }

    /// Receive every snapshot published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<WorldState> {
        self.updates.subscribe()
    }

    /// Run exactly one tick inline and publish its snapshot.
    ///
    /// While the loop is running this waits for the loop's tick in flight
    /// and then runs as an extra tick of its own.
    pub async fn step(&self) -> TickSummary {
        let _tick = self.tick_gate.lock().await;
        let summary = run_tick(&self.town, &self.engine, &self.settings, self.is_running()).await;
        self.publish(summary.snapshot.clone());
        summary
    }

    fn publish(&self, snapshot: WorldState) {
        if self.updates.send(snapshot).is_err() {
            debug!("No observers subscribed");
        }
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Whether the tick loop is active.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Spawn the tick loop unless one is already active.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::NotReady`] without spawning anything if
    /// the language model reports it cannot serve requests.
    pub async fn start(&self) -> Result<StartOutcome, SimulationError> {
        let mut worker = self.worker.lock().await;
        if worker.as_ref().is_some_and(|w| !w.handle.is_finished()) {
            debug!("Start requested while running");
            return Ok(StartOutcome::AlreadyRunning);
        }
        self.engine
            .model()
            .ensure_ready()
            .map_err(|source| SimulationError::NotReady { source })?;

        let stop = Arc::new(Notify::new());
        let handle = tokio::spawn({
            let town = Arc::clone(&self.town);
            let gate = Arc::clone(&self.tick_gate);
            let engine = Arc::clone(&self.engine);
            let settings = Arc::clone(&self.settings);
            let stop = Arc::clone(&stop);
            let interval = self.tick_interval;
            let mut broadcaster = Broadcaster::new(self.updates.clone());
            async move {
                let result =
                    run_simulation(&town, &gate, &engine, &settings, interval, &stop, &mut broadcaster)
                        .await;
                log_simulation_end(&result);
                result
            }
        });
        *worker = Some(Worker { stop, handle });
        self.running.store(true, Ordering::Release);
        info!(world = %self.name, "Simulation started");
        Ok(StartOutcome::Started)
    }

    /// Stop the tick loop and wait for it to finish.
    pub async fn stop(&self) -> StopOutcome {
        let mut worker = self.worker.lock().await;
        let Some(Worker { stop, handle }) = worker.take() else {
            return StopOutcome::NotRunning;
        };
        let was_running = !handle.is_finished();
        stop.notify_one();
        self.running.store(false, Ordering::Release);

        if let Err(e) = handle.await {
            warn!(error = %e, "Tick worker ended abnormally");
        }
        if was_running {
            info!(world = %self.name, "Simulation stopped");
            StopOutcome::Stopped
        } else {
            StopOutcome::NotRunning
        }
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("name", &self.name)
            .field("engine", &self.engine)
            .field("tick_interval", &self.tick_interval)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.get_mut().take() {
            worker.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::model::ScriptedModel;

    fn simulation(model: ScriptedModel) -> Simulation {
        let mut config = SimulationConfig::default();
        config.world.tick_interval_ms = 10;
        Simulation::new(&config, Arc::new(model)).unwrap()
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let sim = simulation(ScriptedModel::replying("rest"));
        assert_eq!(sim.stop().await, StopOutcome::NotRunning);
        assert_eq!(sim.start().await.unwrap(), StartOutcome::Started);
        assert!(sim.is_running());
        assert_eq!(sim.start().await.unwrap(), StartOutcome::AlreadyRunning);
        assert_eq!(sim.stop().await, StopOutcome::Stopped);
        assert!(!sim.is_running());
        assert_eq!(sim.stop().await, StopOutcome::NotRunning);
        assert_eq!(sim.start().await.unwrap(), StartOutcome::Started);
        assert_eq!(sim.stop().await, StopOutcome::Stopped);
    }

    #[tokio::test]
    async fn unready_model_refuses_to_start() {
        let sim = simulation(ScriptedModel::replying("rest").not_ready("missing API key"));
        let err = sim.start().await.unwrap_err();
        assert!(matches!(err, SimulationError::NotReady { .. }));
        assert!(!sim.is_running());
        assert_eq!(sim.stop().await, StopOutcome::NotRunning);
    }

    #[tokio::test]
    async fn spawn_errors_map_to_facade_errors() {
        let sim = simulation(ScriptedModel::replying("rest"));
        let err = sim
            .add_agent(NewAgent::new("Zed", "odd").at_home("nowhere"))
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::UnknownBuilding(ref id) if id == "nowhere"));
    }

    #[tokio::test]
    async fn forcing_a_plan_for_a_stranger_fails() {
        let sim = simulation(ScriptedModel::replying("rest"));
        let err = sim.force_plan(AgentId::new(), "eat").await.unwrap_err();
        assert!(matches!(err, SimulationError::UnknownAgent(_)));
    }

    #[tokio::test]
    async fn step_publishes_to_subscribers() {
        let sim = simulation(ScriptedModel::replying("rest"));
        sim.add_agent(NewAgent::new("Alice", "calm")).await.unwrap();
        let mut updates = sim.subscribe();
        let summary = sim.step().await;
        let published = updates.recv().await.unwrap();
        assert_eq!(published.tick, 1);
        assert_eq!(published, summary.snapshot);
        assert!(!published.running);
    }
}
