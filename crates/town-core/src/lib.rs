//! Decision engine, tick cycle, and simulation lifecycle for AI Town.
//!
//! Every tick, agents perceive a frozen view of the town, ask a language
//! model what to do, and have their decisions applied in one atomic
//! resolution step. The [`Simulation`] facade wraps all of this for the
//! transport layer.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter and simulated time.
//! - [`command`] -- Interpretation of free-text plans into commands.
//! - [`config`] -- Configuration loading from `town-config.yaml`.
//! - [`decision`] -- Planning and conversation generation with fallbacks.
//! - [`model`] -- The [`LanguageModel`] collaborator trait and a scripted
//!   stand-in.
//! - [`perception`] -- Per-agent perception captured under the lock.
//! - [`prompt`] -- Prompt templates rendered with `minijinja`.
//! - [`resolution`] -- Applying decisions to the town.
//! - [`runner`] -- The background tick loop.
//! - [`simulation`] -- The shared facade with start/stop lifecycle.
//! - [`tick`] -- One three-phase tick.
//! - [`town`] -- The mutable state behind the simulation lock.
//!
//! [`LanguageModel`]: model::LanguageModel
//! [`Simulation`]: simulation::Simulation

pub mod clock;
pub mod command;
pub mod config;
pub mod decision;
pub mod model;
pub mod perception;
pub mod prompt;
pub mod resolution;
pub mod runner;
pub mod simulation;
pub mod tick;
pub mod town;

pub use command::{Command, interpret};
pub use config::{ConfigError, SimulationConfig};
pub use model::{ChatMessage, ChatRole, CompletionRequest, LanguageModel, ProviderError, ScriptedModel};
pub use resolution::Outcome;
pub use simulation::{Simulation, SimulationError, StartOutcome, StopOutcome};
pub use tick::TickSummary;
pub use town::NewAgent;
