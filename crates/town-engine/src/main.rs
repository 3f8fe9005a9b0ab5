//! Host binary for the AI Town simulation.
//!
//! Wires together configuration, the LLM backend, the simulation and the
//! Observer server, then runs until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `TOWN_CONFIG` (default `town-config.yaml`)
//! 2. Initialize structured logging (tracing) from the `logging` section
//! 3. Validate configuration
//! 4. Build the LLM backend from the environment
//! 5. Build the simulation and add the seed agents
//! 6. Spawn the Observer server
//! 7. Start the tick loop if `agents.autostart` is set
//! 8. Wait for `Ctrl-C`, stop the loop, log a summary

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use town_core::config::LoggingConfig;
use town_core::{NewAgent, Simulation, SimulationConfig, SimulationError};
use town_llm::{LlmBackend, LlmBackendConfig};
use town_observer::{AppState, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Environment variable naming the config file.
const CONFIG_ENV: &str = "TOWN_CONFIG";

/// Config file used when `TOWN_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "town-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration. Logging depends on it, so this comes first.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("town-engine starting");
    match source {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }

    // 3. Validate.
    config.validate()?;
    info!(
        world = config.world.name,
        width = config.world.width,
        height = config.world.height,
        buildings = config.buildings.len(),
        tick_interval_ms = config.world.tick_interval_ms,
        model = config.llm.model,
        "Configuration validated"
    );

    // 4. LLM backend.
    let backend_config = LlmBackendConfig::from_env(&config.llm)?;
    let backend = LlmBackend::new(&backend_config)?;
    info!(
        backend = ?backend_config.backend_type,
        api_url = backend_config.api_url,
        "LLM backend configured"
    );

    // 5. Simulation and seed agents.
    let simulation = Arc::new(Simulation::new(&config, Arc::new(backend))?);
    for seed in &config.agents.seed {
        let id = simulation.add_agent(NewAgent::from(seed)).await?;
        info!(agent = seed.name, %id, "Seed agent added");
    }

    // 6. Observer.
    let observer = town_observer::spawn_observer(
        &ServerConfig::from(&config.observer),
        Arc::new(AppState::new(Arc::clone(&simulation))),
    )
    .await?;
    info!(addr = %observer.addr, "Observer API server started");

    // 7. Autostart.
    if config.agents.autostart {
        match simulation.start().await {
            Ok(outcome) => info!(?outcome, "Autostart"),
            Err(SimulationError::NotReady { source }) => warn!(
                error = %source,
                "Language model not ready, waiting for a start command"
            ),
            Err(e) => return Err(e.into()),
        }
    }

    // 8. Run until interrupted.
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    let stopped = simulation.stop().await;
    observer.task.abort();

    let world = simulation.snapshot().await;
    info!(
        ?stopped,
        total_ticks = world.tick,
        agents = world.agents.len(),
        conversations = world.conversations.len(),
        "town-engine shutdown complete"
    );

    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_err| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the configuration named by `TOWN_CONFIG`, falling back to defaults
/// when the file does not exist. Returns the path actually read.
fn load_config() -> Result<(SimulationConfig, Option<PathBuf>), EngineError> {
    let path = std::env::var_os(CONFIG_ENV)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if path.exists() {
        let config = SimulationConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        let mut config = SimulationConfig::default();
        config.apply_env_overrides();
        Ok((config, None))
    }
}
