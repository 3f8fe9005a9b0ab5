//! Configuration loading and typed config structures for AI Town.
//!
//! The canonical configuration lives in `town-config.yaml`. Every section
//! and field has a default, so an empty document describes the standard
//! 50x50 town with six buildings and five residents.
//!
//! LLM credentials are deliberately absent: they come from the environment
//! and are read by the collaborator crate.

use std::path::Path;

use serde::Deserialize;
use town_agents::{MemoryConfig, VitalsConfig};
use town_world::{BuildingSpec, default_layout};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but describes an impossible town.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Grid size, timing, and seed.
    #[serde(default)]
    pub world: WorldConfig,

    /// Buildings in registration order.
    #[serde(default = "default_layout")]
    pub buildings: Vec<BuildingSpec>,

    /// Seed residents added at startup.
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Request parameters for the language model.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Energy and hunger tuning.
    #[serde(default)]
    pub vitals: VitalsConfig,

    /// Memory limits.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Observer HTTP server.
    #[serde(default)]
    pub observer: ObserverConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Directory of prompt templates overriding the built-in ones.
    #[serde(default)]
    pub templates_dir: Option<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            buildings: default_layout(),
            agents: AgentsConfig::default(),
            llm: LlmConfig::default(),
            vitals: VitalsConfig::default(),
            memory: MemoryConfig::default(),
            observer: ObserverConfig::default(),
            logging: LoggingConfig::default(),
            templates_dir: None,
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file and apply environment overrides.
    ///
    /// Environment variables override YAML values:
    /// - `TOWN_OBSERVER_PORT` (or `PORT`) overrides `observer.port`
    /// - `LLM_MODEL` overrides `llm.model`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::parse(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string without consulting the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let port = lookup("TOWN_OBSERVER_PORT").or_else(|| lookup("PORT"));
        if let Some(raw) = port {
            match raw.parse::<u16>() {
                Ok(port) => self.observer.port = port,
                Err(e) => tracing::warn!(value = raw, error = %e, "ignoring invalid port override"),
            }
        }
        if let Some(model) = lookup("LLM_MODEL").filter(|m| !m.trim().is_empty()) {
            self.llm.model = model;
        }
    }

    /// Check the invariants the simulation relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| Err(ConfigError::Invalid { reason });

        if self.world.width <= 0 || self.world.height <= 0 {
            return invalid(format!(
                "world must have positive dimensions, got {}x{}",
                self.world.width, self.world.height
            ));
        }
        if self.world.tick_interval_ms == 0 {
            return invalid(String::from("world.tick_interval_ms must be positive"));
        }
        if self.buildings.is_empty() {
            return invalid(String::from("at least one building is required"));
        }
        for (i, spec) in self.buildings.iter().enumerate() {
            if self.buildings.iter().take(i).any(|other| other.id == spec.id) {
                return invalid(format!("duplicate building id {}", spec.id));
            }
            let fits = spec.width > 0
                && spec.height > 0
                && spec.x >= 0
                && spec.y >= 0
                && spec.x.saturating_add(spec.width) <= self.world.width
                && spec.y.saturating_add(spec.height) <= self.world.height;
            if !fits {
                return invalid(format!("building {} does not fit inside the grid", spec.id));
            }
        }
        if self.memory.capacity == 0 {
            return invalid(String::from("memory.capacity must be positive"));
        }
        if self.llm.max_concurrent_calls == 0 {
            return invalid(String::from("llm.max_concurrent_calls must be positive"));
        }
        Ok(())
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable town name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Grid width in cells.
    #[serde(default = "default_dimension")]
    pub width: i32,

    /// Grid height in cells.
    #[serde(default = "default_dimension")]
    pub height: i32,

    /// Seed for placement and partner choice.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Real-time milliseconds between ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Minimum milliseconds between an agent's decisions.
    #[serde(default = "default_decision_cooldown_ms")]
    pub decision_cooldown_ms: u64,

    /// Conversations retained in the town log.
    #[serde(default = "default_conversation_log_capacity")]
    pub conversation_log_capacity: usize,

    /// Conversations included in each snapshot.
    #[serde(default = "default_snapshot_conversations")]
    pub snapshot_conversations: usize,
}

fn default_world_name() -> String {
    String::from("AI Town")
}

const fn default_dimension() -> i32 {
    50
}

const fn default_seed() -> u64 {
    42
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_decision_cooldown_ms() -> u64 {
    2000
}

const fn default_conversation_log_capacity() -> usize {
    500
}

const fn default_snapshot_conversations() -> usize {
    10
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            width: default_dimension(),
            height: default_dimension(),
            seed: default_seed(),
            tick_interval_ms: default_tick_interval_ms(),
            decision_cooldown_ms: default_decision_cooldown_ms(),
            conversation_log_capacity: default_conversation_log_capacity(),
            snapshot_conversations: default_snapshot_conversations(),
        }
    }
}

/// A resident to add before the simulation starts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeedAgent {
    /// Display name.
    pub name: String,
    /// Personality description.
    pub personality: String,
    /// Declared goals.
    #[serde(default)]
    pub goals: Vec<String>,
    /// Building id to spawn in; random when absent.
    #[serde(default)]
    pub home: Option<String>,
}

impl SeedAgent {
    fn named(name: &str, personality: &str) -> Self {
        Self {
            name: name.to_owned(),
            personality: personality.to_owned(),
            goals: Vec::new(),
            home: None,
        }
    }
}

/// Seed residents and startup behavior.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentsConfig {
    /// Residents added at startup.
    #[serde(default = "default_seed_agents")]
    pub seed: Vec<SeedAgent>,

    /// Start the tick loop as soon as the host is up.
    #[serde(default)]
    pub autostart: bool,
}

fn default_seed_agents() -> Vec<SeedAgent> {
    vec![
        SeedAgent::named("Alice", "friendly and outgoing, loves meeting new people"),
        SeedAgent::named("Bob", "quiet and thoughtful, enjoys reading and coffee"),
        SeedAgent::named("Charlie", "energetic and curious, always exploring"),
        SeedAgent::named("Diana", "caring and helpful, likes to assist others"),
        SeedAgent::named("Eve", "creative and artistic, enjoys the park"),
    ]
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            seed: default_seed_agents(),
            autostart: false,
        }
    }
}

/// Parameters for every completion request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LlmConfig {
    /// Model identifier sent with each request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Maximum tokens in a reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Deadline for a single model call before the fallback kicks in.
    #[serde(default = "default_decision_timeout_ms")]
    pub decision_timeout_ms: u64,

    /// Model calls allowed in flight at once.
    #[serde(default = "default_max_concurrent_calls")]
    pub max_concurrent_calls: usize,

    /// Retries for transient HTTP failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// HTTP timeout for one request attempt.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_model() -> String {
    String::from("openai/gpt-3.5-turbo")
}

const fn default_temperature() -> f64 {
    0.7
}

const fn default_max_tokens() -> u32 {
    150
}

const fn default_decision_timeout_ms() -> u64 {
    20_000
}

const fn default_max_concurrent_calls() -> usize {
    8
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_request_timeout_ms() -> u64 {
    15_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            decision_timeout_ms: default_decision_timeout_ms(),
            max_concurrent_calls: default_max_concurrent_calls(),
            max_retries: default_max_retries(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Observer HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObserverConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    String::from("0.0.0.0")
}

const fn default_port() -> u16 {
    5000
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// `pretty` or `json`.
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    String::from("info")
}

fn default_format() -> String {
    String::from("pretty")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}
