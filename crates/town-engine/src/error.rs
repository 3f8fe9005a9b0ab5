//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup and shutdown.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: town_core::ConfigError,
    },

    /// The LLM environment settings were unusable.
    #[error("LLM config error: {source}")]
    LlmConfig {
        /// The underlying settings error.
        #[from]
        source: town_llm::LlmConfigError,
    },

    /// The LLM backend could not be built.
    #[error("LLM backend error: {source}")]
    Backend {
        /// The underlying provider error.
        #[from]
        source: town_core::ProviderError,
    },

    /// The simulation could not be built or seeded.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: town_core::SimulationError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: town_observer::StartupError,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
