//! HTTP language-model backends for AI Town.
//!
//! # Modules
//!
//! - [`config`] -- Backend selection and credentials from the environment.
//! - [`llm`] -- OpenAI-compatible and Anthropic backends behind the
//!   [`LanguageModel`] trait, with retries.
//!
//! [`LanguageModel`]: town_core::model::LanguageModel

pub mod config;
pub mod llm;

pub use config::{BackendType, LlmBackendConfig, LlmConfigError};
pub use llm::LlmBackend;
