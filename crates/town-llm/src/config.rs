//! Backend configuration loaded from the environment.
//!
//! Credentials never live in the YAML file. The backend type, base URL,
//! API key, and the optional OpenRouter attribution headers are read from
//! environment variables; retry and timeout settings come from the `llm`
//! section of the simulation config.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `LLM_BACKEND` | `openai`, `openrouter`, `deepseek`, `ollama`, `anthropic` | `openrouter` |
//! | `LLM_API_URL` | Base URL | depends on backend |
//! | `LLM_API_KEY` | API key, falling back to `OPENROUTER_API_KEY` | empty |
//! | `LLM_REFERER` | `HTTP-Referer` header | unset |
//! | `LLM_TITLE` | `X-Title` header | unset |

use std::str::FromStr;
use std::time::Duration;

use town_core::config::LlmConfig;

/// Base URL used for OpenAI-compatible backends when none is given.
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1";

/// Base URL used for the Anthropic backend when none is given.
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";

/// Errors in the backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmConfigError {
    /// `LLM_BACKEND` names no known backend.
    #[error("unknown backend type: {0}")]
    UnknownBackend(String),
}

/// Supported LLM backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible chat completions (`OpenRouter`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API.
    Anthropic,
}

impl BackendType {
    /// Base URL used when `LLM_API_URL` is unset.
    pub const fn default_api_url(self) -> &'static str {
        match self {
            Self::OpenAi => DEFAULT_API_URL,
            Self::Anthropic => ANTHROPIC_API_URL,
        }
    }
}

impl FromStr for BackendType {
    type Err = LlmConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "openrouter" | "deepseek" | "ollama" => Ok(Self::OpenAi),
            "anthropic" | "claude" => Ok(Self::Anthropic),
            other => Err(LlmConfigError::UnknownBackend(other.to_owned())),
        }
    }
}

/// Everything needed to reach one provider.
#[derive(Clone)]
pub struct LlmBackendConfig {
    /// Wire protocol.
    pub backend_type: BackendType,
    /// Base API URL without a trailing slash.
    pub api_url: String,
    /// API key. Empty means unconfigured.
    pub api_key: String,
    /// Optional `HTTP-Referer` header.
    pub referer: Option<String>,
    /// Optional `X-Title` header.
    pub title: Option<String>,
    /// Extra attempts after a retryable failure.
    pub max_retries: u32,
    /// Deadline for a single HTTP request.
    pub request_timeout: Duration,
}

impl LlmBackendConfig {
    /// Load from the process environment.
    ///
    /// A missing key is not an error here; the backend reports it when the
    /// simulation starts.
    pub fn from_env(settings: &LlmConfig) -> Result<Self, LlmConfigError> {
        Self::from_lookup(settings, |name| std::env::var(name).ok())
    }

    /// Load using `lookup` in place of the environment.
    pub fn from_lookup(
        settings: &LlmConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, LlmConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend_type = non_empty("LLM_BACKEND")
            .map_or(Ok(BackendType::OpenAi), |v| v.parse())?;
        let api_url = non_empty("LLM_API_URL")
            .unwrap_or_else(|| backend_type.default_api_url().to_owned())
            .trim_end_matches('/')
            .to_owned();
        let api_key = non_empty("LLM_API_KEY")
            .or_else(|| non_empty("OPENROUTER_API_KEY"))
            .unwrap_or_default();

        Ok(Self {
            backend_type,
            api_url,
            api_key,
            referer: non_empty("LLM_REFERER"),
            title: non_empty("LLM_TITLE"),
            max_retries: settings.max_retries,
            request_timeout: Duration::from_millis(settings.request_timeout_ms),
        })
    }
}

impl std::fmt::Debug for LlmBackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmBackendConfig")
            .field("backend_type", &self.backend_type)
            .field("api_url", &self.api_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("referer", &self.referer)
            .field("title", &self.title)
            .field("max_retries", &self.max_retries)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
