//! LLM backend implementations.
//!
//! [`LlmBackend`] dispatches over the concrete HTTP backends with an enum
//! and implements [`LanguageModel`] so the simulation can hold it as
//! `Arc<dyn LanguageModel>`. Both backends share the same retry policy:
//! transport failures, timeouts, 429, and 5xx are retried with
//! exponential backoff; every other failure is returned at once.

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
use town_core::model::{ChatRole, CompletionRequest, LanguageModel, ProviderError};
use tracing::{debug, warn};

use crate::config::{BackendType, LlmBackendConfig};

/// Delay before the first retry; doubled for each further one.
pub const BASE_BACKOFF: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Unified backend enum
// ---------------------------------------------------------------------------

/// An HTTP language-model backend.
pub enum LlmBackend {
    /// OpenAI-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Anthropic Messages API.
    Anthropic(AnthropicBackend),
}

impl LlmBackend {
    /// Create the backend selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, ProviderError> {
        let http = HttpSettings::new(config)?;
        Ok(match config.backend_type {
            BackendType::OpenAi => Self::OpenAi(OpenAiBackend {
                http,
                referer: config.referer.clone(),
                title: config.title.clone(),
            }),
            BackendType::Anthropic => Self::Anthropic(AnthropicBackend { http }),
        })
    }

    const fn http(&self) -> &HttpSettings {
        match self {
            Self::OpenAi(backend) => &backend.http,
            Self::Anthropic(backend) => &backend.http,
        }
    }

    async fn complete_once(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        match self {
            Self::OpenAi(backend) => backend.complete(request).await,
            Self::Anthropic(backend) => backend.complete(request).await,
        }
    }
}

impl LanguageModel for LlmBackend {
    fn name(&self) -> &str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }

    fn ensure_ready(&self) -> Result<(), ProviderError> {
        if self.http().api_key.is_empty() {
            return Err(ProviderError::NotConfigured(String::from(
                "no API key; set LLM_API_KEY or OPENROUTER_API_KEY",
            )));
        }
        Ok(())
    }

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            let max_retries = self.http().max_retries;
            with_retries(max_retries, || self.complete_once(request)).await
        })
    }
}

impl std::fmt::Debug for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmBackend")
            .field("name", &self.name())
            .field("api_url", &self.http().api_url)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Backoff before retry number `retry` (zero-based).
pub fn backoff(retry: u32) -> Duration {
    BASE_BACKOFF.saturating_mul(2_u32.saturating_pow(retry))
}

/// Run `attempt` until it succeeds, fails permanently, or has been retried
/// `max_retries` times.
pub async fn with_retries<F, Fut>(max_retries: u32, mut attempt: F) -> Result<String, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, ProviderError>>,
{
    let mut retries: u32 = 0;
    loop {
        match attempt().await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() && retries < max_retries => {
                let delay = backoff(retries);
                warn!(
                    error = %e,
                    retry = retries.saturating_add(1),
                    max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "LLM call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                retries = retries.saturating_add(1);
            }
            Err(e) => return Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared HTTP plumbing
// ---------------------------------------------------------------------------

struct HttpSettings {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    max_retries: u32,
    request_timeout: Duration,
}

impl HttpSettings {
    fn new(config: &LlmBackendConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("HTTP client setup failed: {e}")))?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            request_timeout: config.request_timeout,
        })
    }

    fn transport_error(&self, provider: &str, error: &reqwest::Error) -> ProviderError {
        if error.is_timeout() {
            ProviderError::Timeout(self.request_timeout)
        } else {
            ProviderError::Transport(format!("{provider} request failed: {error}"))
        }
    }

    /// Send a prepared request and return the JSON body of a 2xx reply.
    async fn send(
        &self,
        provider: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<serde_json::Value, ProviderError> {
        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(provider, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("unable to read error body: {e}"));
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| {
            ProviderError::MalformedResponse(format!("{provider} response parse failed: {e}"))
        })
    }
}

// ---------------------------------------------------------------------------
// OpenAI-compatible backend
// ---------------------------------------------------------------------------

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions`. `OpenRouter`
/// attribution headers are attached when configured.
pub struct OpenAiBackend {
    http: HttpSettings,
    referer: Option<String>,
    title: Option<String>,
}

impl OpenAiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.http.api_url);
        let body = serde_json::json!({
            "model": request.model,
            "messages": request.messages,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });

        let mut builder = self
            .http
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.http.api_key))
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(referer) = &self.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.title {
            builder = builder.header("X-Title", title);
        }

        let json = self.http.send("OpenAI", builder).await?;
        let text = extract_openai_content(&json)?;
        debug!(model = %request.model, chars = text.len(), "Completion received");
        Ok(text)
    }
}

/// Extract the text content from an `OpenAI` chat completions response.
fn extract_openai_content(json: &serde_json::Value) -> Result<String, ProviderError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| {
            ProviderError::MalformedResponse("missing choices[0].message.content".to_owned())
        })
}

// ---------------------------------------------------------------------------
// Anthropic Messages API backend
// ---------------------------------------------------------------------------

/// Backend for the Anthropic Messages API.
///
/// The system message moves to the top-level `system` field and the
/// reply is read from `content[0].text`.
pub struct AnthropicBackend {
    http: HttpSettings,
}

impl AnthropicBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let url = format!("{}/messages", self.http.api_url);
        let messages: Vec<_> = request
            .messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .collect();
        let body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "system": request.system().unwrap_or_default(),
            "messages": messages,
        });

        let builder = self
            .http
            .client
            .post(&url)
            .header("x-api-key", &self.http.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&body);

        let json = self.http.send("Anthropic", builder).await?;
        extract_anthropic_content(&json)
    }
}

/// Extract the text content from an Anthropic Messages API response.
fn extract_anthropic_content(json: &serde_json::Value) -> Result<String, ProviderError> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|b| b.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or_else(|| ProviderError::MalformedResponse("missing content[0].text".to_owned()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn extract_openai_content_valid() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "go to cafe"}}]
        });
        assert_eq!(extract_openai_content(&json).unwrap(), "go to cafe");
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = serde_json::json!({"error": "rate_limit"});
        let err = extract_openai_content(&json).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn extract_anthropic_content_valid() {
        let json = serde_json::json!({"content": [{"type": "text", "text": "rest at home"}]});
        assert_eq!(extract_anthropic_content(&json).unwrap(), "rest at home");
    }

    #[test]
    fn extract_anthropic_content_missing() {
        let json = serde_json::json!({"content": []});
        assert!(extract_anthropic_content(&json).is_err());
    }

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(0), Duration::from_millis(250));
        assert_eq!(backoff(1), Duration::from_millis(500));
        assert_eq!(backoff(2), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_only_retryable_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&calls);
        let result = with_retries(2, || {
            let n = counted.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ProviderError::Status { status: 503, body: String::new() })
                } else {
                    Ok(String::from("eat"))
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "eat");
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        calls.store(0, Ordering::SeqCst);
        let counted = Arc::clone(&calls);
        let result = with_retries(5, || {
            counted.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Status { status: 401, body: String::from("bad key") }) }
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Status { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counted = Arc::clone(&calls);
        let result = with_retries(1, || {
            counted.fetch_add(1, Ordering::SeqCst);
            async { Err(ProviderError::Transport(String::from("connection reset"))) }
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_key_is_not_ready() {
        let config = LlmBackendConfig::from_lookup(&town_core::config::LlmConfig::default(), |_| None)
            .unwrap();
        let backend = LlmBackend::new(&config).unwrap();
        assert_eq!(backend.name(), "openai-compatible");
        assert!(matches!(backend.ensure_ready(), Err(ProviderError::NotConfigured(_))));
    }
}
