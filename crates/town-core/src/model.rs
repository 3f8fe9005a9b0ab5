//! The language-model collaborator.
//!
//! The core never talks HTTP. It hands a [`CompletionRequest`] to whatever
//! implements [`LanguageModel`] and gets text back. Concrete HTTP backends
//! live in their own crate; [`ScriptedModel`] is an in-process stand-in
//! for tests and offline runs.
//!
//! The trait returns boxed futures so it can be used as
//! `Arc<dyn LanguageModel>` and swapped at construction time.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions framing the conversation.
    System,
    /// The prompt.
    User,
    /// A previous model reply.
    Assistant,
}

/// One message of a chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking.
    pub role: ChatRole,
    /// What is said.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Everything a backend needs to produce one completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier.
    pub model: String,
    /// Ordered conversation.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens in the reply.
    pub max_tokens: u32,
}

impl CompletionRequest {
    /// The system message, if present.
    pub fn system(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
    }

    /// Content of the last message.
    pub fn prompt(&self) -> &str {
        self.messages.last().map_or("", |m| m.content.as_str())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures reported by a language-model backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The backend lacks something it needs, such as an API key.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// The request never produced an HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        body: String,
    },

    /// The response did not contain a completion.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// No answer arrived before the deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Whether trying the same request again could succeed.
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::NotConfigured(_) | Self::MalformedResponse(_) => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Collaborator trait
// ---------------------------------------------------------------------------

/// A source of chat completions.
pub trait LanguageModel: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Fail fast when the backend cannot possibly serve requests.
    ///
    /// Called before the tick loop starts. The default accepts.
    fn ensure_ready(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Produce the assistant reply for `request`.
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<String, ProviderError>>;
}

// ---------------------------------------------------------------------------
// Scripted stand-in
// ---------------------------------------------------------------------------

type Responder = dyn Fn(&CompletionRequest) -> Result<String, ProviderError> + Send + Sync;

/// A language model that answers from a script instead of the network.
///
/// Every request is recorded so tests can inspect prompts afterwards.
pub struct ScriptedModel {
    responder: Box<Responder>,
    queued: Mutex<VecDeque<String>>,
    readiness: Result<(), ProviderError>,
    delay: Duration,
    log: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    /// Answer every request with the result of `responder`.
    pub fn new(
        responder: impl Fn(&CompletionRequest) -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            queued: Mutex::new(VecDeque::new()),
            readiness: Ok(()),
            delay: Duration::ZERO,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Answer every request with the same text.
    pub fn replying(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Answer with the reply of the first rule whose needle occurs in the
    /// prompt, or with `default` when none does.
    pub fn with_rules(rules: &[(&str, &str)], default: &str) -> Self {
        let rules: Vec<(String, String)> = rules
            .iter()
            .map(|(needle, reply)| ((*needle).to_owned(), (*reply).to_owned()))
            .collect();
        let default = default.to_owned();
        Self::new(move |request| {
            let prompt = request.prompt();
            let reply = rules
                .iter()
                .find(|(needle, _)| prompt.contains(needle.as_str()))
                .map_or(&default, |(_, reply)| reply);
            Ok(reply.clone())
        })
    }

    /// Fail every request with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Queue replies that are served, in order, before the script.
    #[must_use]
    pub fn then_script(self, replies: &[&str]) -> Self {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(replies.iter().map(|r| (*r).to_owned()));
        self
    }

    /// Report `reason` from [`LanguageModel::ensure_ready`].
    #[must_use]
    pub fn not_ready(mut self, reason: impl Into<String>) -> Self {
        self.readiness = Err(ProviderError::NotConfigured(reason.into()));
        self
    }

    /// Sleep before answering each request.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn answer(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let queued = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        queued.map_or_else(|| (self.responder)(request), Ok)
    }
}

impl std::fmt::Debug for ScriptedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedModel")
            .field("delay", &self.delay)
            .field("ready", &self.readiness.is_ok())
            .finish_non_exhaustive()
    }
}

impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn ensure_ready(&self) -> Result<(), ProviderError> {
        self.readiness.clone()
    }

    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
    ) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answer(request)
        })
    }
}
