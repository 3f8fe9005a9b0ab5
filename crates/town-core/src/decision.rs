//! Planning and conversation generation.
//!
//! The [`DecisionEngine`] turns a [`Perception`] into a [`Decision`]. It
//! never holds the town lock: every input comes from the perception and
//! every output is returned for the resolution phase to apply.
//!
//! Model failures never stop a tick. A failed plan becomes an
//! `[Error: ...]` placeholder that the interpreter treats as unknown, and
//! a failed conversation becomes a plain greeting.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Semaphore;
use town_types::AgentId;
use tracing::{debug, warn};

use crate::command::{Command, interpret};
use crate::config::LlmConfig;
use crate::model::{ChatMessage, CompletionRequest, LanguageModel, ProviderError};
use crate::perception::Perception;
use crate::prompt::{PromptEngine, PromptError, RenderedPrompt};

/// Errors from asking the model for a plan or an utterance.
#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    /// A prompt template failed to render.
    #[error("prompt error: {source}")]
    Prompt {
        /// The underlying template error.
        #[from]
        source: PromptError,
    },

    /// The model call failed.
    #[error("{source}")]
    Provider {
        /// The underlying provider error.
        #[from]
        source: ProviderError,
    },
}

/// Something one agent says to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Utterance {
    /// Who is addressed.
    pub partner: AgentId,
    /// Their display name at perception time.
    pub partner_name: String,
    /// What is said.
    pub message: String,
}

/// The outcome of one agent's planning phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Who decided.
    pub agent_id: AgentId,
    /// The plan text, possibly a fallback.
    pub plan: String,
    /// What the plan asks the world to do.
    pub command: Command,
    /// Generated speech when the command is a talk with a partner.
    pub utterance: Option<Utterance>,
    /// Whether any model call fell back.
    pub fell_back: bool,
}

/// Text of the plan used when the model cannot produce one.
pub fn fallback_plan(error: &impl std::fmt::Display) -> String {
    format!("[Error: {error}] Default plan: wait around")
}

/// Text said when the model cannot produce a conversation opener.
pub fn fallback_greeting(partner: &str) -> String {
    format!("Hello, {partner}!")
}

/// Asks the language model what agents do and say.
pub struct DecisionEngine {
    model: Arc<dyn LanguageModel>,
    prompts: PromptEngine,
    settings: LlmConfig,
    permits: Semaphore,
    timeout: Duration,
}

impl DecisionEngine {
    /// Build an engine that allows at most `settings.max_concurrent_calls`
    /// model calls in flight.
    pub fn new(model: Arc<dyn LanguageModel>, prompts: PromptEngine, settings: LlmConfig) -> Self {
        let permits = Semaphore::new(settings.max_concurrent_calls.max(1));
        let timeout = Duration::from_millis(settings.decision_timeout_ms);
        Self {
            model,
            prompts,
            settings,
            permits,
            timeout,
        }
    }

    /// The prompt templates in use.
    pub const fn prompts(&self) -> &PromptEngine {
        &self.prompts
    }

    /// The model collaborator.
    pub fn model(&self) -> &dyn LanguageModel {
        self.model.as_ref()
    }

    /// Plan, interpret, and (for talk) generate speech.
    ///
    /// Never fails; errors become fallbacks and are logged.
    pub async fn decide(&self, perception: &Perception) -> Decision {
        match self.plan(perception).await {
            Ok(plan) => {
                let command = interpret(&plan);
                debug!(agent = %perception.name, %plan, ?command, "Agent planned");
                self.follow_through(perception, plan, command).await
            }
            Err(e) => {
                warn!(agent = %perception.name, error = %e, "Planning failed, waiting around");
                Decision {
                    agent_id: perception.agent_id,
                    plan: fallback_plan(&e),
                    command: Command::Unknown,
                    utterance: None,
                    fell_back: true,
                }
            }
        }
    }

    /// Turn an already chosen plan into a decision, generating speech when
    /// the plan is to talk and someone is in range.
    pub async fn follow_through(
        &self,
        perception: &Perception,
        plan: String,
        command: Command,
    ) -> Decision {
        let mut fell_back = false;
        let utterance = match (&command, &perception.partner) {
            (Command::Talk, Some(partner)) => {
                let message = match self.converse(perception).await {
                    Ok(message) => message,
                    Err(e) => {
                        warn!(
                            agent = %perception.name,
                            partner = %partner.name,
                            error = %e,
                            "Conversation failed, greeting instead"
                        );
                        fell_back = true;
                        fallback_greeting(&partner.name)
                    }
                };
                Some(Utterance {
                    partner: partner.id,
                    partner_name: partner.name.clone(),
                    message,
                })
            }
            _ => None,
        };
        Decision {
            agent_id: perception.agent_id,
            plan,
            command,
            utterance,
            fell_back,
        }
    }

    /// Ask the model what the agent does next.
    ///
    /// # Errors
    ///
    /// Returns [`DecisionError`] if the prompt cannot be rendered or the
    /// model call fails or times out.
    pub async fn plan(&self, perception: &Perception) -> Result<String, DecisionError> {
        let prompt = self
            .prompts
            .render_pair("plan_system.j2", "plan_user.j2", perception)?;
        Ok(self.ask(prompt).await?)
    }

    /// Ask the model for a conversation opener addressed to the partner.
    ///
    /// # Errors
    ///
    /// As for [`DecisionEngine::plan`].
    pub async fn converse(&self, perception: &Perception) -> Result<String, DecisionError> {
        let prompt = self
            .prompts
            .render_pair("talk_system.j2", "talk_user.j2", perception)?;
        Ok(self.ask(prompt).await?)
    }

    async fn ask(&self, prompt: RenderedPrompt) -> Result<String, ProviderError> {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            messages: vec![ChatMessage::system(prompt.system), ChatMessage::user(prompt.user)],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        // Closed only on drop, which cannot happen while `self` is borrowed.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let reply = tokio::time::timeout(self.timeout, self.model.complete(&request))
            .await
            .map_err(|_elapsed| ProviderError::Timeout(self.timeout))??;
        Ok(reply.trim().to_owned())
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("model", &self.model.name())
            .field("settings", &self.settings)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
