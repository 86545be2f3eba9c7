//! The `Llm` wrapper: identity preamble, one completion per call, and
//! cumulative token accounting.

use crate::config::LlmConfig;
use crate::error::{self, Result};
use crate::provider::{
    ChatMessage, CompletionRequest, CompletionTransport, ProviderTransport, Usage,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::ops::{Add, AddAssign};

const ANONYMOUS_NAME: &str = "Assistant";
const ANONYMOUS_ID: &str = "unassigned";

/// Cumulative token counts for one `Llm` instance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl UsageStats {
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Component-wise sum, or `None` if either counter would overflow
    pub fn checked_add(self, other: Self) -> Option<Self> {
        Some(Self {
            input_tokens: self.input_tokens.checked_add(other.input_tokens)?,
            output_tokens: self.output_tokens.checked_add(other.output_tokens)?,
        })
    }
}

impl From<Usage> for UsageStats {
    fn from(usage: Usage) -> Self {
        Self {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
        }
    }
}

impl Add for UsageStats {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            input_tokens: self.input_tokens.saturating_add(other.input_tokens),
            output_tokens: self.output_tokens.saturating_add(other.output_tokens),
        }
    }
}

impl AddAssign for UsageStats {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

/// Result of one `generate` call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub content: String,
    /// Model name as reported by the backend
    pub model: String,
    /// Tokens spent by this call alone
    pub usage: UsageStats,
}

/// An LLM bound to one configuration and, optionally, one agent identity.
///
/// Every request starts with a system message naming the agent. Token usage
/// is added to the running totals only after a call fully succeeds, so a
/// failed or cancelled call leaves `usage_stats()` untouched.
pub struct Llm<T = ProviderTransport> {
    config: LlmConfig,
    agent_name: Option<String>,
    agent_id: Option<String>,
    transport: T,
    usage: Mutex<UsageStats>,
}

impl Llm<ProviderTransport> {
    /// Create an LLM over the multi-provider HTTP transport
    pub fn new(config: LlmConfig) -> Result<Self> {
        let transport = ProviderTransport::new().map_err(|e| {
            error::Error::unexpected(e.to_string())
                .with_operation("llm::new")
                .set_source(e)
        })?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: CompletionTransport> Llm<T> {
    pub fn with_transport(config: LlmConfig, transport: T) -> Self {
        Self {
            config,
            agent_name: None,
            agent_id: None,
            transport,
            usage: Mutex::new(UsageStats::default()),
        }
    }

    /// Bind this LLM to an agent identity
    pub fn with_identity(mut self, agent_name: impl Into<String>, agent_id: impl Into<String>) -> Self {
        self.agent_name = Some(agent_name.into());
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    pub fn agent_name(&self) -> Option<&str> {
        self.agent_name.as_deref()
    }

    pub fn agent_id(&self) -> Option<&str> {
        self.agent_id.as_deref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The system message that opens every conversation.
    ///
    /// Its content contains the agent name and id verbatim.
    pub fn build_identity_message(&self) -> ChatMessage {
        let name = self.agent_name.as_deref().unwrap_or(ANONYMOUS_NAME);
        let id = self.agent_id.as_deref().unwrap_or(ANONYMOUS_ID);

        ChatMessage::system(format!(
            "You are {name}, an autonomous agent with id {id}.\n\
             Stay in this role for the whole conversation. When asked who you \
             are, answer with your name \"{name}\" and your agent id \"{id}\"."
        ))
    }

    /// Send `conversation_history` (after the identity message) and return
    /// the first choice's content.
    pub async fn generate(&self, conversation_history: &[ChatMessage]) -> Result<GenerationResult> {
        let model = self.config.model();

        let mut messages = Vec::with_capacity(conversation_history.len() + 1);
        messages.push(self.build_identity_message());
        messages.extend_from_slice(conversation_history);

        let request = CompletionRequest {
            model: model.to_string(),
            messages,
            api_key: self.config.api_key().to_string(),
            timeout: self.config.timeout(),
            base_url: self.config.base_url().map(str::to_string),
            extra: self.config.extra().clone(),
        };

        tracing::debug!(
            transport = self.transport.name(),
            model,
            agent_id = self.agent_id.as_deref().unwrap_or(ANONYMOUS_ID),
            messages = request.messages.len(),
            "sending completion request"
        );

        let response = match self.transport.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(model, error = %e, "completion request failed");
                return Err(error::transport_failed(e, model));
            }
        };

        let Some(choice) = response.choices.into_iter().next() else {
            return Err(error::malformed_response("no choices", model));
        };
        let Some(content) = choice.content else {
            return Err(error::malformed_response("first choice has no message content", model));
        };
        let Some(usage) = response.usage else {
            return Err(error::malformed_response("no usage report", model));
        };

        let usage = UsageStats::from(usage);
        let totals = {
            let mut stats = self.usage.lock();
            let Some(totals) = stats.checked_add(usage) else {
                return Err(error::malformed_response("usage counter overflow", model));
            };
            *stats = totals;
            totals
        };

        tracing::debug!(
            model,
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            total_input = totals.input_tokens,
            total_output = totals.output_tokens,
            "completion succeeded"
        );

        Ok(GenerationResult {
            content,
            model: response.model,
            usage,
        })
    }

    /// Snapshot of the cumulative usage
    pub fn usage_stats(&self) -> UsageStats {
        *self.usage.lock()
    }
}

impl<T> std::fmt::Debug for Llm<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Llm")
            .field("config", &self.config)
            .field("agent_name", &self.agent_name)
            .field("agent_id", &self.agent_id)
            .field("usage", &*self.usage.lock())
            .finish_non_exhaustive()
    }
}
