//! # Completion transports
//!
//! `CompletionTransport` is the seam between the `Llm` wrapper and whatever
//! produces completions. Production code uses `ProviderTransport`, which
//! routes on the provider prefix of the model name:
//!
//! | prefix             | backend                                   |
//! |--------------------|-------------------------------------------|
//! | `openai` or none   | OpenAI chat completions                   |
//! | `anthropic`        | Anthropic messages API                    |
//! | `ollama`, `local`  | OpenAI-compatible server at `base_url`    |

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAIProvider;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:11434/v1";

// ============================================================================
// Core Types
// ============================================================================

/// One entry of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Everything a transport needs for one completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Full model identifier, provider prefix included
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub api_key: String,
    pub timeout: Duration,
    pub base_url: Option<String>,
    /// Provider-specific parameters, copied into the request body
    pub extra: Map<String, Value>,
}

/// What a transport returns; validated by the caller
#[derive(Debug, Clone, Default)]
pub struct CompletionResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub content: Option<String>,
    pub finish_reason: FinishReason,
}

impl Choice {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: FinishReason::Stop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Unknown,
}

/// Token counts reported for one call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

// ============================================================================
// Transport Trait
// ============================================================================

/// Error type for transport operations
#[derive(Debug)]
pub enum ProviderError {
    /// Network/connection error
    Network(String),
    /// The request exceeded its timeout
    Timeout,
    /// API returned an error
    Api { status: u16, message: String },
    /// Failed to parse response
    Parse(String),
    /// Rate limited
    RateLimited { retry_after: Option<u64> },
    /// Invalid request, e.g. an unknown provider prefix
    InvalidRequest(String),
    /// Authentication failed
    AuthenticationFailed,
    /// Other error
    Other(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout | Self::RateLimited { .. }
        )
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Map a non-success HTTP response onto an error
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let message = response.text().await.unwrap_or_default();

        match status {
            401 | 403 => Self::AuthenticationFailed,
            429 => Self::RateLimited { retry_after },
            _ => Self::Api { status, message },
        }
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "Network error: {}", e),
            Self::Timeout => write!(f, "Request timed out"),
            Self::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Self::Parse(e) => write!(f, "Parse error: {}", e),
            Self::RateLimited { retry_after } => {
                write!(f, "Rate limited")?;
                if let Some(secs) = retry_after {
                    write!(f, " (retry after {}s)", secs)?;
                }
                Ok(())
            }
            Self::InvalidRequest(e) => write!(f, "Invalid request: {}", e),
            Self::AuthenticationFailed => write!(f, "Authentication failed"),
            Self::Other(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

/// A backend that turns a conversation into a completion.
///
/// Implementations apply `request.timeout` themselves and report expiry as
/// `ProviderError::Timeout`.
#[allow(async_fn_in_trait)]
pub trait CompletionTransport: Send + Sync {
    /// Short name for logs (e.g. "openai")
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;
}

impl<T: CompletionTransport> CompletionTransport for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        (**self).complete(request).await
    }
}

// ============================================================================
// Multi-provider routing
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Local,
}

impl ProviderKind {
    /// Split `"<provider>/<model>"` into the provider and the bare model name.
    ///
    /// A model without a prefix is treated as OpenAI.
    pub fn resolve(model: &str) -> Result<(Self, &str), ProviderError> {
        let Some((prefix, name)) = model.split_once('/') else {
            return Ok((ProviderKind::OpenAI, model));
        };

        let kind = match prefix.to_ascii_lowercase().as_str() {
            "openai" => ProviderKind::OpenAI,
            "anthropic" => ProviderKind::Anthropic,
            "ollama" | "local" => ProviderKind::Local,
            other => {
                return Err(ProviderError::InvalidRequest(format!(
                    "unsupported provider '{}' in model '{}'",
                    other, model
                )))
            }
        };
        Ok((kind, name))
    }
}

/// The production transport: one shared HTTP client, dispatching on the
/// model's provider prefix.
#[derive(Debug, Clone)]
pub struct ProviderTransport {
    openai: OpenAIProvider,
    anthropic: AnthropicProvider,
}

impl ProviderTransport {
    pub fn new() -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            openai: OpenAIProvider::new(client.clone()),
            anthropic: AnthropicProvider::new(client),
        })
    }
}

impl CompletionTransport for ProviderTransport {
    fn name(&self) -> &str {
        "provider"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let (kind, model) = ProviderKind::resolve(&request.model)?;
        let model = model.to_string();

        tracing::debug!(provider = ?kind, model = %model, "routing completion request");

        match kind {
            ProviderKind::OpenAI => self.openai.complete_model(&model, request, None).await,
            ProviderKind::Local => {
                self.openai
                    .complete_model(&model, request, Some(DEFAULT_LOCAL_BASE_URL))
                    .await
            }
            ProviderKind::Anthropic => self.anthropic.complete_model(&model, request).await,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
