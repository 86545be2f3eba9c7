//! Anthropic Claude provider implementation

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u64 = 4096;

/// Anthropic Claude provider
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: Client,
}

impl AnthropicProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub(crate) async fn complete_model(
        &self,
        model: &str,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        if request.api_key.is_empty() {
            return Err(ProviderError::AuthenticationFailed);
        }

        let base_url = request
            .base_url
            .as_deref()
            .unwrap_or(ANTHROPIC_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        let api_request = AnthropicRequest::build(model, &request);

        let response = self
            .client
            .post(format!("{}/messages", base_url))
            .timeout(request.timeout)
            .header("x-api-key", &request.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&api_request)
            .send()
            .await
            .map_err(ProviderError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let api_response: AnthropicResponse =
            response.json().await.map_err(ProviderError::from_reqwest)?;

        Ok(api_response.into())
    }
}

impl CompletionTransport for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let model = match request.model.split_once('/') {
            Some((_, name)) => name.to_string(),
            None => request.model.clone(),
        };
        self.complete_model(&model, request).await
    }
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl<'a> AnthropicRequest<'a> {
    /// System messages are lifted into the top-level `system` field, joined
    /// in order; `max_tokens` may come from the passthrough params.
    fn build(model: &'a str, request: &'a CompletionRequest) -> Self {
        let mut extra = request.extra.clone();
        extra.remove("model");
        extra.remove("messages");
        extra.remove("system");
        let max_tokens = extra
            .remove("max_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let messages = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| AnthropicMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect();

        Self {
            model,
            max_tokens,
            system: if system.is_empty() {
                None
            } else {
                Some(system.join("\n\n"))
            },
            messages,
            extra,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

impl From<AnthropicResponse> for CompletionResponse {
    /// Anthropic returns one message of content blocks; its text blocks
    /// become the single choice.
    fn from(response: AnthropicResponse) -> Self {
        let text: String = response
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect();

        let finish_reason = match response.stop_reason.as_deref() {
            Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            Some("max_tokens") => FinishReason::Length,
            _ => FinishReason::Unknown,
        };

        let choices = if response.content.is_empty() {
            Vec::new()
        } else {
            vec![Choice {
                content: if text.is_empty() { None } else { Some(text) },
                finish_reason,
            }]
        };

        Self {
            id: response.id,
            model: response.model,
            choices,
            usage: response
                .usage
                .map(|u| Usage::new(u.input_tokens, u.output_tokens)),
        }
    }
}
