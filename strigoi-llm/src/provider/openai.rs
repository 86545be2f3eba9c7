//! OpenAI-compatible provider implementation
//!
//! Works with OpenAI and any server speaking the chat completions API
//! (Ollama, vLLM, ...).

use super::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible provider
#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
}

impl OpenAIProvider {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Send `request` for the bare `model` name.
    ///
    /// `request.base_url` wins over `default_base_url`, which wins over the
    /// public OpenAI endpoint.
    pub(crate) async fn complete_model(
        &self,
        model: &str,
        request: CompletionRequest,
        default_base_url: Option<&str>,
    ) -> Result<CompletionResponse, ProviderError> {
        let base_url = request
            .base_url
            .as_deref()
            .or(default_base_url)
            .unwrap_or(OPENAI_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        let api_request = OpenAIRequest::build(model, &request);

        let mut req = self
            .client
            .post(format!("{}/chat/completions", base_url))
            .timeout(request.timeout)
            .json(&api_request);

        if !request.api_key.is_empty() {
            req = req.bearer_auth(&request.api_key);
        }

        let response = req.send().await.map_err(ProviderError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(ProviderError::from_response(response).await);
        }

        let api_response: OpenAIResponse = response.json().await.map_err(ProviderError::from_reqwest)?;

        Ok(api_response.into())
    }
}

impl CompletionTransport for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let model = match request.model.split_once('/') {
            Some((_, name)) => name.to_string(),
            None => request.model.clone(),
        };
        self.complete_model(&model, request, None).await
    }
}

// ============================================================================
// OpenAI API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl<'a> OpenAIRequest<'a> {
    fn build(model: &'a str, request: &'a CompletionRequest) -> Self {
        let mut extra = request.extra.clone();
        // the body fields we own are never overridden by passthrough params
        extra.remove("model");
        extra.remove("messages");

        Self {
            model,
            messages: request
                .messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            extra,
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

impl From<OpenAIResponse> for CompletionResponse {
    fn from(response: OpenAIResponse) -> Self {
        let choices = response
            .choices
            .into_iter()
            .map(|choice| Choice {
                content: choice.message.content,
                finish_reason: match choice.finish_reason.as_deref() {
                    Some("stop") => FinishReason::Stop,
                    Some("length") => FinishReason::Length,
                    Some("content_filter") => FinishReason::ContentFilter,
                    _ => FinishReason::Unknown,
                },
            })
            .collect();

        Self {
            id: response.id,
            model: response.model,
            choices,
            usage: response
                .usage
                .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "openai/gpt-4".into(),
            messages: vec![
                ChatMessage::system("You are TestAgent"),
                ChatMessage::user("Hello"),
            ],
            api_key: "test-key".into(),
            timeout: Duration::from_secs(30),
            base_url: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_request_body() {
        let mut req = request();
        req.extra.insert("temperature".into(), serde_json::json!(0.7));
        req.extra.insert("model".into(), serde_json::json!("ignored"));

        let body = serde_json::to_value(OpenAIRequest::build("gpt-4", &req)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "gpt-4",
                "messages": [
                    {"role": "system", "content": "You are TestAgent"},
                    {"role": "user", "content": "Hello"}
                ],
                "temperature": 0.7
            })
        );
    }

    #[test]
    fn test_parse_response() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4-0613",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Test response"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;

        let response: CompletionResponse =
            serde_json::from_str::<OpenAIResponse>(raw).unwrap().into();
        assert_eq!(response.model, "gpt-4-0613");
        assert_eq!(response.choices, vec![Choice::text("Test response")]);
        assert_eq!(response.usage, Some(Usage::new(10, 5)));
    }

    #[test]
    fn test_parse_response_without_usage_or_choices() {
        let response: CompletionResponse =
            serde_json::from_str::<OpenAIResponse>(r#"{"id": "x"}"#).unwrap().into();
        assert!(response.choices.is_empty());
        assert!(response.usage.is_none());
    }
}
