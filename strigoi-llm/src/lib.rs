//! # Strigoi LLM
//!
//! Turns a conversation into a single assistant reply through a pluggable
//! completion transport, while keeping cumulative token counts.
//!
//! ## Core Concepts
//! - **LlmConfig**: model (`"<provider>/<model>"`), credential, timeout, passthrough params
//! - **CompletionTransport**: trait-based access to a completion backend
//! - **ProviderTransport**: routes a request to OpenAI, Anthropic or a local server
//! - **Llm**: prepends the identity message, calls the transport, accumulates usage

pub mod config;
pub mod error;
pub mod llm;
pub mod provider;

pub use config::LlmConfig;
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use llm::{GenerationResult, Llm, UsageStats};
pub use provider::{
    AnthropicProvider, ChatMessage, Choice, CompletionRequest, CompletionResponse,
    CompletionTransport, FinishReason, OpenAIProvider, ProviderError, ProviderKind,
    ProviderTransport, Role, Usage,
};
