//! LLM error helpers
//!
//! Re-exports strigoi-error and maps provider failures onto it.

pub use strigoi_error::{Error, ErrorKind, ErrorStatus, Result};

use crate::provider::ProviderError;

/// Wrap a transport failure as a `CompletionTransport` error.
///
/// Network failures, timeouts and rate limiting are temporary; everything
/// else is permanent.
pub fn transport_failed(err: ProviderError, model: &str) -> Error {
    let status = if err.is_retryable() {
        ErrorStatus::Temporary
    } else {
        ErrorStatus::Permanent
    };

    Error::completion_transport(err.to_string())
        .with_status(status)
        .with_operation("llm::generate")
        .with_context("model", model)
        .set_source(err)
}

/// The transport answered, but not in the expected shape
pub fn malformed_response(reason: impl Into<String>, model: &str) -> Error {
    let reason = reason.into();
    Error::completion_transport(format!("malformed completion response: {}", reason))
        .with_operation("llm::generate")
        .with_context("model", model)
        .with_context("reason", reason)
}
