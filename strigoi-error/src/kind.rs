//! Error kinds for strigoi operations

use std::fmt;

/// The kind of error that occurred.
///
/// Callers match on the kind to decide how to react; the agent graph and the
/// LLM layer each own a small group of kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// An unexpected error occurred - catch-all for unhandled cases
    Unexpected,

    /// The requested feature or provider is not supported
    Unsupported,

    /// Invalid configuration or parameters
    ConfigInvalid,

    // =========================================================================
    // Agent graph errors
    // =========================================================================
    /// An agent with the same id is already registered
    DuplicateAgent,

    /// The referenced agent id is not registered
    UnknownAgent,

    // =========================================================================
    // LLM errors
    // =========================================================================
    /// The completion call failed, timed out, or returned a malformed response
    CompletionTransport,

    // =========================================================================
    // IO / parse errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// IO operation failed
    IoFailed,

    /// Failed to parse input
    ParseFailed,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unexpected => "Unexpected",
            ErrorKind::Unsupported => "Unsupported",
            ErrorKind::ConfigInvalid => "ConfigInvalid",

            ErrorKind::DuplicateAgent => "DuplicateAgent",
            ErrorKind::UnknownAgent => "UnknownAgent",

            ErrorKind::CompletionTransport => "CompletionTransport",

            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::IoFailed => "IoFailed",
            ErrorKind::ParseFailed => "ParseFailed",
        }
    }

    /// Check if this error kind is retryable by default
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::IoFailed)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
