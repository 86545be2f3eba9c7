//! # strigoi-error
//!
//! Unified error handling for the strigoi agent runtime.
//!
//! - **ErrorKind**: what went wrong (e.g. `DuplicateAgent`, `CompletionTransport`)
//! - **ErrorStatus**: whether retrying could help (Permanent, Temporary, Persistent)
//! - **Context**: operation name plus key/value pairs for locating the cause
//! - **Source**: the wrapped underlying error, if any
//!
//! ## Usage
//!
//! ```rust
//! use strigoi_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::UnknownAgent, "agent 'planner' is not registered")
//!         .with_operation("graph::add_edge")
//!         .with_context("agent_id", "planner"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, strigoi_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - An error is handled once; callers further up only append context

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the strigoi Error
pub type Result<T> = std::result::Result<T, Error>;
