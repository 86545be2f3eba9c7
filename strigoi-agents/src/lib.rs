//! # Strigoi Agents
//!
//! Every agent has a name and a unique id, and is discoverable through the
//! agent graph:
//! 1. The caller supplies an `AgentState` (id + name) and an `LlmConfig`
//! 2. Constructing a `BaseAgent` registers the id in an `AgentGraph`
//! 3. Agents can be linked with labelled edges
//! 4. An agent builds its own `Llm`, which carries the agent identity into every request
//!
//! The graph is one process-wide instance by default (`AgentGraph::global()`),
//! or an injected `Arc<AgentGraph>`.

mod agent;
mod graph;

pub use agent::{AgentConfig, AgentState, BaseAgent};
pub use graph::{AgentGraph, AgentNode, Edge};
pub use strigoi_error::{Error, ErrorKind, Result};
