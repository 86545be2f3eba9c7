//! BaseAgent - an identity that is registered in the agent graph

use crate::graph::AgentGraph;
use std::sync::Arc;
use strigoi_error::Result;
use strigoi_llm::{CompletionTransport, Llm, LlmConfig};
use uuid::Uuid;

/// Where an agent's identity comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentState {
    pub agent_id: String,
    pub agent_name: String,
}

impl AgentState {
    /// Identity with a caller-chosen id
    pub fn new(agent_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
        }
    }

    /// Identity with a freshly generated UUID v4 id
    pub fn generated(agent_name: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), agent_name)
    }
}

/// Construction bundle for a `BaseAgent`
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Forwarded untouched to any `Llm` the agent builds
    pub llm_config: LlmConfig,
    pub state: AgentState,
}

impl AgentConfig {
    pub fn new(llm_config: LlmConfig, state: AgentState) -> Self {
        Self { llm_config, state }
    }
}

/// An agent identity registered in an `AgentGraph`.
///
/// Construction registers the id exactly once; a reused id fails with
/// `DuplicateAgent` and no agent is created. Identity is immutable afterwards.
#[derive(Debug)]
pub struct BaseAgent {
    agent_id: String,
    agent_name: String,
    llm_config: LlmConfig,
    graph: Arc<AgentGraph>,
}

impl BaseAgent {
    /// Create an agent registered in the process-wide graph
    pub fn new(config: AgentConfig) -> Result<Self> {
        Self::with_graph(config, AgentGraph::global())
    }

    /// Create an agent registered in `graph`
    pub fn with_graph(config: AgentConfig, graph: Arc<AgentGraph>) -> Result<Self> {
        let AgentConfig { llm_config, state } = config;

        graph
            .register(&state.agent_id, &state.agent_name)
            .map_err(|e| e.with_operation("agent::new"))?;

        tracing::debug!(
            agent_id = %state.agent_id,
            agent_name = %state.agent_name,
            model = llm_config.model(),
            "agent created"
        );

        Ok(Self {
            agent_id: state.agent_id,
            agent_name: state.agent_name,
            llm_config,
            graph,
        })
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn llm_config(&self) -> &LlmConfig {
        &self.llm_config
    }

    /// The graph this agent is registered in
    pub fn graph(&self) -> &Arc<AgentGraph> {
        &self.graph
    }

    /// Build an `Llm` speaking as this agent over the default HTTP transport
    pub fn llm(&self) -> Result<Llm> {
        Ok(Llm::new(self.llm_config.clone())?.with_identity(&self.agent_name, &self.agent_id))
    }

    /// Build an `Llm` speaking as this agent over `transport`
    pub fn llm_with_transport<T: CompletionTransport>(&self, transport: T) -> Llm<T> {
        Llm::with_transport(self.llm_config.clone(), transport)
            .with_identity(&self.agent_name, &self.agent_id)
    }

    /// Record `relation` from this agent to `target_id`
    pub fn link_to(&self, target_id: &str, relation: &str) -> Result<()> {
        self.graph.add_edge(&self.agent_id, target_id, relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use strigoi_error::ErrorKind;
    use strigoi_llm::{
        ChatMessage, Choice, CompletionRequest, CompletionResponse, ProviderError, Usage,
    };

    fn agent_config(id: &str, name: &str) -> AgentConfig {
        AgentConfig::new(
            LlmConfig::new("openai/gpt-4", "test-key").with_timeout(Duration::from_secs(30)),
            AgentState::new(id, name),
        )
    }

    #[test]
    fn test_initialization() {
        let graph = Arc::new(AgentGraph::new());
        let agent = BaseAgent::with_graph(agent_config("test-agent-id", "TestAgent"), graph).unwrap();

        assert_eq!(agent.agent_name(), "TestAgent");
        assert_eq!(agent.agent_id(), "test-agent-id");
        assert_eq!(agent.llm_config().model(), "openai/gpt-4");
    }

    #[test]
    fn test_registers_in_graph() {
        let graph = Arc::new(AgentGraph::new());
        BaseAgent::with_graph(agent_config("test-agent-id", "TestAgent"), graph.clone()).unwrap();

        assert!(graph.contains("test-agent-id"));
        assert_eq!(graph.lookup("test-agent-id").unwrap().agent_name, "TestAgent");
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_reused_id_fails() {
        let graph = Arc::new(AgentGraph::new());
        let _first = BaseAgent::with_graph(agent_config("dup", "First"), graph.clone()).unwrap();

        let err = BaseAgent::with_graph(agent_config("dup", "Second"), graph.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateAgent);
        assert_eq!(err.operation(), "agent::new");
        assert_eq!(graph.lookup("dup").unwrap().agent_name, "First");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = AgentState::generated("Worker");
        let b = AgentState::generated("Worker");
        assert_ne!(a.agent_id, b.agent_id);
        assert!(Uuid::parse_str(&a.agent_id).is_ok());
    }

    #[test]
    fn test_default_graph_is_global() {
        let state = AgentState::generated("GlobalAgent");
        let id = state.agent_id.clone();
        let agent = BaseAgent::new(AgentConfig::new(LlmConfig::new("openai/gpt-4", "k"), state)).unwrap();

        assert!(Arc::ptr_eq(agent.graph(), &AgentGraph::global()));
        assert!(AgentGraph::global().contains(&id));
        AgentGraph::global().deregister(&id).unwrap();
    }

    #[test]
    fn test_link_to() {
        let graph = Arc::new(AgentGraph::new());
        let lead = BaseAgent::with_graph(agent_config("lead", "Lead"), graph.clone()).unwrap();
        let _scout = BaseAgent::with_graph(agent_config("scout", "Scout"), graph.clone()).unwrap();

        lead.link_to("scout", "delegates_to").unwrap();
        let err = lead.link_to("nobody", "delegates_to").unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UnknownAgent);
        assert_eq!(graph.edges_from("lead").len(), 1);
        assert_eq!(graph.edges()[0].target, "scout");
    }

    struct Echo;

    impl CompletionTransport for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ProviderError> {
            // reply with the identity preamble so the test can inspect it
            Ok(CompletionResponse {
                id: "echo".into(),
                model: request.model.clone(),
                choices: vec![Choice::text(request.messages[0].content.clone())],
                usage: Some(Usage::new(10, 5)),
            })
        }
    }

    #[tokio::test]
    async fn test_agent_llm_carries_identity() {
        let graph = Arc::new(AgentGraph::new());
        let agent = BaseAgent::with_graph(agent_config("test-id", "TestAgent"), graph).unwrap();
        let llm = agent.llm_with_transport(Echo);

        assert_eq!(llm.agent_id(), Some("test-id"));
        assert_eq!(llm.config(), agent.llm_config());

        let reply = llm.generate(&[ChatMessage::user("Hello")]).await.unwrap();
        assert!(reply.content.contains("TestAgent"));
        assert!(reply.content.contains("test-id"));
        assert_eq!(llm.usage_stats().input_tokens, 10);
        assert_eq!(llm.usage_stats().output_tokens, 5);
    }
}
