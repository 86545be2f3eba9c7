//! The agent graph: which agents exist and how they relate

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use strigoi_error::{Error, Result};

static GLOBAL_GRAPH: OnceLock<Arc<AgentGraph>> = OnceLock::new();

/// One registered agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentNode {
    pub agent_id: String,
    pub agent_name: String,
}

/// A directed, labelled relation between two registered agents
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub relation: String,
}

#[derive(Debug, Default)]
struct GraphState {
    nodes: HashMap<String, AgentNode>,
    edges: Vec<Edge>,
}

/// Registry of live agents and the edges between them.
///
/// One mutex guards nodes and edges together, so every operation sees a
/// consistent graph. Edge endpoints always reference registered nodes.
#[derive(Debug, Default)]
pub struct AgentGraph {
    state: Mutex<GraphState>,
}

impl AgentGraph {
    /// Create an empty, independent graph
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide graph, created empty on first use
    pub fn global() -> Arc<AgentGraph> {
        GLOBAL_GRAPH
            .get_or_init(|| Arc::new(AgentGraph::new()))
            .clone()
    }

    /// Add a node. Fails with `DuplicateAgent` if the id is taken.
    pub fn register(&self, agent_id: &str, agent_name: &str) -> Result<AgentNode> {
        let mut state = self.state.lock();
        if state.nodes.contains_key(agent_id) {
            return Err(Error::duplicate_agent(agent_id)
                .with_operation("graph::register")
                .with_context("agent_name", agent_name));
        }

        let node = AgentNode {
            agent_id: agent_id.to_string(),
            agent_name: agent_name.to_string(),
        };
        state.nodes.insert(node.agent_id.clone(), node.clone());

        tracing::debug!(agent_id, agent_name, nodes = state.nodes.len(), "agent registered");
        Ok(node)
    }

    /// Append an edge. Both endpoints must be registered.
    pub fn add_edge(&self, source_id: &str, target_id: &str, relation: &str) -> Result<()> {
        let mut state = self.state.lock();
        for endpoint in [source_id, target_id] {
            if !state.nodes.contains_key(endpoint) {
                return Err(Error::unknown_agent(endpoint)
                    .with_operation("graph::add_edge")
                    .with_context("relation", relation));
            }
        }

        state.edges.push(Edge {
            source: source_id.to_string(),
            target: target_id.to_string(),
            relation: relation.to_string(),
        });

        tracing::debug!(source = source_id, target = target_id, relation, "edge added");
        Ok(())
    }

    pub fn lookup(&self, agent_id: &str) -> Result<AgentNode> {
        self.state
            .lock()
            .nodes
            .get(agent_id)
            .cloned()
            .ok_or_else(|| Error::unknown_agent(agent_id).with_operation("graph::lookup"))
    }

    /// Remove a node together with every edge that touches it
    pub fn deregister(&self, agent_id: &str) -> Result<AgentNode> {
        let mut state = self.state.lock();
        let node = state
            .nodes
            .remove(agent_id)
            .ok_or_else(|| Error::unknown_agent(agent_id).with_operation("graph::deregister"))?;

        let before = state.edges.len();
        state
            .edges
            .retain(|edge| edge.source != agent_id && edge.target != agent_id);

        tracing::debug!(
            agent_id,
            edges_removed = before - state.edges.len(),
            "agent deregistered"
        );
        Ok(node)
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.state.lock().nodes.contains_key(agent_id)
    }

    pub fn len(&self) -> usize {
        self.state.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().nodes.is_empty()
    }

    /// Snapshot of all nodes, sorted by id
    pub fn nodes(&self) -> Vec<AgentNode> {
        let mut nodes: Vec<AgentNode> = self.state.lock().nodes.values().cloned().collect();
        nodes.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        nodes
    }

    /// Snapshot of all edges in insertion order
    pub fn edges(&self) -> Vec<Edge> {
        self.state.lock().edges.clone()
    }

    /// Outgoing edges of one agent, in insertion order
    pub fn edges_from(&self, agent_id: &str) -> Vec<Edge> {
        self.state
            .lock()
            .edges
            .iter()
            .filter(|edge| edge.source == agent_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strigoi_error::ErrorKind;

    #[test]
    fn test_register_and_lookup() {
        let graph = AgentGraph::new();
        graph.register("a", "Alpha").unwrap();
        graph.register("b", "Beta").unwrap();

        assert_eq!(graph.lookup("a").unwrap().agent_name, "Alpha");
        assert_eq!(graph.lookup("b").unwrap().agent_name, "Beta");
        assert_eq!(graph.len(), 2);
        assert!(!graph.is_empty());
    }

    #[test]
    fn test_register_duplicate_id() {
        let graph = AgentGraph::new();
        graph.register("a", "Alpha").unwrap();

        let err = graph.register("a", "Other").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateAgent);
        assert_eq!(err.context_value("agent_id"), Some("a"));
        // the original node is untouched
        assert_eq!(graph.lookup("a").unwrap().agent_name, "Alpha");
    }

    #[test]
    fn test_names_need_not_be_unique() {
        let graph = AgentGraph::new();
        graph.register("a", "Worker").unwrap();
        graph.register("b", "Worker").unwrap();
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_lookup_unknown() {
        let graph = AgentGraph::new();
        let err = graph.lookup("ghost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownAgent);
    }

    #[test]
    fn test_edges_keep_insertion_order() {
        let graph = AgentGraph::new();
        for id in ["a", "b", "c"] {
            graph.register(id, id).unwrap();
        }
        graph.add_edge("a", "b", "delegates_to").unwrap();
        graph.add_edge("c", "a", "reports_to").unwrap();
        graph.add_edge("a", "c", "delegates_to").unwrap();

        let relations: Vec<(String, String)> = graph
            .edges()
            .into_iter()
            .map(|e| (e.source, e.target))
            .collect();
        assert_eq!(
            relations,
            vec![
                ("a".to_string(), "b".to_string()),
                ("c".to_string(), "a".to_string()),
                ("a".to_string(), "c".to_string()),
            ]
        );
        assert_eq!(graph.edges_from("a").len(), 2);
    }

    #[test]
    fn test_add_edge_unknown_endpoint() {
        let graph = AgentGraph::new();
        graph.register("a", "Alpha").unwrap();

        let err = graph.add_edge("a", "ghost", "delegates_to").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownAgent);
        assert_eq!(err.context_value("agent_id"), Some("ghost"));

        let err = graph.add_edge("ghost", "a", "delegates_to").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownAgent);
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_deregister_cascades_edges() {
        let graph = AgentGraph::new();
        for id in ["a", "b", "c"] {
            graph.register(id, id).unwrap();
        }
        graph.add_edge("a", "b", "x").unwrap();
        graph.add_edge("b", "c", "y").unwrap();
        graph.add_edge("c", "a", "z").unwrap();

        let removed = graph.deregister("b").unwrap();
        assert_eq!(removed.agent_id, "b");
        assert!(!graph.contains("b"));
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edges()[0].relation, "z");

        // the id is free again
        graph.register("b", "Beta again").unwrap();

        let err = graph.deregister("ghost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownAgent);
    }

    #[test]
    fn test_nodes_sorted_snapshot() {
        let graph = AgentGraph::new();
        graph.register("z", "Zed").unwrap();
        graph.register("m", "Em").unwrap();

        let ids: Vec<String> = graph.nodes().into_iter().map(|n| n.agent_id).collect();
        assert_eq!(ids, vec!["m", "z"]);
    }

    #[test]
    fn test_concurrent_registration() {
        let graph = Arc::new(AgentGraph::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let graph = Arc::clone(&graph);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        graph.register(&format!("t{}-{}", t, i), "worker").unwrap();
                    }
                    // every thread also races on one shared id
                    graph.register("shared", "contended").is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(graph.len(), 8 * 50 + 1);
    }

    #[test]
    fn test_global_is_shared() {
        let id = format!("global-{}", uuid::Uuid::new_v4());
        AgentGraph::global().register(&id, "Global").unwrap();
        assert!(AgentGraph::global().contains(&id));
        AgentGraph::global().deregister(&id).unwrap();
    }

    #[test]
    fn test_serialize_edge() {
        let edge = Edge {
            source: "a".into(),
            target: "b".into(),
            relation: "delegates_to".into(),
        };
        assert_eq!(
            serde_json::to_value(&edge).unwrap(),
            serde_json::json!({"source": "a", "target": "b", "relation": "delegates_to"})
        );
    }
}
