//! Graph model: nodes, edges and structural validation.
//!
//! A [`Graph`] is owned by the caller. The engine borrows it for the
//! duration of a run and never mutates it.
//!
//! # Example
//!
//! ```
//! use stepgraph::graph::{EdgeDesc, Graph, NodeDesc};
//!
//! let graph = Graph::new()
//!     .with_id("g1")
//!     .with_node(NodeDesc::new("in", "input").with_param("value", 3))
//!     .with_node(NodeDesc::new("d", "dense").with_param("weight", 2))
//!     .with_edge(EdgeDesc::new("in", "d"));
//!
//! assert!(graph.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;

use crate::types::{NodeId, Params, PortName, Value, DEFAULT_PORT};

/// Structural errors detected before any timestep runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("graph has no nodes")]
    Empty,

    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("edge {from} -> {to} references undeclared node {missing}")]
    DanglingEdge {
        from: NodeId,
        to: NodeId,
        missing: NodeId,
    },

    #[error("nodes blocked by a cycle: {}", .unscheduled.join(", "))]
    Cycle { unscheduled: Vec<NodeId> },
}

/// Static description of a node in the graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeDesc {
    /// Unique identifier for this node
    pub id: NodeId,
    /// Registry key of the handler that computes this node
    #[serde(rename = "type")]
    pub node_type: String,
    /// Parameters handed to the handler on every invocation
    #[serde(default)]
    pub params: Params,
}

impl NodeDesc {
    /// Creates a new `NodeDesc` with no parameters.
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            params: Params::new(),
        }
    }

    /// Adds a parameter to this node description.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A directed data dependency between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDesc {
    /// Producer node
    pub from: NodeId,
    /// Consumer node
    pub to: NodeId,
    /// Output port on the producer (defaults to [`DEFAULT_PORT`])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_port: Option<PortName>,
    /// Input port on the consumer (defaults to the producer's id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_port: Option<PortName>,
}

impl EdgeDesc {
    /// Creates an edge between the default ports of two nodes.
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            from_port: None,
            to_port: None,
        }
    }

    /// Reads from a named output port of the producer.
    pub fn from_port(mut self, port: impl Into<PortName>) -> Self {
        self.from_port = Some(port.into());
        self
    }

    /// Delivers into a named input port of the consumer.
    pub fn to_port(mut self, port: impl Into<PortName>) -> Self {
        self.to_port = Some(port.into());
        self
    }

    /// The producer port this edge reads.
    pub fn source_port(&self) -> &str {
        self.from_port.as_deref().unwrap_or(DEFAULT_PORT)
    }

    /// The consumer port this edge writes.
    ///
    /// Unlabeled inputs are keyed by the producer's id so that several of
    /// them stay distinguishable.
    pub fn target_port(&self) -> &str {
        self.to_port.as_deref().unwrap_or(&self.from)
    }
}

/// A set of nodes and the edges between them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    /// Caller-owned identifier used to correlate results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Nodes in declaration order
    #[serde(default)]
    pub nodes: Vec<NodeDesc>,
    /// Edges in declaration order
    #[serde(default)]
    pub edges: Vec<EdgeDesc>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the graph identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Appends a node.
    pub fn with_node(mut self, node: NodeDesc) -> Self {
        self.nodes.push(node);
        self
    }

    /// Appends an edge.
    pub fn with_edge(mut self, edge: EdgeDesc) -> Self {
        self.edges.push(edge);
        self
    }

    /// Finds a node by id.
    pub fn node(&self, id: &str) -> Option<&NodeDesc> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Iterates over the edges whose consumer is `id`.
    pub fn incoming_edges<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a EdgeDesc> + 'a {
        self.edges.iter().filter(move |e| e.to == id)
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Checks everything that can be checked without ordering the graph.
    ///
    /// Cycles are left to the scheduler.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }

        for edge in &self.edges {
            for endpoint in [&edge.from, &edge.to] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(GraphError::DanglingEdge {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Derives a stable identifier from the graph's content.
    ///
    /// Returns the first 12 hex digits of the SHA-256 of the canonical JSON
    /// encoding. Useful as a correlation key when the caller set no `id`.
    pub fn content_id(&self) -> Result<String, serde_json::Error> {
        let raw = serde_json::to_vec(self)?;
        let digest = Sha256::digest(&raw);
        Ok(digest
            .iter()
            .take(6)
            .map(|b| format!("{:02x}", b))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Graph {
        Graph::new()
            .with_node(NodeDesc::new("a", "input"))
            .with_node(NodeDesc::new("b", "dense"))
            .with_edge(EdgeDesc::new("a", "b"))
    }

    #[test]
    fn test_node_desc_params() {
        let node = NodeDesc::new("d", "dense")
            .with_param("weight", 2)
            .with_param("bias", 1.5);

        assert_eq!(node.id, "d");
        assert_eq!(node.node_type, "dense");
        assert_eq!(node.params["weight"], 2);
        assert_eq!(node.params["bias"], 1.5);
    }

    #[test]
    fn test_edge_default_ports() {
        let edge = EdgeDesc::new("a", "b");
        assert_eq!(edge.source_port(), DEFAULT_PORT);
        assert_eq!(edge.target_port(), "a");

        let edge = EdgeDesc::new("a", "b").from_port("h").to_port("x");
        assert_eq!(edge.source_port(), "h");
        assert_eq!(edge.target_port(), "x");
    }

    #[test]
    fn test_validate_ok() {
        assert!(chain().validate().is_ok());
    }

    #[test]
    fn test_validate_empty() {
        assert_eq!(Graph::new().validate(), Err(GraphError::Empty));
    }

    #[test]
    fn test_validate_duplicate_node() {
        let graph = chain().with_node(NodeDesc::new("a", "input"));
        assert_eq!(
            graph.validate(),
            Err(GraphError::DuplicateNode("a".to_string()))
        );
    }

    #[test]
    fn test_validate_dangling_edge() {
        let graph = chain().with_edge(EdgeDesc::new("b", "ghost"));
        match graph.validate() {
            Err(GraphError::DanglingEdge { missing, .. }) => assert_eq!(missing, "ghost"),
            other => panic!("Expected DanglingEdge, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_accepts_shared_input_port() {
        // Both edges land on b's input port "a"; the engine keeps the last.
        let graph = chain().with_edge(EdgeDesc::new("a", "b").from_port("other"));
        assert!(graph.validate().is_ok());
    }

    #[test]
    fn test_cycle_message_lists_blocked_nodes() {
        let err = GraphError::Cycle {
            unscheduled: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "nodes blocked by a cycle: a, b");
    }

    #[test]
    fn test_graph_deserialization() {
        let json = r#"{
            "id": "g1",
            "nodes": [
                {"id": "in", "type": "input", "params": {"value": 3}},
                {"id": "d", "type": "dense"}
            ],
            "edges": [{"from": "in", "to": "d"}]
        }"#;

        let graph: Graph = serde_json::from_str(json).unwrap();
        assert_eq!(graph.id.as_deref(), Some("g1"));
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.node("d").unwrap().params.is_empty());
        assert_eq!(graph.incoming_edges("d").count(), 1);
    }

    #[test]
    fn test_content_id_is_stable() {
        let a = chain().content_id().unwrap();
        let b = chain().content_id().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);

        let c = chain().with_id("x").content_id().unwrap();
        assert_ne!(a, c);
    }
}
