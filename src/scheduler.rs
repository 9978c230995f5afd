//! Topological scheduling of a graph into a per-timestep execution order.
//!
//! The order is computed once per run and reused for every timestep.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::graph::{Graph, GraphError};
use crate::types::NodeId;

/// A deterministic node ordering consistent with every edge.
///
/// Every node appears exactly once, and for every edge `a -> b`,
/// `a` precedes `b`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOrder {
    order: Vec<NodeId>,
}

impl ExecutionOrder {
    pub(crate) fn from_indices(graph: &Graph, indices: &[usize]) -> Self {
        Self {
            order: indices.iter().map(|&i| graph.nodes[i].id.clone()).collect(),
        }
    }

    /// Node ids in execution order.
    pub fn as_slice(&self) -> &[NodeId] {
        &self.order
    }

    /// Iterates over node ids in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.order.iter()
    }

    /// Position of a node in the order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.order.iter().position(|n| n == id)
    }

    /// Returns the number of scheduled nodes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Consumes the order, returning the ids.
    pub fn into_vec(self) -> Vec<NodeId> {
        self.order
    }
}

/// Computes execution orders with Kahn's algorithm.
///
/// Among several ready nodes the one declared first in the graph runs
/// first, which keeps runs reproducible.
#[derive(Clone, Copy, Debug, Default)]
pub struct Scheduler;

impl Scheduler {
    /// Validates `graph` and orders its nodes.
    ///
    /// # Errors
    /// Any [`GraphError`] from [`Graph::validate`], or
    /// [`GraphError::Cycle`] if some nodes can never become ready.
    pub fn schedule(graph: &Graph) -> Result<ExecutionOrder, GraphError> {
        let indices = Self::schedule_indices(graph)?;
        Ok(ExecutionOrder::from_indices(graph, &indices))
    }

    /// Same as [`schedule`](Self::schedule), returning positions into
    /// `graph.nodes` instead of ids.
    pub(crate) fn schedule_indices(graph: &Graph) -> Result<Vec<usize>, GraphError> {
        graph.validate()?;

        let index: HashMap<&str, usize> = graph
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        // Edge: from -> to (from must execute before to)
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); graph.nodes.len()];
        let mut in_degree: Vec<usize> = vec![0; graph.nodes.len()];

        for edge in &graph.edges {
            // validate() guarantees both endpoints exist
            let (Some(&from), Some(&to)) =
                (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
            else {
                continue;
            };
            successors[from].push(to);
            in_degree[to] += 1;
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(graph.nodes.len());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for &next in &successors[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() != graph.nodes.len() {
            let unscheduled = graph
                .nodes
                .iter()
                .enumerate()
                .filter(|(i, _)| in_degree[*i] > 0)
                .map(|(_, n)| n.id.clone())
                .collect();
            return Err(GraphError::Cycle { unscheduled });
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeDesc, NodeDesc};

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> Graph {
        let mut g = Graph::new();
        for id in nodes {
            g = g.with_node(NodeDesc::new(*id, "input"));
        }
        for (from, to) in edges {
            g = g.with_edge(EdgeDesc::new(*from, *to));
        }
        g
    }

    #[test]
    fn test_topological_sort_linear() {
        let g = graph(&["c", "b", "a"], &[("a", "b"), ("b", "c")]);
        let order = Scheduler::schedule(&g).unwrap();
        assert_eq!(order.as_slice(), ["a", "b", "c"]);
    }

    #[test]
    fn test_topological_sort_diamond() {
        //   a
        //  / \
        // b   c
        //  \ /
        //   d
        let g = graph(
            &["a", "b", "c", "d"],
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
        );
        let order = Scheduler::schedule(&g).unwrap();
        assert_eq!(order.as_slice(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_declaration_order_tie_break() {
        let g = graph(&["z", "y", "x"], &[]);
        let order = Scheduler::schedule(&g).unwrap();
        assert_eq!(order.as_slice(), ["z", "y", "x"]);

        // A node declared early but unlocked late still yields to the
        // earliest ready node at each step.
        let g = graph(&["s", "late", "t", "u"], &[("s", "late"), ("t", "u")]);
        let order = Scheduler::schedule(&g).unwrap();
        assert_eq!(order.as_slice(), ["s", "late", "t", "u"]);
    }

    #[test]
    fn test_topological_sort_cycle_detection() {
        let g = graph(&["a", "b", "c"], &[("a", "b"), ("b", "a")]);
        match Scheduler::schedule(&g) {
            Err(GraphError::Cycle { unscheduled }) => {
                assert_eq!(unscheduled, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("Expected Cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let g = graph(&["a"], &[("a", "a")]);
        assert!(matches!(
            Scheduler::schedule(&g),
            Err(GraphError::Cycle { .. })
        ));
    }

    #[test]
    fn test_dangling_edge_rejected() {
        let g = graph(&["a"], &[("a", "missing")]);
        assert!(matches!(
            Scheduler::schedule(&g),
            Err(GraphError::DanglingEdge { .. })
        ));
    }

    #[test]
    fn test_order_accessors() {
        let g = graph(&["a", "b"], &[("a", "b")]);
        let order = Scheduler::schedule(&g).unwrap();
        assert_eq!(order.len(), 2);
        assert!(!order.is_empty());
        assert_eq!(order.position("b"), Some(1));
        assert_eq!(order.position("x"), None);
        assert_eq!(order.iter().count(), 2);
        assert_eq!(order.into_vec(), vec!["a".to_string(), "b".to_string()]);
    }
}
