//! Simulation engine.
//!
//! The `SimulationEngine` validates a graph, schedules it once, and then
//! runs the scheduled order for each timestep, threading every node's memory
//! from one timestep to the next and logging each invocation.
//!
//! A run goes through `Validating -> Scheduled -> Running(t) -> Completed`.
//! Structural problems stop it in the first two phases, before any handler
//! runs. A handler failure during `Running` only marks that node's entry as
//! failed; the run carries on.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

use crate::cancel::CancellationToken;
use crate::graph::{Graph, GraphError, NodeDesc};
use crate::node::{HandlerResult, NodeError, NodeHandler, NodeState};
use crate::record::{NodeLogEntry, RunResult, TimestepLog};
use crate::registry::NodeRegistry;
use crate::scheduler::{ExecutionOrder, Scheduler};
use crate::types::{Memory, NodeId, Params, PortMap, Timestep, Value, ERROR_PORT};

/// Errors that abort a whole `simulate` call.
///
/// All of them are raised before any log is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("invalid graph structure: {0}")]
    Graph(#[from] GraphError),

    #[error("node {node} references unknown node type {node_type}")]
    UnknownNodeType { node: NodeId, node_type: String },

    #[error("simulation cancelled during timestep {timestep}")]
    Cancelled { timestep: Timestep },
}

/// Lifecycle phase of a run, reported in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Validating,
    Scheduled,
    Running(Timestep),
    Completed,
}

/// Where one input port of a node reads from.
#[derive(Debug)]
struct InputBinding<'g> {
    port: &'g str,
    producer: usize,
    source_port: &'g str,
}

/// A node ready to run: its description, resolved handler and input wiring.
struct PlannedNode<'g> {
    desc: &'g NodeDesc,
    handler: NodeHandler,
    inputs: Vec<InputBinding<'g>>,
}

/// A graph that passed validation, scheduling and handler resolution.
///
/// Nodes are stored in execution order; producers are referenced by their
/// position in that order.
pub struct RunPlan<'g> {
    graph: &'g Graph,
    order: ExecutionOrder,
    nodes: Vec<PlannedNode<'g>>,
}

impl<'g> RunPlan<'g> {
    /// The execution order used for every timestep.
    pub fn order(&self) -> &ExecutionOrder {
        &self.order
    }

    /// The graph this plan was built from.
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }
}

impl std::fmt::Debug for RunPlan<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunPlan")
            .field("graph_id", &self.graph.id)
            .field("order", &self.order)
            .finish()
    }
}

/// Runs graphs against a shared, read-only handler registry.
///
/// The engine holds no per-run state, so one engine (or clones of it) can
/// serve many concurrent runs.
///
/// # Example
///
/// ```
/// use stepgraph::graph::{EdgeDesc, Graph, NodeDesc};
/// use stepgraph::registry::create_default_registry;
/// use stepgraph::SimulationEngine;
///
/// let graph = Graph::new()
///     .with_node(NodeDesc::new("in", "input").with_param("value", 3))
///     .with_node(NodeDesc::new("d", "dense").with_param("weight", 2).with_param("bias", 1))
///     .with_edge(EdgeDesc::new("in", "d"));
///
/// let engine = SimulationEngine::new(create_default_registry());
/// let result = engine.simulate(&graph, "demo", 1).unwrap();
///
/// let d = result.logs[0].get("d").unwrap();
/// assert_eq!(d.output("default").as_f64(), Some(7.0));
/// ```
#[derive(Clone, Debug)]
pub struct SimulationEngine {
    registry: Arc<NodeRegistry>,
}

impl SimulationEngine {
    /// Creates an engine that owns `registry`.
    pub fn new(registry: NodeRegistry) -> Self {
        Self::with_registry(Arc::new(registry))
    }

    /// Creates an engine over a registry shared with other engines.
    pub fn with_registry(registry: Arc<NodeRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the handler registry.
    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    /// Validates and schedules `graph`, resolving every node's handler.
    ///
    /// # Errors
    /// [`SimError::Graph`] for structural problems and
    /// [`SimError::UnknownNodeType`] for types missing from the registry.
    pub fn plan<'g>(&self, graph: &'g Graph) -> Result<RunPlan<'g>, SimError> {
        tracing::debug!(phase = ?RunPhase::Validating, nodes = graph.node_count(), edges = graph.edge_count());
        let indices = Scheduler::schedule_indices(graph)?;
        let order = ExecutionOrder::from_indices(graph, &indices);

        let position: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut nodes = Vec::with_capacity(order.len());
        for &i in &indices {
            let desc = &graph.nodes[i];
            let handler = self.registry.resolve(&desc.node_type).map_err(|_| {
                SimError::UnknownNodeType {
                    node: desc.id.clone(),
                    node_type: desc.node_type.clone(),
                }
            })?;
            let mut inputs: Vec<InputBinding<'g>> = Vec::new();
            for edge in graph.incoming_edges(&desc.id) {
                let Some(&producer) = position.get(edge.from.as_str()) else {
                    continue;
                };
                let binding = InputBinding {
                    port: edge.target_port(),
                    producer,
                    source_port: edge.source_port(),
                };
                // Last edge into a port wins; it keeps the slot of the first.
                match inputs.iter_mut().find(|b| b.port == binding.port) {
                    Some(existing) => {
                        tracing::warn!(
                            node = %desc.id,
                            port = binding.port,
                            from = %edge.from,
                            "input port fed by several edges, keeping the last one"
                        );
                        *existing = binding;
                    }
                    None => inputs.push(binding),
                }
            }
            nodes.push(PlannedNode {
                desc,
                handler,
                inputs,
            });
        }

        tracing::debug!(phase = ?RunPhase::Scheduled, order = ?order.as_slice());
        Ok(RunPlan {
            graph,
            order,
            nodes,
        })
    }

    /// Runs `graph` for `timesteps` steps.
    ///
    /// Returns either a complete [`RunResult`] (possibly containing failed
    /// node entries) or an error raised before the first timestep.
    pub fn simulate(
        &self,
        graph: &Graph,
        dataset_name: &str,
        timesteps: u64,
    ) -> Result<RunResult, SimError> {
        let plan = self.plan(graph)?;
        self.execute(&plan, dataset_name, timesteps, None)
    }

    /// Like [`simulate`](Self::simulate), but stops early when `token` is
    /// cancelled.
    ///
    /// A cancelled run returns [`SimError::Cancelled`] and no partial log.
    pub fn simulate_with_cancel(
        &self,
        graph: &Graph,
        dataset_name: &str,
        timesteps: u64,
        token: &CancellationToken,
    ) -> Result<RunResult, SimError> {
        let plan = self.plan(graph)?;
        self.execute(&plan, dataset_name, timesteps, Some(token))
    }

    /// Runs an already built plan.
    pub fn execute(
        &self,
        plan: &RunPlan<'_>,
        dataset_name: &str,
        timesteps: u64,
        token: Option<&CancellationToken>,
    ) -> Result<RunResult, SimError> {
        let graph_id = plan.graph.id.clone();
        tracing::info!(
            graph_id = graph_id.as_deref().unwrap_or("-"),
            dataset = dataset_name,
            timesteps,
            nodes = plan.nodes.len(),
            "starting simulation"
        );

        let mut states: Vec<NodeState> = vec![NodeState::default(); plan.nodes.len()];
        let mut logs = Vec::new();
        let mut failures = 0u64;

        for t in 0..timesteps {
            tracing::debug!(phase = ?RunPhase::Running(t));
            let mut log = TimestepLog::new(t);

            for (idx, node) in plan.nodes.iter().enumerate() {
                if token.is_some_and(CancellationToken::is_cancelled) {
                    tracing::info!(timestep = t, node = %node.desc.id, "simulation cancelled");
                    return Err(SimError::Cancelled { timestep: t });
                }

                let inputs = gather_inputs(node, &states);
                let state = &mut states[idx];

                let success = match invoke(&node.handler, &inputs, &state.memory, &node.desc.params) {
                    Ok(out) => {
                        state.outputs = out.outputs;
                        state.memory = out.memory;
                        state.failed = false;
                        true
                    }
                    Err(err) => {
                        tracing::warn!(timestep = t, node = %node.desc.id, error = %err, "node invocation failed");
                        failures += 1;
                        let mut outputs = PortMap::new();
                        outputs.insert(ERROR_PORT.to_string(), Value::String(err.to_string()));
                        state.outputs = outputs;
                        state.failed = true;
                        false
                    }
                };

                log.push(NodeLogEntry {
                    node_id: node.desc.id.clone(),
                    inputs,
                    outputs: state.outputs.clone(),
                    state: state.memory.clone(),
                    success,
                });
            }

            logs.push(log);
        }

        tracing::info!(phase = ?RunPhase::Completed, failures, "simulation completed");
        Ok(RunResult {
            graph_id,
            dataset_name: dataset_name.to_string(),
            timesteps,
            logs,
        })
    }
}

/// Reads every input of `node` from its producers' latest outputs.
///
/// Producers always precede their consumers in the plan, so these are the
/// current timestep's outputs. Missing ports read as `null`; a failed
/// producer hands over its `{"error": msg}` marker.
fn gather_inputs(node: &PlannedNode<'_>, states: &[NodeState]) -> PortMap {
    node.inputs
        .iter()
        .map(|binding| {
            let value = states[binding.producer].read(binding.source_port);
            (binding.port.to_string(), value)
        })
        .collect()
}

/// Calls a handler, turning a panic into a [`NodeError`].
fn invoke(handler: &NodeHandler, inputs: &PortMap, memory: &Memory, params: &Params) -> HandlerResult {
    panic::catch_unwind(AssertUnwindSafe(|| handler(inputs, memory, params)))
        .unwrap_or_else(|payload| Err(NodeError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
