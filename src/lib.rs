//! # stepgraph
//!
//! A timestep simulation engine for directed graphs of pluggable
//! computational nodes.
//!
//! ## Design Principles
//!
//! - **Graph-Driven**: A run is described entirely by a [`Graph`] of nodes
//!   and typed edges, supplied by the caller and never mutated.
//! - **Schedule Once**: The graph is ordered topologically once per run;
//!   every timestep replays that order.
//! - **Pluggable Nodes**: Node types resolve through a [`NodeRegistry`] to
//!   pure handler functions. Anything a node remembers between timesteps
//!   lives in its memory, owned by the run.
//! - **Failure Isolation**: A failing node is logged and skipped for that
//!   timestep; it never stops the run or touches another node's state.
//!
//! ## Features
//!
//! - `parallel` - Run independent simulations concurrently using rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use stepgraph::{EdgeDesc, Graph, NodeDesc, SimulationEngine};
//! use stepgraph::registry::create_default_registry;
//!
//! let graph = Graph::new()
//!     .with_id("quickstart")
//!     .with_node(NodeDesc::new("in", "input").with_param("value", 3))
//!     .with_node(NodeDesc::new("cell", "lstm_cell"))
//!     .with_edge(EdgeDesc::new("in", "cell"));
//!
//! let engine = SimulationEngine::new(create_default_registry());
//! let result = engine.simulate(&graph, "demo", 5).unwrap();
//!
//! assert_eq!(result.logs.len(), 5);
//! assert!(result.all_succeeded());
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use stepgraph::config::SimConfig;
//!
//! let config = SimConfig::from_yaml_file("graph.yaml")?;
//! let result = config.run(&engine)?;
//! ```

pub mod types;
pub mod graph;
pub mod scheduler;
pub mod node;
pub mod registry;
pub mod nodes;
pub mod record;
pub mod cancel;
pub mod engine;
pub mod config;
pub mod stats;
pub mod parallel;

// Re-export commonly used types
pub use types::{Memory, NodeId, Params, PortMap, Timestep, Value, DEFAULT_PORT, ERROR_PORT};
pub use graph::{EdgeDesc, Graph, GraphError, NodeDesc};
pub use scheduler::{ExecutionOrder, Scheduler};
pub use node::{HandlerOutput, HandlerResult, NodeError, NodeHandler, NodeState};
pub use registry::{create_default_registry, NodeMetadata, NodeRegistry, ParamSpec, UnknownNodeType};
pub use record::{NodeLogEntry, RunResult, TimestepLog};
pub use cancel::CancellationToken;
pub use engine::{RunPhase, RunPlan, SimError, SimulationEngine};
pub use config::{ConfigError, SimConfig, SimConfigBuilder, SimulationParams};
pub use stats::{NodeStats, RunStats, Timer};
pub use parallel::{BatchRunner, BatchStats, SimJob};

/// Initialize the tracing subscriber for logging.
///
/// Call this at the start of your program to enable logging. `RUST_LOG`
/// takes precedence over `level` when set.
///
/// # Example
///
/// ```rust,ignore
/// stepgraph::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
