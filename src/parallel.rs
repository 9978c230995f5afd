//! Batch execution of independent simulation runs.
//!
//! Each run owns its node states and log, and the handler registry is
//! read-only, so separate runs can execute on separate threads without
//! coordination. Nodes within one run are never parallelized.
//!
//! # Feature Flag
//!
//! Parallel execution requires the `parallel` feature:
//! ```toml
//! [dependencies]
//! stepgraph = { version = "0.1", features = ["parallel"] }
//! ```
//! Without it, jobs run one after another on the calling thread.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use parking_lot::RwLock;

use crate::engine::{SimError, SimulationEngine};
use crate::graph::Graph;
use crate::record::RunResult;

/// One independent run request.
#[derive(Clone, Debug)]
pub struct SimJob {
    /// The graph to simulate
    pub graph: Graph,
    /// Dataset name to tag the run with
    pub dataset_name: String,
    /// Number of timesteps
    pub timesteps: u64,
}

impl SimJob {
    /// Creates a new job.
    pub fn new(graph: Graph, dataset_name: impl Into<String>, timesteps: u64) -> Self {
        Self {
            graph,
            dataset_name: dataset_name.into(),
            timesteps,
        }
    }
}

/// Counters accumulated across every batch a runner has executed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// Runs that returned a result
    pub runs_completed: u64,
    /// Runs rejected before their first timestep
    pub runs_rejected: u64,
    /// Handler invocations across completed runs
    pub node_invocations: u64,
    /// Failed handler invocations across completed runs
    pub node_failures: u64,
}

/// Runs many independent jobs against one shared engine.
///
/// # Example
///
/// ```
/// use stepgraph::graph::{Graph, NodeDesc};
/// use stepgraph::parallel::{BatchRunner, SimJob};
/// use stepgraph::registry::create_default_registry;
/// use stepgraph::SimulationEngine;
///
/// let engine = SimulationEngine::new(create_default_registry());
/// let runner = BatchRunner::new(engine);
///
/// let graph = Graph::new().with_node(NodeDesc::new("in", "input"));
/// let jobs = vec![SimJob::new(graph.clone(), "a", 2), SimJob::new(graph, "b", 3)];
///
/// let results = runner.run(&jobs);
/// assert_eq!(results.len(), 2);
/// assert_eq!(results[1].as_ref().unwrap().logs.len(), 3);
/// ```
#[derive(Debug)]
pub struct BatchRunner {
    engine: SimulationEngine,
    num_threads: usize,
    stats: RwLock<BatchStats>,
}

impl BatchRunner {
    /// Creates a runner over `engine`.
    pub fn new(engine: SimulationEngine) -> Self {
        Self {
            engine,
            num_threads: 0,
            stats: RwLock::new(BatchStats::default()),
        }
    }

    /// Limits the worker threads used per batch (0 = rayon's default).
    ///
    /// Has no effect without the `parallel` feature.
    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Configured worker thread count (0 = rayon's default).
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// The shared engine.
    pub fn engine(&self) -> &SimulationEngine {
        &self.engine
    }

    /// Runs every job and returns the outcomes in job order.
    #[cfg(not(feature = "parallel"))]
    pub fn run(&self, jobs: &[SimJob]) -> Vec<Result<RunResult, SimError>> {
        tracing::info!(jobs = jobs.len(), "running batch sequentially");
        jobs.iter().map(|job| self.run_one(job)).collect()
    }

    /// Runs every job in parallel and returns the outcomes in job order.
    #[cfg(feature = "parallel")]
    pub fn run(&self, jobs: &[SimJob]) -> Vec<Result<RunResult, SimError>> {
        tracing::info!(jobs = jobs.len(), threads = self.num_threads, "running batch in parallel");
        let run_all = || -> Vec<Result<RunResult, SimError>> {
            jobs.par_iter().map(|job| self.run_one(job)).collect()
        };

        if self.num_threads == 0 {
            return run_all();
        }
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .build()
        {
            Ok(pool) => pool.install(run_all),
            Err(err) => {
                tracing::warn!(error = %err, "could not build thread pool, using global pool");
                run_all()
            }
        }
    }

    fn run_one(&self, job: &SimJob) -> Result<RunResult, SimError> {
        let outcome = self
            .engine
            .simulate(&job.graph, &job.dataset_name, job.timesteps);
        self.record(&outcome);
        outcome
    }

    fn record(&self, outcome: &Result<RunResult, SimError>) {
        let mut stats = self.stats.write();
        match outcome {
            Ok(result) => {
                stats.runs_completed += 1;
                for log in &result.logs {
                    stats.node_invocations += log.node_logs.len() as u64;
                    stats.node_failures += log.failures().count() as u64;
                }
            }
            Err(_) => stats.runs_rejected += 1,
        }
    }

    /// Returns a snapshot of the accumulated counters.
    pub fn stats(&self) -> BatchStats {
        self.stats.read().clone()
    }

    /// Resets the accumulated counters.
    pub fn reset_stats(&self) {
        *self.stats.write() = BatchStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeDesc, NodeDesc};
    use crate::nodes::mock::test_registry;

    fn runner() -> BatchRunner {
        BatchRunner::new(SimulationEngine::new(test_registry())).with_threads(2)
    }

    #[test]
    fn test_runner_accessors() {
        let runner = runner();
        assert_eq!(runner.num_threads(), 2);
        assert!(runner.engine().registry().contains("counter"));
        assert_eq!(runner.stats(), BatchStats::default());
    }

    #[test]
    fn test_results_in_job_order() {
        let jobs: Vec<_> = (1..=4)
            .map(|n| {
                let graph = Graph::new().with_node(NodeDesc::new("c", "counter"));
                SimJob::new(graph, format!("ds{}", n), n)
            })
            .collect();

        let results = runner().run(&jobs);
        for (n, result) in (1..=4).zip(&results) {
            let result = result.as_ref().unwrap();
            assert_eq!(result.dataset_name, format!("ds{}", n));
            assert_eq!(result.logs.len() as u64, n);
        }
    }

    #[test]
    fn test_rejected_jobs_do_not_affect_others() {
        let good = Graph::new().with_node(NodeDesc::new("c", "counter"));
        let cyclic = Graph::new()
            .with_node(NodeDesc::new("a", "counter"))
            .with_node(NodeDesc::new("b", "counter"))
            .with_edge(EdgeDesc::new("a", "b"))
            .with_edge(EdgeDesc::new("b", "a"));
        let failing = Graph::new().with_node(NodeDesc::new("f", "fail"));

        let runner = runner();
        let results = runner.run(&[
            SimJob::new(good, "ok", 2),
            SimJob::new(cyclic, "bad", 2),
            SimJob::new(failing, "flaky", 3),
        ]);

        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(SimError::Graph(_))));
        assert!(results[2].is_ok());

        let stats = runner.stats();
        assert_eq!(stats.runs_completed, 2);
        assert_eq!(stats.runs_rejected, 1);
        assert_eq!(stats.node_invocations, 5);
        assert_eq!(stats.node_failures, 3);

        runner.reset_stats();
        assert_eq!(runner.stats(), BatchStats::default());
    }
}
