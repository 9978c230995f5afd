//! Statistics derived from run results.
//!
//! This module summarizes a [`RunResult`] into counters per run and per
//! node, with JSON, CSV and plain-text export for analysis.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::record::RunResult;
use crate::types::NodeId;

/// Aggregate statistics for a simulation run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Graph identifier, if the run had one
    pub graph_id: Option<String>,

    /// Dataset the run was tagged with
    pub dataset_name: String,

    /// Timesteps executed
    pub timesteps: u64,

    /// Total handler invocations
    pub node_invocations: u64,

    /// Invocations that failed
    pub failures: u64,

    /// Per-node counters, keyed by node id
    pub nodes: BTreeMap<NodeId, NodeStats>,

    /// Wall-clock duration, if the caller measured one
    #[serde(default)]
    pub wall_time_ms: Option<f64>,
}

/// Counters for a single node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    /// Number of times the handler ran
    pub invocations: u64,

    /// Number of failed invocations
    pub failures: u64,

    /// First timestep at which the node failed
    pub first_failure: Option<u64>,
}

impl RunStats {
    /// Computes statistics from a finished run.
    pub fn from_result(result: &RunResult) -> Self {
        let mut stats = Self {
            graph_id: result.graph_id.clone(),
            dataset_name: result.dataset_name.clone(),
            timesteps: result.logs.len() as u64,
            ..Self::default()
        };

        for log in &result.logs {
            for entry in &log.node_logs {
                let node = stats.nodes.entry(entry.node_id.clone()).or_default();
                node.invocations += 1;
                stats.node_invocations += 1;
                if !entry.success {
                    node.failures += 1;
                    node.first_failure.get_or_insert(log.timestep);
                    stats.failures += 1;
                }
            }
        }

        stats
    }

    /// Attaches a measured wall-clock duration.
    pub fn with_wall_time(mut self, ms: f64) -> Self {
        self.wall_time_ms = Some(ms);
        self
    }

    /// Fraction of invocations that succeeded, or `1.0` for an empty run.
    pub fn success_rate(&self) -> f64 {
        if self.node_invocations == 0 {
            return 1.0;
        }
        (self.node_invocations - self.failures) as f64 / self.node_invocations as f64
    }

    /// Node ids that failed at least once.
    pub fn failing_nodes(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|(_, s)| s.failures > 0)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Exports statistics to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Exports statistics to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self.to_json().map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e)
        })?;
        std::fs::write(path, json)
    }

    /// Exports summary statistics to CSV.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("metric,value\n");
        csv.push_str(&format!("timesteps,{}\n", self.timesteps));
        csv.push_str(&format!("node_invocations,{}\n", self.node_invocations));
        csv.push_str(&format!("failures,{}\n", self.failures));
        csv.push_str(&format!("success_rate,{:.4}\n", self.success_rate()));
        if let Some(ms) = self.wall_time_ms {
            csv.push_str(&format!("wall_time_ms,{:.2}\n", ms));
        }

        csv
    }

    /// Exports per-node statistics to CSV.
    pub fn nodes_to_csv(&self) -> String {
        let mut csv = String::new();

        csv.push_str("node_id,invocations,failures,first_failure\n");
        for (id, stats) in &self.nodes {
            csv.push_str(&format!(
                "{},{},{},{}\n",
                id,
                stats.invocations,
                stats.failures,
                stats.first_failure.map(|v| v.to_string()).unwrap_or_default(),
            ));
        }

        csv
    }

    /// Writes a human-readable summary to a writer.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "=== Run Statistics ===")?;
        if let Some(ref id) = self.graph_id {
            writeln!(w, "Graph: {}", id)?;
        }
        writeln!(w, "Dataset: {}", self.dataset_name)?;
        writeln!(w, "Timesteps: {}", self.timesteps)?;
        writeln!(w, "Invocations: {}", self.node_invocations)?;
        writeln!(w, "Failures: {}", self.failures)?;
        if let Some(ms) = self.wall_time_ms {
            writeln!(w, "Wall time: {:.2} ms", ms)?;
        }

        let failing = self.failing_nodes();
        if !failing.is_empty() {
            writeln!(w)?;
            writeln!(w, "--- Failing nodes ---")?;
            for id in failing {
                let s = &self.nodes[id];
                writeln!(
                    w,
                    "{}: {} of {} failed (first at timestep {})",
                    id,
                    s.failures,
                    s.invocations,
                    s.first_failure.unwrap_or_default()
                )?;
            }
        }

        Ok(())
    }

    /// Returns the summary as a string.
    pub fn summary(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_summary(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// A simple timer for measuring wall-clock time.
#[derive(Debug)]
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Starts a new timer.
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{NodeLogEntry, TimestepLog};
    use crate::types::{Memory, PortMap};

    fn entry(node_id: &str, success: bool) -> NodeLogEntry {
        NodeLogEntry {
            node_id: node_id.to_string(),
            inputs: PortMap::new(),
            outputs: PortMap::new(),
            state: Memory::new(),
            success,
        }
    }

    fn sample() -> RunResult {
        let logs = (0..3)
            .map(|t| {
                let mut log = TimestepLog::new(t);
                log.push(entry("a", true));
                log.push(entry("b", t == 0));
                log
            })
            .collect();

        RunResult {
            graph_id: Some("g".to_string()),
            dataset_name: "ds".to_string(),
            timesteps: 3,
            logs,
        }
    }

    #[test]
    fn test_stats_from_result() {
        let stats = RunStats::from_result(&sample());

        assert_eq!(stats.timesteps, 3);
        assert_eq!(stats.node_invocations, 6);
        assert_eq!(stats.failures, 2);
        assert_eq!(stats.nodes["a"].failures, 0);
        assert_eq!(stats.nodes["b"].failures, 2);
        assert_eq!(stats.nodes["b"].first_failure, Some(1));
        assert_eq!(stats.failing_nodes(), vec!["b"]);
        assert!((stats.success_rate() - 4.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_run() {
        let stats = RunStats::from_result(&RunResult::default());
        assert_eq!(stats.node_invocations, 0);
        assert_eq!(stats.success_rate(), 1.0);
        assert!(stats.failing_nodes().is_empty());
    }

    #[test]
    fn test_stats_csv_export() {
        let stats = RunStats::from_result(&sample()).with_wall_time(12.5);

        let csv = stats.to_csv();
        assert!(csv.contains("node_invocations,6"));
        assert!(csv.contains("failures,2"));
        assert!(csv.contains("wall_time_ms,12.50"));

        let nodes = stats.nodes_to_csv();
        assert!(nodes.contains("a,3,0,\n"));
        assert!(nodes.contains("b,3,2,1\n"));
    }

    #[test]
    fn test_stats_json_export() {
        let stats = RunStats::from_result(&sample());
        let json = stats.to_json().unwrap();
        let restored: RunStats = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, stats);
    }

    #[test]
    fn test_summary_output() {
        let summary = RunStats::from_result(&sample()).summary();
        assert!(summary.contains("Graph: g"));
        assert!(summary.contains("Failures: 2"));
        assert!(summary.contains("b: 2 of 3 failed (first at timestep 1)"));
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed_ms() >= 10.0);
    }
}
