//! Run records: per-timestep, per-node logs and the aggregate run result.
//!
//! Records are plain data. The engine builds them; storing them is up to the
//! caller, for which JSON and YAML export helpers are provided.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{Memory, NodeId, PortMap, Timestep, Value};

/// What happened to one node during one timestep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeLogEntry {
    /// The node this entry belongs to
    pub node_id: NodeId,
    /// Inputs gathered for the invocation, keyed by input port
    pub inputs: PortMap,
    /// Outputs after the invocation (`{"error": msg}` on failure)
    pub outputs: PortMap,
    /// Memory after the invocation (unchanged on failure)
    pub state: Memory,
    /// Whether the handler returned successfully
    pub success: bool,
}

impl NodeLogEntry {
    /// Reads an output port, yielding `null` when the port is absent.
    pub fn output(&self, port: &str) -> Value {
        self.outputs.get(port).cloned().unwrap_or(Value::Null)
    }
}

/// All node entries for one timestep, in execution order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimestepLog {
    /// Zero-based timestep index
    pub timestep: Timestep,
    /// One entry per node, in the order the nodes ran
    pub node_logs: Vec<NodeLogEntry>,
}

impl TimestepLog {
    /// Creates an empty log for `timestep`.
    pub fn new(timestep: Timestep) -> Self {
        Self {
            timestep,
            node_logs: Vec::new(),
        }
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: NodeLogEntry) {
        self.node_logs.push(entry);
    }

    /// Finds the entry for a node.
    pub fn get(&self, node_id: &str) -> Option<&NodeLogEntry> {
        self.node_logs.iter().find(|e| e.node_id == node_id)
    }

    /// Iterates over entries whose handler failed.
    pub fn failures(&self) -> impl Iterator<Item = &NodeLogEntry> {
        self.node_logs.iter().filter(|e| !e.success)
    }
}

/// The complete outcome of one simulation run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Identifier of the simulated graph, if it had one
    pub graph_id: Option<String>,
    /// Dataset the run was tagged with
    pub dataset_name: String,
    /// Configured number of timesteps
    pub timesteps: u64,
    /// One log per executed timestep, in order
    pub logs: Vec<TimestepLog>,
}

impl RunResult {
    /// Iterates over one node's entries across all timesteps.
    pub fn node_history<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a NodeLogEntry> + 'a {
        self.logs.iter().filter_map(move |log| log.get(node_id))
    }

    /// Returns true if every logged invocation succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.logs.iter().all(|log| log.failures().next().is_none())
    }

    /// Exports the result as compact JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Exports the result as indented JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Exports the result as YAML.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Parses a result previously exported with [`RunResult::to_json`].
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Writes the result to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self
            .to_json_pretty()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(node_id: &str, value: Value, success: bool) -> NodeLogEntry {
        let mut outputs = PortMap::new();
        outputs.insert("default".to_string(), value);
        NodeLogEntry {
            node_id: node_id.to_string(),
            inputs: PortMap::new(),
            outputs,
            state: Memory::new(),
            success,
        }
    }

    fn sample() -> RunResult {
        let mut t0 = TimestepLog::new(0);
        t0.push(entry("a", json!(1), true));
        t0.push(entry("b", json!(2), false));
        let mut t1 = TimestepLog::new(1);
        t1.push(entry("a", json!(3), true));
        t1.push(entry("b", json!(4), true));

        RunResult {
            graph_id: Some("g".to_string()),
            dataset_name: "ds".to_string(),
            timesteps: 2,
            logs: vec![t0, t1],
        }
    }

    #[test]
    fn test_timestep_log_lookup() {
        let result = sample();
        let t0 = &result.logs[0];

        assert_eq!(t0.get("a").unwrap().output("default"), json!(1));
        assert_eq!(t0.get("a").unwrap().output("missing"), Value::Null);
        assert!(t0.get("zzz").is_none());
        assert_eq!(t0.failures().count(), 1);
    }

    #[test]
    fn test_node_history() {
        let result = sample();
        let values: Vec<_> = result
            .node_history("a")
            .map(|e| e.output("default"))
            .collect();
        assert_eq!(values, vec![json!(1), json!(3)]);
        assert!(!result.all_succeeded());
    }

    #[test]
    fn test_json_export() {
        let result = sample();
        let json = result.to_json().unwrap();
        assert!(json.contains("\"dataset_name\":\"ds\""));
        assert!(json.contains("\"node_logs\""));

        let restored = RunResult::from_json(&json).unwrap();
        assert_eq!(restored, result);
    }

    #[test]
    fn test_yaml_export() {
        let yaml = sample().to_yaml().unwrap();
        assert!(yaml.contains("dataset_name: ds"));
        assert!(yaml.contains("timestep: 1"));
    }

    #[test]
    fn test_json_file_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");

        sample().to_json_file(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(RunResult::from_json(&content).unwrap(), sample());
    }
}
