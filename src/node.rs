//! The node handler contract.
//!
//! A handler is a pure function from a node's gathered inputs, its memory
//! and its parameters to new outputs and a new memory. Handlers keep no
//! state of their own: anything that must survive to the next timestep goes
//! into the returned memory.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::types::{as_number, Memory, Params, PortMap, Value, DEFAULT_PORT, ERROR_PORT};

/// Errors a handler may report for a single invocation.
///
/// These never abort a run; the engine records them against the node and
/// moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("computation failed: {0}")]
    Computation(String),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl NodeError {
    /// Shorthand for [`NodeError::Computation`].
    pub fn computation(msg: impl Into<String>) -> Self {
        NodeError::Computation(msg.into())
    }

    /// Shorthand for [`NodeError::InvalidParam`].
    pub fn invalid_param(name: impl Into<String>, reason: impl Into<String>) -> Self {
        NodeError::InvalidParam {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// What a successful handler invocation returns.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HandlerOutput {
    /// Values per output port
    pub outputs: PortMap,
    /// Memory to carry into the next timestep
    pub memory: Memory,
}

impl HandlerOutput {
    /// Creates an output with the given ports and memory.
    pub fn new(outputs: PortMap, memory: Memory) -> Self {
        Self { outputs, memory }
    }

    /// A single value on the default port, memory passed through.
    pub fn single(value: Value, memory: Memory) -> Self {
        let mut outputs = PortMap::new();
        outputs.insert(DEFAULT_PORT.to_string(), value);
        Self { outputs, memory }
    }
}

/// Result of one handler invocation.
pub type HandlerResult = Result<HandlerOutput, NodeError>;

/// A node computation, shared read-only across runs.
pub type NodeHandler = Arc<dyn Fn(&PortMap, &Memory, &Params) -> HandlerResult + Send + Sync>;

/// Per-node state owned by a single run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    /// Handler-defined memory, carried across timesteps
    pub memory: Memory,
    /// Outputs of the most recent invocation
    pub outputs: PortMap,
    /// Whether the most recent invocation failed
    #[serde(default)]
    pub failed: bool,
}

impl NodeState {
    /// Reads an output port, yielding `null` when the port is absent.
    pub fn output(&self, port: &str) -> Value {
        self.outputs.get(port).cloned().unwrap_or(Value::Null)
    }

    /// Reads a port on behalf of a downstream node.
    ///
    /// After a failed invocation every port except `error` carries the
    /// whole `{"error": msg}` marker, so consumers see the failure instead
    /// of a bare `null`.
    pub fn read(&self, port: &str) -> Value {
        if self.failed && port != ERROR_PORT {
            return Value::Object(self.outputs.clone());
        }
        self.output(port)
    }
}

/// Reads a numeric parameter, falling back to `default` when it is absent.
///
/// # Errors
/// [`NodeError::InvalidParam`] if the parameter is present but not a number.
pub fn number_param(params: &Params, name: &str, default: f64) -> Result<f64, NodeError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => as_number(v).ok_or_else(|| NodeError::invalid_param(name, "expected a number")),
    }
}

/// Reads a numeric value from memory, falling back to `default`.
pub fn memory_number(memory: &Memory, key: &str, default: f64) -> f64 {
    memory.get(key).and_then(as_number).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_handler_output_single() {
        let out = HandlerOutput::single(json!(7), Memory::new());
        assert_eq!(out.outputs[DEFAULT_PORT], 7);
        assert!(out.memory.is_empty());
    }

    #[test]
    fn test_node_state_absent_port() {
        let mut state = NodeState::default();
        assert_eq!(state.output(DEFAULT_PORT), Value::Null);

        state.outputs.insert("h".to_string(), json!(0.5));
        assert_eq!(state.output("h"), json!(0.5));
        assert_eq!(state.read("h"), json!(0.5));
    }

    #[test]
    fn test_failed_state_reads_error_marker() {
        let mut state = NodeState::default();
        state.outputs.insert(ERROR_PORT.to_string(), json!("boom"));
        state.failed = true;

        assert_eq!(state.read(DEFAULT_PORT), json!({"error": "boom"}));
        assert_eq!(state.read("anything"), json!({"error": "boom"}));
        assert_eq!(state.read(ERROR_PORT), json!("boom"));
        assert_eq!(state.output(DEFAULT_PORT), Value::Null);
    }

    #[test]
    fn test_number_param() {
        let mut params = Params::new();
        assert_eq!(number_param(&params, "weight", 1.0), Ok(1.0));

        params.insert("weight".to_string(), json!(2));
        assert_eq!(number_param(&params, "weight", 1.0), Ok(2.0));

        params.insert("weight".to_string(), json!("heavy"));
        assert!(matches!(
            number_param(&params, "weight", 1.0),
            Err(NodeError::InvalidParam { .. })
        ));
    }

    #[test]
    fn test_closure_as_handler() {
        let handler: NodeHandler = Arc::new(|_inputs: &PortMap, memory: &Memory, _params: &Params| {
            let n = memory_number(memory, "n", 0.0) + 1.0;
            let mut memory = memory.clone();
            memory.insert("n".to_string(), json!(n));
            Ok(HandlerOutput::single(json!(n), memory))
        });

        let first = handler(&PortMap::new(), &Memory::new(), &Params::new()).unwrap();
        let second = handler(&PortMap::new(), &first.memory, &Params::new()).unwrap();
        assert_eq!(second.outputs[DEFAULT_PORT], json!(2.0));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            NodeError::computation("boom").to_string(),
            "computation failed: boom"
        );
        assert_eq!(
            NodeError::invalid_param("bias", "expected a number").to_string(),
            "invalid parameter bias: expected a number"
        );
    }
}
