//! Core type definitions for the simulation framework.
//!
//! This module defines the fundamental types used throughout the engine.
//! Values flowing between nodes are JSON values so that handler outputs,
//! memories and logs all serialize without conversion.

/// Unique identifier for a node in a graph.
pub type NodeId = String;

/// Name of an input or output port on a node.
pub type PortName = String;

/// Zero-based index of a simulation timestep.
pub type Timestep = u64;

/// A value flowing along an edge, stored in memory, or given as a parameter.
///
/// `Value::Null` doubles as the "no value" sentinel for absent ports.
pub type Value = serde_json::Value;

/// A mapping from port name to value (node inputs and outputs).
///
/// Keys keep insertion order, so a node's inputs appear in the order its
/// incoming edges were declared.
pub type PortMap = serde_json::Map<String, Value>;

/// Per-node memory carried across timesteps.
///
/// Opaque to the engine: handlers decide what goes in it.
pub type Memory = serde_json::Map<String, Value>;

/// Declared node parameters.
pub type Params = serde_json::Map<String, Value>;

/// The implicit output port used when an edge names no `from_port`.
pub const DEFAULT_PORT: &str = "default";

/// The output port the engine writes a failure message to.
pub const ERROR_PORT: &str = "error";

/// Reads a numeric value, treating anything non-numeric as absent.
pub fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Builds a JSON number from a float, mapping NaN and infinities to `null`.
pub fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_roundtrip() {
        assert_eq!(as_number(&number(2.5)), Some(2.5));
        assert_eq!(as_number(&serde_json::json!(3)), Some(3.0));
        assert_eq!(as_number(&Value::Null), None);
        assert_eq!(as_number(&serde_json::json!("7")), None);
    }

    #[test]
    fn test_non_finite_is_null() {
        assert_eq!(number(f64::NAN), Value::Null);
        assert_eq!(number(f64::INFINITY), Value::Null);
    }

    #[test]
    fn test_port_constants() {
        assert_eq!(DEFAULT_PORT, "default");
        assert_eq!(ERROR_PORT, "error");
    }
}
