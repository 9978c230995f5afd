//! Dense (fully connected) node.
//!
//! Computes `weight * sum(inputs) + bias` over every numeric input.
//! Inputs that are absent or non-numeric contribute nothing.

use crate::node::{number_param, HandlerOutput, HandlerResult};
use crate::registry::{NodeMetadata, NodeRegistry, ParamSpec};
use crate::types::{as_number, number, Memory, Params, PortMap};

/// Registry key for this handler.
pub const TYPE_NAME: &str = "dense";

/// Runs one dense step.
///
/// # Errors
/// `InvalidParam` if `weight` or `bias` is set to something non-numeric.
pub fn run(inputs: &PortMap, memory: &Memory, params: &Params) -> HandlerResult {
    let x: f64 = inputs.values().filter_map(as_number).sum();
    let weight = number_param(params, "weight", 1.0)?;
    let bias = number_param(params, "bias", 0.0)?;

    Ok(HandlerOutput::single(number(weight * x + bias), memory.clone()))
}

/// Catalog entry for this handler.
pub fn metadata() -> NodeMetadata {
    NodeMetadata::new("Dense")
        .with_category("layers")
        .with_description("Weighted sum of all inputs plus bias")
        .with_param("weight", ParamSpec::new("float", 1.0))
        .with_param("bias", ParamSpec::new("float", 0.0))
}

/// Adds the `dense` handler to `registry`.
pub fn register(registry: &mut NodeRegistry) {
    registry.register_with_metadata(TYPE_NAME, run, metadata());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeError;
    use crate::types::{Value, DEFAULT_PORT};
    use serde_json::json;

    fn params(weight: Value, bias: Value) -> Params {
        let mut p = Params::new();
        p.insert("weight".to_string(), weight);
        p.insert("bias".to_string(), bias);
        p
    }

    #[test]
    fn test_dense_single_input() {
        let mut inputs = PortMap::new();
        inputs.insert("in".to_string(), json!(3));

        let out = run(&inputs, &Memory::new(), &params(json!(2), json!(1))).unwrap();
        assert_eq!(out.outputs[DEFAULT_PORT].as_f64(), Some(7.0));
    }

    #[test]
    fn test_dense_sums_inputs_and_skips_non_numeric() {
        let mut inputs = PortMap::new();
        inputs.insert("a".to_string(), json!(1.5));
        inputs.insert("b".to_string(), json!(2.5));
        inputs.insert("c".to_string(), Value::Null);
        inputs.insert("d".to_string(), json!({"error": "upstream"}));

        let out = run(&inputs, &Memory::new(), &Params::new()).unwrap();
        assert_eq!(out.outputs[DEFAULT_PORT].as_f64(), Some(4.0));
    }

    #[test]
    fn test_dense_no_inputs_is_bias() {
        let out = run(&PortMap::new(), &Memory::new(), &params(json!(5), json!(-2))).unwrap();
        assert_eq!(out.outputs[DEFAULT_PORT].as_f64(), Some(-2.0));
    }

    #[test]
    fn test_dense_rejects_bad_weight() {
        let result = run(&PortMap::new(), &Memory::new(), &params(json!("x"), json!(0)));
        assert!(matches!(result, Err(NodeError::InvalidParam { .. })));
    }
}
