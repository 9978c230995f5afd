//! Mock node handlers for testing.
//!
//! These handlers provide simple, predictable behaviors useful for
//! exercising the engine: state threading, input gathering and failure
//! isolation.

use serde_json::json;

use crate::node::{memory_number, HandlerOutput, HandlerResult, NodeError};
use crate::registry::NodeRegistry;
use crate::types::{number, Memory, Params, PortMap};

/// Counts its own invocations in memory and outputs the running count.
///
/// `params.step` (default `1`) is added each invocation.
pub fn counter(_inputs: &PortMap, memory: &Memory, params: &Params) -> HandlerResult {
    let step = crate::node::number_param(params, "step", 1.0)?;
    let count = memory_number(memory, "count", 0.0) + step;

    let mut next = memory.clone();
    next.insert("count".to_string(), number(count));
    Ok(HandlerOutput::single(number(count), next))
}

/// Copies every input port to the output port of the same name.
pub fn echo(inputs: &PortMap, memory: &Memory, _params: &Params) -> HandlerResult {
    Ok(HandlerOutput::new(inputs.clone(), memory.clone()))
}

/// Always fails with `params.message` (default `"mock failure"`).
pub fn fail(_inputs: &PortMap, _memory: &Memory, params: &Params) -> HandlerResult {
    let message = params
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("mock failure");
    Err(NodeError::computation(message))
}

/// Panics on every invocation.
pub fn panicking(_inputs: &PortMap, _memory: &Memory, _params: &Params) -> HandlerResult {
    panic!("mock handler panicked")
}

/// Adds `counter`, `echo`, `fail` and `panic` to `registry`.
pub fn register(registry: &mut NodeRegistry) {
    registry.register("counter", counter);
    registry.register("echo", echo);
    registry.register("fail", fail);
    registry.register("panic", panicking);
}

/// A registry with the built-in and mock handlers.
pub fn test_registry() -> NodeRegistry {
    let mut registry = crate::registry::create_default_registry();
    register(&mut registry);
    registry
}

/// A memory holding only `count`, as [`counter`] would produce it.
pub fn counter_memory(count: f64) -> Memory {
    let mut memory = Memory::new();
    memory.insert("count".to_string(), json!(count));
    memory
}
