//! Simplified LSTM cell.
//!
//! Gates are fixed constants; only the cell and hidden state evolve. The
//! state lives in the node's memory under `h_t` and `c_t`.

use serde_json::json;

use crate::node::{memory_number, HandlerOutput, HandlerResult};
use crate::registry::{NodeMetadata, NodeRegistry};
use crate::types::{as_number, number, Memory, Params, PortMap};

/// Registry key for this handler.
pub const TYPE_NAME: &str = "lstm_cell";

const FORGET_GATE: f64 = 0.8;
const INPUT_GATE: f64 = 0.7;
const OUTPUT_GATE: f64 = 0.6;

/// Runs one recurrent step.
///
/// `x` is the input of the first declared incoming edge, or `0` when there
/// is none.
pub fn run(inputs: &PortMap, memory: &Memory, _params: &Params) -> HandlerResult {
    let x = inputs.values().next().and_then(as_number).unwrap_or(0.0);
    let h_prev = memory_number(memory, "h_t", 0.0);
    let c_prev = memory_number(memory, "c_t", 0.0);
    tracing::trace!(x, h_prev, c_prev, "lstm step");

    let c_t = FORGET_GATE * c_prev + INPUT_GATE * x;
    let h_t = OUTPUT_GATE * c_t.tanh();

    let mut next = Memory::new();
    next.insert("h_t".to_string(), number(h_t));
    next.insert("c_t".to_string(), number(c_t));

    Ok(HandlerOutput::single(number(h_t), next))
}

/// Catalog entry for this handler.
pub fn metadata() -> NodeMetadata {
    NodeMetadata::new("LSTM Cell")
        .with_category("layers")
        .with_description("Recurrent cell with fixed gates, state kept in memory")
}

/// Adds the `lstm_cell` handler to `registry`.
pub fn register(registry: &mut NodeRegistry) {
    registry.register_with_metadata(TYPE_NAME, run, metadata());
}

/// Initial memory for a cell, useful when seeding state by hand.
pub fn initial_memory() -> Memory {
    let mut memory = Memory::new();
    memory.insert("h_t".to_string(), json!(0.0));
    memory.insert("c_t".to_string(), json!(0.0));
    memory
}
