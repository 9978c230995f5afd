//! Fixed input node.

use serde_json::json;

use crate::node::{HandlerOutput, HandlerResult};
use crate::registry::{NodeMetadata, NodeRegistry, ParamSpec};
use crate::types::{Memory, Params, PortMap};

/// Registry key for this handler.
pub const TYPE_NAME: &str = "input";

/// Emits `params.value` (default `1`) on the default port.
///
/// The value is passed through as given, so structured inputs work too.
pub fn run(_inputs: &PortMap, memory: &Memory, params: &Params) -> HandlerResult {
    let value = params.get("value").cloned().unwrap_or_else(|| json!(1));
    Ok(HandlerOutput::single(value, memory.clone()))
}

/// Catalog entry for this handler.
pub fn metadata() -> NodeMetadata {
    NodeMetadata::new("Input Node")
        .with_category("developer")
        .with_description("Provides a fixed numeric input")
        .with_param("value", ParamSpec::new("float", 1.0))
}

/// Adds the `input` handler to `registry`.
pub fn register(registry: &mut NodeRegistry) {
    registry.register_with_metadata(TYPE_NAME, run, metadata());
}
