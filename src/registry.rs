//! Node handler registry.
//!
//! The registry maps a node type name to the handler that computes it,
//! plus optional metadata for tooling. It is populated once at startup by
//! explicit registration calls and then shared read-only between runs.
//!
//! # Example
//!
//! ```
//! use stepgraph::node::HandlerOutput;
//! use stepgraph::registry::NodeRegistry;
//! use stepgraph::types::{Memory, Params, PortMap};
//!
//! let mut registry = NodeRegistry::new();
//! registry.register("zero", |_inputs: &PortMap, memory: &Memory, _params: &Params| {
//!     Ok(HandlerOutput::single(0.into(), memory.clone()))
//! });
//!
//! assert!(registry.resolve("zero").is_ok());
//! assert!(registry.resolve("missing").is_err());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::node::{HandlerResult, NodeHandler};
use crate::types::{Memory, Params, PortMap, Value};

/// Lookup failure for a node type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no handler registered for node type: {0}")]
pub struct UnknownNodeType(pub String);

/// Describes one parameter a node type accepts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Type descriptor (e.g., "float", "int", "string")
    #[serde(rename = "type")]
    pub ty: String,
    /// Value used when the node does not set the parameter
    #[serde(default)]
    pub default: Value,
}

impl ParamSpec {
    /// Creates a new `ParamSpec`.
    pub fn new(ty: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            ty: ty.into(),
            default: default.into(),
        }
    }
}

/// Descriptive metadata for a node type.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Human-readable name
    pub label: String,
    /// Grouping used by catalogs
    #[serde(default)]
    pub category: String,
    /// One-line description
    #[serde(default)]
    pub description: String,
    /// Accepted parameters
    #[serde(default)]
    pub params: BTreeMap<String, ParamSpec>,
}

impl NodeMetadata {
    /// Creates metadata with a label only.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declares a parameter.
    pub fn with_param(mut self, name: impl Into<String>, spec: ParamSpec) -> Self {
        self.params.insert(name.into(), spec);
        self
    }
}

struct Entry {
    handler: NodeHandler,
    metadata: Option<NodeMetadata>,
}

/// A registry of node handlers keyed by type name.
#[derive(Default)]
pub struct NodeRegistry {
    entries: BTreeMap<String, Entry>,
}

impl NodeRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler with no metadata.
    ///
    /// A later registration for the same type replaces the earlier one.
    pub fn register<F>(&mut self, type_name: impl Into<String>, handler: F)
    where
        F: Fn(&PortMap, &Memory, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(type_name.into(), Arc::new(handler), None);
    }

    /// Registers a handler together with its metadata.
    pub fn register_with_metadata<F>(
        &mut self,
        type_name: impl Into<String>,
        handler: F,
        metadata: NodeMetadata,
    ) where
        F: Fn(&PortMap, &Memory, &Params) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(type_name.into(), Arc::new(handler), Some(metadata));
    }

    fn insert(&mut self, type_name: String, handler: NodeHandler, metadata: Option<NodeMetadata>) {
        if self.entries.contains_key(&type_name) {
            tracing::warn!(node_type = %type_name, "replacing previously registered node handler");
        }
        self.entries.insert(type_name, Entry { handler, metadata });
    }

    /// Looks up the handler for a type.
    ///
    /// # Errors
    /// [`UnknownNodeType`] if nothing is registered under `type_name`.
    pub fn resolve(&self, type_name: &str) -> Result<NodeHandler, UnknownNodeType> {
        self.entries
            .get(type_name)
            .map(|e| Arc::clone(&e.handler))
            .ok_or_else(|| UnknownNodeType(type_name.to_string()))
    }

    /// Returns the metadata for a type, if any was registered.
    pub fn describe(&self, type_name: &str) -> Option<&NodeMetadata> {
        self.entries.get(type_name).and_then(|e| e.metadata.as_ref())
    }

    /// Returns registered type names in sorted order.
    pub fn list_types(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Returns every type that carries metadata, keyed by type name.
    pub fn catalog(&self) -> BTreeMap<&str, &NodeMetadata> {
        self.entries
            .iter()
            .filter_map(|(name, e)| e.metadata.as_ref().map(|m| (name.as_str(), m)))
            .collect()
    }

    /// Returns true if a type is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Returns the number of registered types.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no types are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("registered_types", &self.list_types())
            .finish()
    }
}

/// Creates a registry holding the built-in node types.
///
/// Includes:
/// - `input` - fixed numeric source
/// - `dense` - weighted sum plus bias
/// - `lstm_cell` - simplified recurrent cell
pub fn create_default_registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    crate::nodes::input::register(&mut registry);
    crate::nodes::dense::register(&mut registry);
    crate::nodes::lstm::register(&mut registry);
    registry
}
