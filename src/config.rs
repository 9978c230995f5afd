//! Configuration system for simulation runs.
//!
//! This module provides YAML/JSON configuration file support for defining
//! a graph and its run parameters declaratively.
//!
//! # Configuration File Structure
//!
//! ```yaml
//! simulation:
//!   dataset: demo
//!   timesteps: 10
//!   log_level: info
//!
//! graph:
//!   id: example
//!   nodes:
//!     - id: in
//!       type: input
//!       params:
//!         value: 3
//!     - id: d
//!       type: dense
//!       params:
//!         weight: 2
//!         bias: 1
//!   edges:
//!     - from: in
//!       to: d
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::engine::{SimError, SimulationEngine};
use crate::graph::{EdgeDesc, Graph, GraphError, NodeDesc};
use crate::record::RunResult;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid graph: {0}")]
    Graph(#[from] GraphError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Run parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Dataset name the run is tagged with
    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// Number of timesteps to simulate
    #[serde(default = "default_timesteps")]
    pub timesteps: u64,

    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_dataset() -> String {
    "default".to_string()
}

fn default_timesteps() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            timesteps: default_timesteps(),
            log_level: default_log_level(),
        }
    }
}

impl SimulationParams {
    /// Validates the run parameters.
    pub fn validate(&self) -> ConfigResult<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown log level: {}",
                self.log_level
            )));
        }
        if self.dataset.trim().is_empty() {
            return Err(ConfigError::Validation(
                "Dataset name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete run configuration: parameters plus the graph to simulate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Run parameters
    #[serde(default)]
    pub simulation: SimulationParams,

    /// The graph to simulate
    #[serde(default)]
    pub graph: Graph,
}

impl SimConfig {
    /// Creates a new configuration with default parameters and no nodes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: SimConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Validates the entire configuration.
    ///
    /// Cycles are only detected when the graph is scheduled.
    pub fn validate(&self) -> ConfigResult<()> {
        self.simulation.validate()?;
        self.graph.validate()?;
        Ok(())
    }

    /// Saves configuration to a YAML file.
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Saves configuration to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Simulates the configured graph with the configured parameters.
    pub fn run(&self, engine: &SimulationEngine) -> Result<RunResult, SimError> {
        engine.simulate(
            &self.graph,
            &self.simulation.dataset,
            self.simulation.timesteps,
        )
    }
}

/// Builder for creating SimConfig programmatically.
#[derive(Default)]
pub struct SimConfigBuilder {
    config: SimConfig,
}

impl SimConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dataset name.
    pub fn dataset(mut self, name: impl Into<String>) -> Self {
        self.config.simulation.dataset = name.into();
        self
    }

    /// Sets the number of timesteps.
    pub fn timesteps(mut self, timesteps: u64) -> Self {
        self.config.simulation.timesteps = timesteps;
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.simulation.log_level = level.into();
        self
    }

    /// Sets the graph identifier.
    pub fn graph_id(mut self, id: impl Into<String>) -> Self {
        self.config.graph.id = Some(id.into());
        self
    }

    /// Adds a node with no parameters.
    pub fn add_node(self, id: impl Into<String>, node_type: impl Into<String>) -> Self {
        self.add_node_desc(NodeDesc::new(id, node_type))
    }

    /// Adds a fully described node.
    pub fn add_node_desc(mut self, node: NodeDesc) -> Self {
        self.config.graph.nodes.push(node);
        self
    }

    /// Adds an edge between default ports.
    pub fn add_edge(self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.add_edge_desc(EdgeDesc::new(from, to))
    }

    /// Adds a fully described edge.
    pub fn add_edge_desc(mut self, edge: EdgeDesc) -> Self {
        self.config.graph.edges.push(edge);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<SimConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
