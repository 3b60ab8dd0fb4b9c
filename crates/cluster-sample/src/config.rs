//! # Simulation Configuration
//!
//! [`SimulationConfig`] is read from JSON. Every field has a default, so a partial file (or
//! no file at all) is valid. Lookup order for [`SimulationConfig::load`]:
//!
//! 1. An explicit path, typically the first command-line argument.
//! 2. The file named by the `CLUSTER_SAMPLE_CONFIG` environment variable.
//! 3. Built-in defaults.
//!
//! ```json
//! {
//!   "tick_interval_ms": 16,
//!   "ticks": 10,
//!   "request_timeout_ms": 500,
//!   "clusters": [{ "name": "workers", "actor_type": "Worker", "actors": 3 }]
//! }
//! ```

use crate::error::SampleError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const CONFIG_ENV_VAR: &str = "CLUSTER_SAMPLE_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub tick_interval_ms: u64,
    pub ticks: u32,
    pub request_timeout_ms: u64,
    pub clusters: Vec<ClusterLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterLayout {
    pub name: String,
    #[serde(default = "default_actor_type")]
    pub actor_type: String,
    #[serde(default = "default_actor_count")]
    pub actors: usize,
}

fn default_actor_type() -> String {
    "Worker".to_string()
}

fn default_actor_count() -> usize {
    2
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            ticks: 10,
            request_timeout_ms: 500,
            clusters: vec![
                ClusterLayout {
                    name: "workers".to_string(),
                    actor_type: default_actor_type(),
                    actors: 3,
                },
                ClusterLayout {
                    name: "scouts".to_string(),
                    actor_type: "Scout".to_string(),
                    actors: default_actor_count(),
                },
            ],
        }
    }
}

impl SimulationConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn from_json(json: &str) -> Result<Self, SampleError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SampleError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| SampleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&contents)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Resolves the configuration from `explicit`, then the environment, then defaults.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, SampleError> {
        let path = explicit.or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
        match path {
            Some(path) => Self::from_file(path),
            None => {
                info!("Using default configuration");
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = SimulationConfig::from_json(r#"{ "ticks": 3 }"#).unwrap();
        assert_eq!(config.ticks, 3);
        assert_eq!(config.tick_interval_ms, 16);
        assert_eq!(config.clusters, SimulationConfig::default().clusters);
    }

    #[test]
    fn cluster_layout_defaults() {
        let config =
            SimulationConfig::from_json(r#"{ "clusters": [{ "name": "solo" }] }"#).unwrap();
        assert_eq!(config.clusters.len(), 1);
        assert_eq!(config.clusters[0].actor_type, "Worker");
        assert_eq!(config.clusters[0].actors, 2);
    }

    #[test]
    fn malformed_json_is_config_error() {
        assert!(matches!(
            SimulationConfig::from_json("{ ticks: "),
            Err(SampleError::Config(_))
        ));
    }
}
