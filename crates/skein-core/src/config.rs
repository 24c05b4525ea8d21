//! Queue configuration, loaded from TOML.
//!
//! ```toml
//! run_max = 10
//! poll_interval_ms = 250
//!
//! [[middlewares]]
//! name = "stamp"
//! params = { source = "cli" }
//!
//! [[middlewares]]
//! name = "deduplicate"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::middleware::MiddlewareDefinition;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Bound for `run` (0 = drain everything available).
    pub run_max: usize,

    /// Idle re-check interval for subscribing adapters.
    pub poll_interval_ms: u64,

    /// Push middlewares, outermost first.
    pub middlewares: Vec<MiddlewareConfig>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            run_max: 0,
            poll_interval_ms: 200,
            middlewares: Vec::new(),
        }
    }
}

impl QueueConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// A named middleware entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    pub name: String,
    #[serde(default)]
    pub params: Value,
}

impl MiddlewareConfig {
    pub fn to_definition(&self) -> MiddlewareDefinition {
        MiddlewareDefinition::named(self.name.clone(), self.params.clone())
    }
}
