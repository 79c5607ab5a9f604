//! Configuration for a transform queue.
//!
//! A `QueueConfig` can be built in code or loaded from a TOML file:
//!
//! ```toml
//! name = "planets"
//! auto_process = false
//! ```
//!
//! Missing keys fall back to their defaults.

use crate::error::{QueueError, QueueResult};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default label used in log output.
pub const DEFAULT_QUEUE_NAME: &str = "transform_queue";

/// Queue settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Label used in log lines
    pub name: String,
    /// Start draining as soon as an operation is pushed onto an idle queue
    pub auto_process: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_QUEUE_NAME.to_string(),
            auto_process: true,
        }
    }
}

impl QueueConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_auto_process(mut self, auto_process: bool) -> Self {
        self.auto_process = auto_process;
        self
    }

    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(content: &str) -> QueueResult<Self> {
        let config: QueueConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> QueueResult<Self> {
        let path = path.as_ref();
        debug!("Loading queue config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| QueueError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.name.trim().is_empty() {
            return Err(QueueError::ConfigInvalid {
                message: "name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
