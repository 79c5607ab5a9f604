//! Error types for the transform queue.
//!
//! Handler failures never pass through these types: they reach observers as the
//! target's own error value. `QueueError` only covers the queue refusing a
//! request and configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors produced by the queue itself
#[derive(Error, Debug)]
pub enum QueueError {
    /// The backlog cannot be modified while a drain loop is active
    #[error("Queue is busy processing, cannot {operation}")]
    Busy { operation: String },

    /// The backlog has no operation to act on
    #[error("Queue is empty, nothing to {operation}")]
    Empty { operation: String },

    /// Reading a configuration file failed
    #[error("Failed to read queue config {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration text is not valid TOML for `QueueConfig`
    #[error("Failed to parse queue config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration parsed but failed validation
    #[error("Invalid queue config: {message}")]
    ConfigInvalid { message: String },
}

impl QueueError {
    pub(crate) fn busy(operation: &str) -> Self {
        Self::Busy {
            operation: operation.to_string(),
        }
    }

    pub(crate) fn empty(operation: &str) -> Self {
        Self::Empty {
            operation: operation.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let busy = QueueError::busy("clear");
        assert_eq!(busy.to_string(), "Queue is busy processing, cannot clear");

        let empty = QueueError::empty("skip");
        assert!(empty.to_string().contains("nothing to skip"));

        let invalid = QueueError::ConfigInvalid {
            message: "name must not be empty".to_string(),
        };
        assert!(invalid.to_string().contains("name must not be empty"));
    }
}
