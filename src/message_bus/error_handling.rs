//! Error types for event consumers

use thiserror::Error;

/// Errors for async message reception
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsyncRecvError {
    #[error("Timeout while waiting for message")]
    Timeout,
    #[error("Channel disconnected")]
    Disconnected,
}

/// Errors for async try_recv
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsyncTryRecvError {
    #[error("No message available")]
    Empty,
    #[error("Channel disconnected")]
    Disconnected,
}
