//! Event type definitions for the transform queue

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Name of the event emitted when a drain cycle empties the backlog
pub const DID_COMPLETE: &str = "didComplete";
/// Name of the event emitted when a handler rejects an operation
pub const DID_FAIL: &str = "didFail";
/// Name of the event emitted after each successfully applied operation
pub const DID_TRANSFORM: &str = "didTransform";

/// Trait for types that can be published on an [`EventBus`](super::EventBus)
pub trait EventType: Clone + Send + Sync + 'static {
    /// Name subscribers register under to receive this event
    fn event_name(&self) -> &'static str;
}

/// Lifecycle events emitted by a `TransformQueue`
pub enum QueueEvent<O, E> {
    /// An operation was applied and removed from the backlog
    DidTransform { id: Uuid, operation: Arc<O> },
    /// The backlog was drained without failure
    DidComplete,
    /// The target rejected an operation; the error is the target's own value
    DidFail {
        id: Uuid,
        operation: Arc<O>,
        error: Arc<E>,
    },
}

impl<O, E> QueueEvent<O, E> {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::DidComplete)
    }

    /// The handler error carried by a `DidFail` event
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::DidFail { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The operation a `DidTransform` or `DidFail` event refers to
    pub fn operation(&self) -> Option<&O> {
        match self {
            Self::DidTransform { operation, .. } | Self::DidFail { operation, .. } => {
                Some(operation)
            }
            Self::DidComplete => None,
        }
    }
}

// Manual impl: cloning only bumps the Arcs, so O and E need not be Clone.
impl<O, E> Clone for QueueEvent<O, E> {
    fn clone(&self) -> Self {
        match self {
            Self::DidTransform { id, operation } => Self::DidTransform {
                id: *id,
                operation: Arc::clone(operation),
            },
            Self::DidComplete => Self::DidComplete,
            Self::DidFail {
                id,
                operation,
                error,
            } => Self::DidFail {
                id: *id,
                operation: Arc::clone(operation),
                error: Arc::clone(error),
            },
        }
    }
}

impl<O: fmt::Debug, E: fmt::Debug> fmt::Debug for QueueEvent<O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DidTransform { id, operation } => f
                .debug_struct("DidTransform")
                .field("id", id)
                .field("operation", operation)
                .finish(),
            Self::DidComplete => f.write_str("DidComplete"),
            Self::DidFail {
                id,
                operation,
                error,
            } => f
                .debug_struct("DidFail")
                .field("id", id)
                .field("operation", operation)
                .field("error", error)
                .finish(),
        }
    }
}

impl<O, E> EventType for QueueEvent<O, E>
where
    O: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn event_name(&self) -> &'static str {
        match self {
            Self::DidTransform { .. } => DID_TRANSFORM,
            Self::DidComplete => DID_COMPLETE,
            Self::DidFail { .. } => DID_FAIL,
        }
    }
}
