//! Sequential application of operations to a target
//!
//! - [`transformation`] - the `Transformable` capability and its immediate or pending result
//! - [`transform_queue`] - the FIFO queue that drains operations one at a time

pub mod transform_queue;
pub mod transformation;

pub use transform_queue::{QueueEntry, QueueEventOf, QueueStatus, TransformQueue};
pub use transformation::{TransformFuture, Transformable, Transformation};
