//! # transform_queue
//!
//! A FIFO queue that applies mutation operations to a single target, strictly
//! one at a time, and reports `didComplete` / `didFail` / `didTransform` to
//! observers.
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use transform_queue::{Transformable, Transformation, TransformQueue, DID_COMPLETE};
//!
//! struct Planets {
//!     names: Mutex<Vec<String>>,
//! }
//!
//! impl Transformable for Planets {
//!     type Operation = String;
//!     type Output = ();
//!     type Error = String;
//!
//!     fn transform(&self, name: &String) -> Transformation<(), String> {
//!         self.names.lock().unwrap().push(name.clone());
//!         Transformation::ok(())
//!     }
//! }
//!
//! let planets = Arc::new(Planets { names: Mutex::new(Vec::new()) });
//! let queue = TransformQueue::new(Arc::clone(&planets));
//! queue.on(DID_COMPLETE, |_| println!("queue drained"));
//!
//! queue.push("Mercury".to_string());
//! queue.push("Venus".to_string());
//!
//! assert_eq!(*planets.names.lock().unwrap(), vec!["Mercury", "Venus"]);
//! assert!(!queue.processing());
//! ```

pub mod config;
pub mod error;
pub mod message_bus;
pub mod operation;
pub mod orchestration;

pub use config::QueueConfig;
pub use error::{QueueError, QueueResult};
pub use message_bus::{EventBus, QueueEvent, DID_COMPLETE, DID_FAIL, DID_TRANSFORM};
pub use operation::{PatchOp, PatchOperation};
pub use orchestration::{
    QueueEntry, QueueEventOf, QueueStatus, TransformFuture, TransformQueue, Transformable,
    Transformation,
};
