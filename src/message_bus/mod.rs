//! # Event bus for queue lifecycle notifications
//!
//! A small publish/subscribe bus keyed by event name. Two kinds of subscriber
//! are supported:
//!
//! - listeners: callbacks run synchronously inside [`EventBus::emit`], in
//!   registration order
//! - consumers: Tokio channels for async code that wants to `.await` events
//!
//! ```rust
//! use transform_queue::message_bus::{EventBus, EventType};
//!
//! #[derive(Clone)]
//! struct Saved;
//!
//! impl EventType for Saved {
//!     fn event_name(&self) -> &'static str {
//!         "saved"
//!     }
//! }
//!
//! let bus = EventBus::<Saved>::new();
//! bus.subscribe("saved", |_| println!("saved"));
//! let mut consumer = bus.consumer("saved");
//!
//! assert_eq!(bus.emit(&Saved), 2);
//! assert!(consumer.try_recv().is_ok());
//! ```

pub use consumer::Consumer;
pub use error_handling::{AsyncRecvError, AsyncTryRecvError};
pub use events::{EventType, QueueEvent, DID_COMPLETE, DID_FAIL, DID_TRANSFORM};
pub use sync_bus::{EventBus, Listener, SubscriptionId};

mod consumer;
mod error_handling;
mod events;
mod sync_bus;
