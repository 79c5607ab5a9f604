//! Synchronous event bus
//!
//! Listeners run on the emitting thread, in registration order, before `emit`
//! returns. Channel consumers registered under the same name are interleaved in
//! that same order.

use super::consumer::Consumer;
use super::events::EventType;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc as async_mpsc;

/// Callback invoked with each event published under its name
pub type Listener<T> = dyn Fn(&T) + Send + Sync;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Subscriber<T> {
    Listener(Arc<Listener<T>>),
    Channel(async_mpsc::UnboundedSender<T>),
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Listener(listener) => Self::Listener(Arc::clone(listener)),
            Self::Channel(sender) => Self::Channel(sender.clone()),
        }
    }
}

/// Internal registry for managing event subscribers
struct SubscriberRegistry<T> {
    next_id: u64,
    // Key: event name, Value: subscribers in registration order
    subscribers: HashMap<String, Vec<(SubscriptionId, Subscriber<T>)>>,
}

impl<T> SubscriberRegistry<T> {
    fn new() -> Self {
        Self {
            next_id: 0,
            subscribers: HashMap::new(),
        }
    }

    fn add_subscriber(&mut self, event_name: &str, subscriber: Subscriber<T>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscribers
            .entry(event_name.to_string())
            .or_default()
            .push((id, subscriber));
        id
    }

    fn remove_subscriber(&mut self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for subscribers in self.subscribers.values_mut() {
            let before = subscribers.len();
            subscribers.retain(|(subscriber_id, _)| *subscriber_id != id);
            removed |= subscribers.len() != before;
        }
        self.subscribers
            .retain(|_, subscribers| !subscribers.is_empty());
        removed
    }

    fn get_subscribers(&self, event_name: &str) -> Vec<(SubscriptionId, Subscriber<T>)> {
        self.subscribers.get(event_name).cloned().unwrap_or_default()
    }
}

/// Publish/subscribe bus keyed by event name
pub struct EventBus<T> {
    registry: Arc<Mutex<SubscriberRegistry<T>>>,
}

impl<T: EventType> EventBus<T> {
    /// Create a new event bus instance
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(SubscriberRegistry::new())),
        }
    }

    fn registry(&self) -> MutexGuard<'_, SubscriberRegistry<T>> {
        match self.registry.lock() {
            Ok(registry) => registry,
            Err(poisoned) => {
                warn!("⚠️ Event registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Register a listener for events published under `event_name`
    pub fn subscribe<F>(&self, event_name: &str, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self
            .registry()
            .add_subscriber(event_name, Subscriber::Listener(Arc::new(listener)));
        debug!("Registered listener {:?} for '{}'", id, event_name);
        id
    }

    /// Subscribe a channel consumer to events published under `event_name`
    pub fn consumer(&self, event_name: &str) -> Consumer<T> {
        let (sender, receiver) = async_mpsc::unbounded_channel();
        let id = self
            .registry()
            .add_subscriber(event_name, Subscriber::Channel(sender));
        debug!("Registered consumer {:?} for '{}'", id, event_name);
        Consumer::new(receiver)
    }

    /// Remove a listener or consumer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry().remove_subscriber(id)
    }

    /// Deliver `event` to every subscriber of its name, in registration order.
    ///
    /// The registry lock is released before delivery, so listeners may
    /// subscribe, unsubscribe or emit themselves. Returns the number of
    /// subscribers that received the event.
    pub fn emit(&self, event: &T) -> usize {
        let event_name = event.event_name();
        let subscribers = self.registry().get_subscribers(event_name);
        if subscribers.is_empty() {
            // No subscribers for this event - this is not an error
            return 0;
        }

        let mut delivered = 0;
        let mut disconnected = Vec::new();
        for (id, subscriber) in subscribers {
            match subscriber {
                Subscriber::Listener(listener) => {
                    listener(event);
                    delivered += 1;
                }
                Subscriber::Channel(sender) => {
                    if sender.send(event.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        disconnected.push(id);
                    }
                }
            }
        }

        if !disconnected.is_empty() {
            debug!(
                "Dropping {} disconnected consumers of '{}'",
                disconnected.len(),
                event_name
            );
            let mut registry = self.registry();
            for id in disconnected {
                registry.remove_subscriber(id);
            }
        }

        delivered
    }

    /// Get the number of subscribers for a given event name
    pub fn listener_count(&self, event_name: &str) -> usize {
        self.registry()
            .subscribers
            .get(event_name)
            .map_or(0, Vec::len)
    }
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T: EventType> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
