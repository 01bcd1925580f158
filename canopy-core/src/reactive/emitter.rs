//! Event sources.
//!
//! Custom watchers subscribe to events on external objects. Anything that can
//! take a listener for a named event implements [`EventSource`];
//! [`EventEmitter`] is the stock implementation, also used as every
//! component's local event bus.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use super::subscriber::{Listener, Subscriber, SubscriberId};

/// Extra parameters for an event subscription.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscribeOptions {
    /// Remove the listener after its first invocation.
    pub single: bool,
    /// Source-specific listener options, passed through untouched.
    pub options: Option<Value>,
}

/// An object that can deliver named events to listeners.
pub trait EventSource: Send + Sync {
    /// Add a listener for `event`.
    fn subscribe(&self, event: &str, listener: Listener, options: &SubscribeOptions) -> SubscriberId;

    /// Remove a listener. Returns `false` if it was not registered.
    fn unsubscribe(&self, event: &str, id: SubscriberId) -> bool;
}

#[derive(Debug)]
struct Registration {
    subscriber: Subscriber,
    single: bool,
}

/// A simple multi-event emitter.
#[derive(Debug, Default)]
pub struct EventEmitter {
    listeners: RwLock<HashMap<String, Vec<Registration>>>,
}

impl EventEmitter {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener for `event`.
    pub fn on(&self, event: &str, listener: Listener) -> SubscriberId {
        self.add(event, listener, false)
    }

    /// Add a listener that is removed after it fires once.
    pub fn once(&self, event: &str, listener: Listener) -> SubscriberId {
        self.add(event, listener, true)
    }

    fn add(&self, event: &str, listener: Listener, single: bool) -> SubscriberId {
        let subscriber = Subscriber::new(listener);
        let id = subscriber.id();

        self.listeners
            .write()
            .entry(event.to_string())
            .or_default()
            .push(Registration { subscriber, single });

        id
    }

    /// Remove a listener.
    pub fn off(&self, event: &str, id: SubscriberId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(list) = listeners.get_mut(event) else {
            return false;
        };

        let before = list.len();
        list.retain(|r| r.subscriber.id() != id);
        list.len() != before
    }

    /// Invoke every listener of `event` and return how many ran.
    ///
    /// Listeners run after the emitter lock is released.
    pub fn emit(&self, event: &str, args: &[Value]) -> usize {
        let subscribers: Vec<Subscriber> = {
            let mut listeners = self.listeners.write();
            let Some(list) = listeners.get_mut(event) else {
                return 0;
            };

            let subscribers = list.iter().map(|r| r.subscriber.clone()).collect();
            list.retain(|r| !r.single);
            subscribers
        };

        for subscriber in &subscribers {
            subscriber.notify(args);
        }

        subscribers.len()
    }

    /// Get the number of listeners for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }
}

impl EventSource for EventEmitter {
    fn subscribe(&self, event: &str, listener: Listener, options: &SubscribeOptions) -> SubscriberId {
        self.add(event, listener, options.single)
    }

    fn unsubscribe(&self, event: &str, id: SubscriberId) -> bool {
        self.off(event, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicI32>, Listener) {
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        let listener: Listener = Arc::new(move |_: &[Value]| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, listener)
    }

    #[test]
    fn emit_reaches_listeners_of_that_event() {
        let emitter = EventEmitter::new();
        let (count, listener) = counter();
        emitter.on("change", listener);

        assert_eq!(emitter.emit("change", &[]), 1);
        assert_eq!(emitter.emit("other", &[]), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn once_listener_fires_a_single_time() {
        let emitter = EventEmitter::new();
        let (count, listener) = counter();
        emitter.once("ready", listener);

        emitter.emit("ready", &[]);
        emitter.emit("ready", &[]);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(emitter.listener_count("ready"), 0);
    }

    #[test]
    fn off_removes_listener() {
        let emitter = EventEmitter::new();
        let (count, listener) = counter();
        let id = emitter.on("change", listener);

        assert!(emitter.off("change", id));
        assert!(!emitter.off("change", id));
        emitter.emit("change", &[]);

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscribe_honours_single_option() {
        let emitter = EventEmitter::new();
        let (count, listener) = counter();
        let source: &dyn EventSource = &emitter;
        source.subscribe("tick", listener, &SubscribeOptions { single: true, options: None });

        emitter.emit("tick", &[]);
        emitter.emit("tick", &[]);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
