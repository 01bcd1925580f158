//! Subscriber types for the reactive system.
//!
//! A Subscriber is any callback registered on reactive data or on an event
//! source: field watchers, event listeners, bound watch handlers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

/// Callback invoked with the arguments of a change or an event.
pub type Listener = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Unique identifier for a subscriber.
///
/// Used to remove a subscription later without holding on to the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// A registered callback together with its id.
#[derive(Clone)]
pub struct Subscriber {
    id: SubscriberId,
    listener: Listener,
}

impl Subscriber {
    /// Create a new subscriber for the given listener.
    pub fn new(listener: Listener) -> Self {
        Self {
            id: SubscriberId::new(),
            listener,
        }
    }

    /// Get the subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Invoke the listener.
    pub fn notify(&self, args: &[Value]) {
        (self.listener)(args);
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish()
    }
}
