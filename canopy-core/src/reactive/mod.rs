//! Reactive Primitives
//!
//! This module implements the pieces a component instance observes and is
//! observed through: its reactive data container, event emitters, and the
//! cancellation group that owns every subscription the instance creates.
//!
//! # Concepts
//!
//! ## Reactive Data
//!
//! [`ReactiveData`] holds the values of a component's props and fields. Own
//! field watchers subscribe to a path in it and are notified with the new and
//! old value when a write changes that path.
//!
//! ## Event Sources
//!
//! [`EventSource`] is anything that can deliver named events. Custom watchers
//! on external objects subscribe through it. [`EventEmitter`] is the stock
//! implementation and doubles as each component's local event bus.
//!
//! ## Async Groups
//!
//! [`AsyncGroup`] records tasks, pending futures and listeners under an
//! optional group and label, so a component can release all of them in one
//! call when it is torn down.
//!
//! # Implementation Notes
//!
//! All containers are `Send + Sync` behind `parking_lot` locks. Callbacks are
//! always invoked after the lock that found them is released, so a callback
//! may freely write back into the container that called it.

mod async_group;
mod data;
mod emitter;
mod subscriber;

pub use async_group::{AsyncGroup, AsyncOptions, EntryId};
pub use data::{assign, lookup, lookup_in, Data, ReactiveData, WatchOptions};
pub use emitter::{EventEmitter, EventSource, SubscribeOptions};
pub use subscriber::{Listener, Subscriber, SubscriberId};
