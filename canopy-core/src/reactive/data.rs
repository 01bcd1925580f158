//! Reactive Data
//!
//! The per-instance data container. It holds the values of a component's
//! props and fields and notifies watchers when a value changes.
//!
//! # Paths
//!
//! Values are addressed by dotted paths: `user.name` reads the `name` key of
//! the object stored in field `user`; numeric segments index arrays.
//!
//! # When Watchers Fire
//!
//! For a watcher on path `W` and a write to path `M`:
//!
//! - `M == W`, or `M` is a parent of `W`: fires when the value at `W` changed.
//! - `W` is a parent of `M`: fires only for `deep` watchers.
//!
//! Listeners receive `[new, old]`, with `null` standing in for a missing
//! value. They are invoked after the write lock is released, so a listener
//! may write back into the same container.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use smallvec::SmallVec;

use super::subscriber::{Listener, Subscriber, SubscriberId};

/// A data object: field name to value, in declaration order.
pub type Data = IndexMap<String, Value>;

type Path = SmallVec<[String; 4]>;

fn split(path: &str) -> Path {
    path.split('.').map(str::to_string).collect()
}

/// Read the value at a dotted path.
pub fn lookup<'a>(data: &'a Data, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        Some((head, rest)) => lookup_in(data.get(head)?, rest),
        None => data.get(path),
    }
}

/// Read the value at a dotted path below `value`.
pub fn lookup_in<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    })
}

/// Write a value at a dotted path, creating intermediate objects.
///
/// Returns `false` when an intermediate segment holds a scalar or indexes
/// past the end of an array.
pub fn assign(data: &mut Data, path: &str, value: Value) -> bool {
    let segments = split(path);
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    if parents.is_empty() {
        data.insert(last.clone(), value);
        return true;
    }

    let mut current = data
        .entry(parents[0].clone())
        .or_insert_with(|| Value::Object(Default::default()));

    for segment in parents[1..].iter().chain(std::iter::once(last)) {
        if current.is_null() {
            *current = Value::Object(Default::default());
        }

        let is_last = std::ptr::eq(segment, last);
        let slot = match current {
            Value::Object(map) => {
                if is_last {
                    map.insert(segment.clone(), value);
                    return true;
                }
                map.entry(segment.clone()).or_insert(Value::Null)
            }
            Value::Array(items) => {
                let Some(slot) = segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)) else {
                    return false;
                };
                if is_last {
                    *slot = value;
                    return true;
                }
                slot
            }
            _ => return false,
        };

        current = slot;
    }

    false
}

/// Options for a data watcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Also fire on writes below the watched path.
    pub deep: bool,
    /// Fire once with the current value right after subscribing.
    pub immediate: bool,
}

#[derive(Debug)]
struct Watch {
    path: Path,
    deep: bool,
    subscriber: Subscriber,
}

/// A reactive container for one component instance's data.
#[derive(Debug, Default)]
pub struct ReactiveData {
    values: RwLock<Data>,
    watchers: RwLock<Vec<Watch>>,
}

impl ReactiveData {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all values at once without notifying watchers.
    ///
    /// This is how a freshly initialized data object becomes reactive.
    pub fn materialize(&self, data: Data) {
        *self.values.write() = data;
    }

    /// Get the value at a path.
    pub fn get(&self, path: &str) -> Option<Value> {
        lookup(&self.values.read(), path).cloned()
    }

    /// Whether a top-level field is present.
    pub fn contains(&self, field: &str) -> bool {
        self.values.read().contains_key(field)
    }

    /// Copy of all values.
    pub fn snapshot(&self) -> Data {
        self.values.read().clone()
    }

    /// Write a value and notify watchers.
    ///
    /// Returns `false` if the path could not be written.
    pub fn set(&self, path: &str, value: Value) -> bool {
        let target = split(path);
        let mut pending = Vec::new();

        {
            let mut values = self.values.write();
            let watchers = self.watchers.read();

            let affected: Vec<(&Watch, Value)> = watchers
                .iter()
                .filter(|w| is_prefix(&target, &w.path) || (w.deep && is_prefix(&w.path, &target)))
                .map(|w| {
                    let old = lookup(&values, &w.path.join(".")).cloned().unwrap_or(Value::Null);
                    (w, old)
                })
                .collect();

            if !assign(&mut values, path, value) {
                return false;
            }

            for (watch, old) in affected {
                let new = lookup(&values, &watch.path.join(".")).cloned().unwrap_or(Value::Null);
                let nested = watch.path.len() < target.len();

                if new != old || nested {
                    pending.push((watch.subscriber.clone(), [new, old]));
                }
            }
        }

        for (subscriber, args) in pending {
            subscriber.notify(&args);
        }

        true
    }

    /// Register a watcher on a path.
    pub fn watch(&self, path: &str, options: WatchOptions, listener: Listener) -> SubscriberId {
        let subscriber = Subscriber::new(listener);
        let id = subscriber.id();

        self.watchers.write().push(Watch {
            path: split(path),
            deep: options.deep,
            subscriber: subscriber.clone(),
        });

        if options.immediate {
            let current = self.get(path).unwrap_or(Value::Null);
            subscriber.notify(&[current, Value::Null]);
        }

        id
    }

    /// Remove a watcher.
    pub fn unwatch(&self, id: SubscriberId) -> bool {
        let mut watchers = self.watchers.write();
        let before = watchers.len();
        watchers.retain(|w| w.subscriber.id() != id);
        watchers.len() != before
    }

    /// Get the number of watchers.
    pub fn watcher_count(&self) -> usize {
        self.watchers.read().len()
    }
}

fn is_prefix(prefix: &[String], path: &[String]) -> bool {
    prefix.len() <= path.len() && prefix.iter().zip(path).all(|(a, b)| a == b)
}
