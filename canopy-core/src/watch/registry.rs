//! External objects reachable from watch paths.
//!
//! Custom watchers name an external object by dotted path. The path is
//! resolved against the component's own externals first and then against the
//! process-wide [`GlobalRegistry`].

use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;

use crate::reactive::EventSource;

/// An object a watch path can point at.
#[derive(Clone)]
pub enum External {
    /// Something that delivers events.
    Source(Arc<dyn EventSource>),
    /// A named collection of further externals.
    Namespace(IndexMap<String, External>),
    /// Plain data, not subscribable.
    Value(Value),
}

impl External {
    pub fn source<S: EventSource + 'static>(source: S) -> Self {
        External::Source(Arc::new(source))
    }

    /// Follow a dotted path through nested namespaces.
    pub fn walk(&self, path: &str) -> Option<&External> {
        path.split('.').try_fold(self, |current, segment| match current {
            External::Namespace(children) => children.get(segment),
            _ => None,
        })
    }

    /// The event source behind this external, if it is one.
    pub fn as_source(&self) -> Option<Arc<dyn EventSource>> {
        match self {
            External::Source(source) => Some(Arc::clone(source)),
            _ => None,
        }
    }
}

impl std::fmt::Debug for External {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            External::Source(_) => f.write_str("Source(..)"),
            External::Namespace(children) => f.debug_tuple("Namespace").field(&children.keys()).finish(),
            External::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// Process-wide table of named externals.
#[derive(Debug, Default)]
pub struct GlobalRegistry {
    entries: RwLock<IndexMap<String, External>>,
}

static GLOBAL: OnceLock<GlobalRegistry> = OnceLock::new();

impl GlobalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static GlobalRegistry {
        GLOBAL.get_or_init(GlobalRegistry::new)
    }

    /// Register an external under a top-level name, replacing any previous one.
    pub fn insert(&self, name: impl Into<String>, external: External) -> Option<External> {
        self.entries.write().insert(name.into(), external)
    }

    pub fn remove(&self, name: &str) -> Option<External> {
        self.entries.write().shift_remove(name)
    }

    /// Resolve a dotted path.
    pub fn resolve(&self, path: &str) -> Option<External> {
        let entries = self.entries.read();
        match path.split_once('.') {
            Some((head, rest)) => entries.get(head)?.walk(rest).cloned(),
            None => entries.get(path).cloned(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }
}
