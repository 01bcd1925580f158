//! Meta Registry
//!
//! Holds one descriptor per component class. Classes are identified by their
//! class name; components by their composed name (explicit `name` param or
//! the dasherized class name).
//!
//! A class may be declared again, which replaces its descriptor. A composed
//! name may not be claimed by two different classes.
//!
//! Functional twins of smart components are kept apart from the class table,
//! so nothing can inherit from them. Root components are only reachable
//! through [`MetaRegistry::root`].
//!
//! Every registration emits a `constructor` event on [`MetaRegistry::events`]
//! with the component name and the class name as arguments.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use serde_json::json;

use super::descriptor::ComponentMeta;
use crate::error::{MetaError, MetaResult};
use crate::reactive::EventEmitter;

/// Event emitted for every registered descriptor.
pub const DECLARE_EVENT: &str = "constructor";

/// Registry of class descriptors.
#[derive(Debug, Default)]
pub struct MetaRegistry {
    /// Class name to descriptor.
    classes: DashMap<String, Arc<ComponentMeta>>,
    /// Composed component name to class name.
    names: DashMap<String, String>,
    /// Functional twins by component name.
    twins: DashMap<String, Arc<ComponentMeta>>,
    events: EventEmitter,
}

static GLOBAL: OnceLock<MetaRegistry> = OnceLock::new();

impl MetaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static MetaRegistry {
        GLOBAL.get_or_init(MetaRegistry::new)
    }

    /// Register a finished descriptor.
    pub fn register(&self, meta: ComponentMeta) -> MetaResult<Arc<ComponentMeta>> {
        let class = meta.class_name().to_string();
        let name = meta.name().to_string();

        match self.names.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(owner) if owner.get() != &class => {
                return Err(MetaError::DuplicateComponent {
                    name,
                    class: owner.get().clone(),
                });
            }
            entry => {
                entry.insert(class.clone());
            }
        }

        let meta = Arc::new(meta);
        if meta.is_twin() {
            self.twins.insert(name.clone(), Arc::clone(&meta));
        } else if let Some(previous) = self.classes.insert(class.clone(), Arc::clone(&meta)) {
            // A re-declared class may have been renamed; release its old name.
            if previous.name() != name {
                self.names.remove_if(previous.name(), |_, owner| owner == &class);
            }
        }

        tracing::debug!(event = "component:register", %class, %name, root = meta.params().root);
        self.events.emit(DECLARE_EVENT, &[json!(name), json!(class)]);
        Ok(meta)
    }

    /// Get the descriptor of a class.
    pub fn class(&self, class_name: &str) -> Option<Arc<ComponentMeta>> {
        self.classes.get(class_name).map(|entry| Arc::clone(entry.value()))
    }

    /// Get a non-root descriptor by component name.
    pub fn component(&self, name: &str) -> Option<Arc<ComponentMeta>> {
        self.named(name).filter(|meta| !meta.params().root)
    }

    /// Get a root descriptor by component name.
    pub fn root(&self, name: &str) -> Option<Arc<ComponentMeta>> {
        self.named(name).filter(|meta| meta.params().root)
    }

    /// Names of the registered root components.
    pub fn roots(&self) -> Vec<String> {
        let mut roots: Vec<String> = self
            .classes
            .iter()
            .filter(|entry| entry.value().params().root)
            .map(|entry| entry.value().name().to_string())
            .collect();
        roots.sort();
        roots
    }

    fn named(&self, name: &str) -> Option<Arc<ComponentMeta>> {
        if let Some(twin) = self.twins.get(name) {
            return Some(Arc::clone(twin.value()));
        }

        let class = self.names.get(name)?.value().clone();
        self.class(&class)
    }

    /// Declaration notifications.
    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub fn contains_class(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}
