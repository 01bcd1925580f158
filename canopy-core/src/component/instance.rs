//! Component instances.
//!
//! A [`Component`] is the runtime context every handler receives. It owns the
//! instance's derived meta, its reactive data (props and fields), the
//! non-reactive system-field store, a local event bus and the async group
//! that scopes every subscription made on its behalf.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::{MetaError, MetaResult};
use crate::meta::{ComponentMeta, Hook};
use crate::reactive::{assign, lookup, lookup_in, AsyncGroup, Data, EventEmitter, EventSource, ReactiveData};
use crate::watch::{External, GlobalRegistry};

/// A live component instance.
pub struct Component {
    meta: Arc<ComponentMeta>,
    config: Arc<EngineConfig>,

    /// Values of a fresh class instance, the last field fallback.
    instance: Data,

    hook: RwLock<Hook>,
    data: ReactiveData,
    system: RwLock<Data>,
    externals: RwLock<IndexMap<String, External>>,
    events: Arc<EventEmitter>,
    async_group: AsyncGroup,

    /// `(watch key, binding index)` pairs already bound.
    bound: Mutex<HashSet<(String, usize)>>,
}

impl Component {
    /// Create an instance of a class, with a private working copy of its meta.
    pub fn new(class_meta: &Arc<ComponentMeta>, config: Arc<EngineConfig>) -> Arc<Self> {
        let meta = Arc::new(ComponentMeta::derive(class_meta));
        let instance = class_meta.instance();

        Arc::new(Self {
            meta,
            config,
            instance,
            hook: RwLock::new(Hook::BeforeRuntime),
            data: ReactiveData::new(),
            system: RwLock::new(Data::new()),
            externals: RwLock::new(IndexMap::new()),
            events: Arc::new(EventEmitter::new()),
            async_group: AsyncGroup::new(),
            bound: Mutex::new(HashSet::new()),
        })
    }

    pub fn name(&self) -> &str {
        self.meta.name()
    }

    /// The instance's derived meta.
    pub fn meta(&self) -> &Arc<ComponentMeta> {
        &self.meta
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn instance(&self) -> &Data {
        &self.instance
    }

    /// The lifecycle hook the instance is currently in.
    pub fn hook(&self) -> Hook {
        *self.hook.read()
    }

    pub(crate) fn set_hook(&self, hook: Hook) {
        *self.hook.write() = hook;
    }

    /// Reactive props and fields.
    pub fn data(&self) -> &ReactiveData {
        &self.data
    }

    /// The local event bus.
    pub fn events(&self) -> &Arc<EventEmitter> {
        &self.events
    }

    pub fn async_group(&self) -> &AsyncGroup {
        &self.async_group
    }

    /// Read a value: reactive data first, then system fields, then accessors.
    pub fn get(&self, path: &str) -> Option<Value> {
        if let Some(value) = self.data.get(path) {
            return Some(value);
        }

        if let Some(value) = lookup(&self.system.read(), path) {
            return Some(value.clone());
        }

        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        let getter = self
            .meta
            .computed(head)
            .or_else(|| self.meta.accessor(head))
            .and_then(|accessor| accessor.get.clone())?;

        let value = getter(self);
        match rest {
            None => Some(value),
            Some(rest) => lookup_in(&value, rest).cloned(),
        }
    }

    /// Write a value through an accessor setter, into the system store or
    /// into reactive data, whichever owns the top-level key.
    pub fn set(&self, path: &str, value: Value) -> bool {
        let head = path.split('.').next().unwrap_or(path);

        if head == path {
            let setter = self
                .meta
                .computed(head)
                .or_else(|| self.meta.accessor(head))
                .and_then(|accessor| accessor.set.clone());

            if let Some(setter) = setter {
                setter(self, value);
                return true;
            }
        }

        if self.system.read().contains_key(head) {
            return assign(&mut self.system.write(), path, value);
        }

        self.data.set(path, value)
    }

    /// Read a system field.
    pub fn system(&self, name: &str) -> Option<Value> {
        self.system.read().get(name).cloned()
    }

    pub(crate) fn set_system_fields(&self, data: Data) {
        self.system.write().extend(data);
    }

    /// Call a component method by name.
    pub async fn call(self: &Arc<Self>, method: &str, args: Vec<Value>) -> MetaResult<Value> {
        let handler = self
            .meta
            .method(method)
            .map(|spec| spec.handler.clone())
            .ok_or_else(|| MetaError::UnknownMethod {
                component: self.name().to_string(),
                method: method.to_string(),
            })?;

        handler(Arc::clone(self), args).await.map_err(|err| MetaError::handler(method, err))
    }

    /// Emit an event on the local bus.
    pub fn emit(&self, event: &str, args: &[Value]) -> usize {
        self.events.emit(event, args)
    }

    /// Make an external object reachable from watch paths on this instance.
    pub fn attach_external(&self, name: impl Into<String>, external: External) {
        self.externals.write().insert(name.into(), external);
    }

    /// Resolve a dotted path against this instance's externals, then against
    /// the global registry.
    pub fn resolve_external(&self, path: &str) -> Option<External> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        let local = self.externals.read().get(head).and_then(|root| match rest {
            Some(rest) => root.walk(rest).cloned(),
            None => Some(root.clone()),
        });

        local.or_else(|| GlobalRegistry::global().resolve(path))
    }

    /// The event source a custom watcher on `path` subscribes to.
    pub(crate) fn event_source(&self, path: Option<&str>) -> Arc<dyn EventSource> {
        path.and_then(|path| self.resolve_external(path))
            .and_then(|external| external.as_source())
            .unwrap_or_else(|| Arc::clone(&self.events) as Arc<dyn EventSource>)
    }

    /// Mark a watch binding as bound. Returns `false` if it already was.
    pub(crate) fn mark_bound(&self, key: &str, index: usize) -> bool {
        self.bound.lock().insert((key.to_string(), index))
    }

    pub(crate) fn is_bound(&self, key: &str, index: usize) -> bool {
        self.bound.lock().contains(&(key.to_string(), index))
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name())
            .field("hook", &self.hook())
            .field("data", &self.data.snapshot())
            .finish()
    }
}
