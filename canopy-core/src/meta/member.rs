//! Member declarations stored in a [`ComponentMeta`](super::ComponentMeta).
//!
//! Handlers are reference-counted closures, so cloning a spec (for example
//! when a derived descriptor copies its parent's hook lists) never clones the
//! code behind it.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use super::hook::Hook;
use crate::component::Component;
use crate::error::HandlerError;
use crate::fields::InitContext;
use crate::reactive::Listener;

/// Future returned by a [`MethodFn`].
pub type MethodFuture = BoxFuture<'static, Result<Value, HandlerError>>;

/// An async method: called with the component and its arguments.
pub type MethodFn = Arc<dyn Fn(Arc<Component>, Vec<Value>) -> MethodFuture + Send + Sync>;

/// Field initializer. `None` means "no value", triggering the fallbacks.
pub type FieldInitFn = Arc<dyn Fn(&InitContext<'_>) -> Option<Value> + Send + Sync>;

/// Field merge: `(ctx, old_ctx, field, link)`, returning the carried value.
pub type FieldMergeFn =
    Arc<dyn Fn(&Component, &Component, &str, Option<&str>) -> Option<Value> + Send + Sync>;

/// Decides whether a field is unique to `(ctx, old_ctx)`.
pub type UniqueFn = Arc<dyn Fn(&Component, &Component) -> bool + Send + Sync>;

pub type GetterFn = Arc<dyn Fn(&Component) -> Value + Send + Sync>;
pub type SetterFn = Arc<dyn Fn(&Component, Value) + Send + Sync>;

/// Transforms a bound watch handler before it is installed.
pub type WatchWrapper = Arc<dyn Fn(&Arc<Component>, Listener) -> WrappedListener + Send + Sync>;

/// What a [`WatchWrapper`] hands back.
pub enum WrappedListener {
    Ready(Listener),
    /// Installed once the future resolves.
    Pending(BoxFuture<'static, Listener>),
}

/// Build a [`MethodFn`] from an async closure.
pub fn method<F, Fut>(f: F) -> MethodFn
where
    F: Fn(Arc<Component>, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    Arc::new(move |ctx: Arc<Component>, args: Vec<Value>| -> MethodFuture { Box::pin(f(ctx, args)) })
}

/// Build a [`MethodFn`] from a synchronous closure.
pub fn sync_method<F>(f: F) -> MethodFn
where
    F: Fn(&Arc<Component>, &[Value]) -> Result<Value, HandlerError> + Send + Sync + 'static,
{
    Arc::new(move |ctx: Arc<Component>, args: Vec<Value>| -> MethodFuture {
        let result = f(&ctx, &args);
        Box::pin(async move { result })
    })
}

/// Whether a field is excluded from state carried between instances.
#[derive(Clone, Default)]
pub enum Unique {
    #[default]
    No,
    Yes,
    When(UniqueFn),
}

impl Unique {
    pub fn check(&self, ctx: &Component, old_ctx: &Component) -> bool {
        match self {
            Unique::No => false,
            Unique::Yes => true,
            Unique::When(f) => f(ctx, old_ctx),
        }
    }
}

/// Options shared by every kind of watch declaration.
#[derive(Clone)]
pub struct WatchParams {
    pub deep: bool,
    pub immediate: bool,
    /// Forward change arguments to the handler.
    pub provide_args: bool,
    pub group: Option<String>,
    pub label: Option<String>,
    pub single: bool,
    /// Listener options passed to the event source untouched.
    pub options: Option<Value>,
    pub wrapper: Option<WatchWrapper>,
}

impl Default for WatchParams {
    fn default() -> Self {
        Self {
            deep: false,
            immediate: false,
            provide_args: true,
            group: None,
            label: None,
            single: false,
            options: None,
            wrapper: None,
        }
    }
}

impl WatchParams {
    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    pub fn provide_args(mut self, provide: bool) -> Self {
        self.provide_args = provide;
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    pub fn wrapper<F>(mut self, wrapper: F) -> Self
    where
        F: Fn(&Arc<Component>, Listener) -> WrappedListener + Send + Sync + 'static,
    {
        self.wrapper = Some(Arc::new(wrapper));
        self
    }
}

/// The handler of a watch binding.
#[derive(Clone)]
pub enum WatchHandler {
    /// Name of a component method, resolved when the watcher is bound.
    Method(String),
    Func(MethodFn),
}

/// One watch declaration in a meta's `watchers` table.
#[derive(Clone)]
pub struct WatchBinding {
    pub handler: WatchHandler,
    /// Owning method, for bindings lifted from a method declaration.
    pub method: Option<String>,
    pub params: WatchParams,
}

impl WatchBinding {
    /// Watch with a named component method.
    pub fn method(name: impl Into<String>) -> Self {
        Self {
            handler: WatchHandler::Method(name.into()),
            method: None,
            params: WatchParams::default(),
        }
    }

    /// Watch with a function.
    pub fn func(handler: MethodFn) -> Self {
        Self {
            handler: WatchHandler::Func(handler),
            method: None,
            params: WatchParams::default(),
        }
    }

    pub fn with(mut self, params: WatchParams) -> Self {
        self.params = params;
        self
    }
}

/// A watcher declared directly on a prop or field.
#[derive(Clone)]
pub struct FieldWatcher {
    pub handler: MethodFn,
    pub params: WatchParams,
}

/// One handler registered under a hook.
#[derive(Clone)]
pub struct HookBinding {
    pub handler: MethodFn,
    pub name: Option<String>,
    /// Names of sibling bindings that must complete first.
    pub after: IndexSet<String>,
}

impl HookBinding {
    pub fn new(handler: MethodFn) -> Self {
        Self {
            handler,
            name: None,
            after: IndexSet::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn after<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after.extend(names.into_iter().map(Into::into));
        self
    }
}

/// A hook registration declared on a method.
#[derive(Debug, Clone, Default)]
pub struct MethodHook {
    pub name: Option<String>,
    pub after: IndexSet<String>,
}

/// A component method together with its inline watch and hook declarations.
#[derive(Clone)]
pub struct MethodSpec {
    pub handler: MethodFn,
    pub watchers: IndexMap<String, WatchParams>,
    pub hooks: IndexMap<Hook, MethodHook>,
}

impl MethodSpec {
    pub fn new(handler: MethodFn) -> Self {
        Self {
            handler,
            watchers: IndexMap::new(),
            hooks: IndexMap::new(),
        }
    }

    /// Call this method whenever `key` changes.
    pub fn watch(mut self, key: impl Into<String>, params: WatchParams) -> Self {
        self.watchers.insert(key.into(), params);
        self
    }

    /// Run this method at `hook`.
    pub fn hook(mut self, hook: Hook, registration: MethodHook) -> Self {
        self.hooks.insert(hook, registration);
        self
    }
}

/// A getter/setter pair.
#[derive(Clone, Default)]
pub struct Accessor {
    pub get: Option<GetterFn>,
    pub set: Option<SetterFn>,
}

impl Accessor {
    pub fn getter<F>(get: F) -> Self
    where
        F: Fn(&Component) -> Value + Send + Sync + 'static,
    {
        Self {
            get: Some(Arc::new(get)),
            set: None,
        }
    }

    pub fn with_setter<F>(mut self, set: F) -> Self
    where
        F: Fn(&Component, Value) + Send + Sync + 'static,
    {
        self.set = Some(Arc::new(set));
        self
    }
}

/// Specification of a prop, field or system field.
#[derive(Clone, Default)]
pub struct FieldSpec {
    /// Initialized before every non-atom field.
    pub atom: bool,
    pub default: Option<Value>,
    pub init: Option<FieldInitFn>,
    pub merge: Option<FieldMergeFn>,
    pub unique: Unique,
    /// Sibling fields that must be present before this one initializes.
    pub after: IndexSet<String>,
    /// Props only: a value must be available when the instance is created.
    pub required: bool,
    pub watchers: Vec<FieldWatcher>,
}

impl FieldSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn init<F>(mut self, init: F) -> Self
    where
        F: Fn(&InitContext<'_>) -> Option<Value> + Send + Sync + 'static,
    {
        self.init = Some(Arc::new(init));
        self
    }

    pub fn merge<F>(mut self, merge: F) -> Self
    where
        F: Fn(&Component, &Component, &str, Option<&str>) -> Option<Value> + Send + Sync + 'static,
    {
        self.merge = Some(Arc::new(merge));
        self
    }

    pub fn unique(mut self, unique: Unique) -> Self {
        self.unique = unique;
        self
    }

    pub fn after<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.after.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn watch(mut self, handler: MethodFn, params: WatchParams) -> Self {
        self.watchers.push(FieldWatcher { handler, params });
        self
    }

    /// Whether the field can be filled without running an initializer.
    pub(crate) fn is_eager(&self, in_instance: bool) -> bool {
        self.atom || (self.init.is_none() && (self.default.is_some() || in_instance))
    }
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("atom", &self.atom)
            .field("default", &self.default)
            .field("init", &self.init.is_some())
            .field("after", &self.after)
            .field("required", &self.required)
            .field("watchers", &self.watchers.len())
            .finish()
    }
}

impl std::fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let handler = match &self.handler {
            WatchHandler::Method(name) => name.as_str(),
            WatchHandler::Func(_) => "<fn>",
        };

        f.debug_struct("WatchBinding")
            .field("handler", &handler)
            .field("method", &self.method)
            .field("deep", &self.params.deep)
            .field("immediate", &self.params.immediate)
            .finish()
    }
}

impl std::fmt::Debug for HookBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookBinding")
            .field("name", &self.name)
            .field("after", &self.after)
            .finish()
    }
}
