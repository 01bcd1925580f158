//! Renderer-facing component options.
//!
//! [`assemble`] turns a registered class meta into [`ComponentOptions`]: the
//! object a renderer drives through the lifecycle. Each callback runs the
//! hook bindings of its checkpoint followed by the method named after the
//! checkpoint, if the component has one. `beforeCreate`, `created` and
//! `mounted` also bind the watchers of their stage.
//!
//! Handler failures inside a callback are logged and swallowed. Configuration
//! errors (unknown watcher methods, unsatisfiable fields, broken hook graphs)
//! are returned to the renderer.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::instance::Component;
use super::template::{empty_element, load_templates, TemplateProvider, TemplateSet};
use crate::config::EngineConfig;
use crate::error::{MetaError, MetaResult};
use crate::fields::{init_fields, merge_fields};
use crate::hooks::run_hook;
use crate::meta::{ComponentMeta, Hook};
use crate::reactive::Data;
use crate::watch::bind_watchers;

/// Everything a renderer needs to instantiate one component class.
pub struct ComponentOptions {
    meta: Arc<ComponentMeta>,
    config: Arc<EngineConfig>,
    mods: IndexMap<String, Option<String>>,
    templates: Option<TemplateSet>,
}

/// Build the options of a registered, non-abstract component.
///
/// Waits for the component's templates unless it has a `render` method or
/// template loading is disabled in its params.
pub async fn assemble(
    meta: &Arc<ComponentMeta>,
    provider: &dyn TemplateProvider,
    config: Arc<EngineConfig>,
) -> MetaResult<ComponentOptions> {
    if meta.is_abstract() {
        return Err(MetaError::AbstractComponent(meta.name().to_string()));
    }

    let templates = if meta.method("render").is_some() {
        None
    } else if !meta.params().tpl {
        Some(TemplateSet::block())
    } else {
        Some(load_templates(provider, meta.component_name(), config.template_poll_limit).await?)
    };

    tracing::debug!(
        event = %format!("component:load:{}", meta.component_name()),
        functional = meta.is_functional()
    );

    Ok(ComponentOptions {
        meta: Arc::clone(meta),
        mods: meta.mods().defaults(),
        config,
        templates,
    })
}

impl ComponentOptions {
    pub fn name(&self) -> &str {
        self.meta.name()
    }

    /// The class meta the options were assembled from.
    pub fn meta(&self) -> &Arc<ComponentMeta> {
        &self.meta
    }

    /// Default value of every declared modifier.
    pub fn mods(&self) -> &IndexMap<String, Option<String>> {
        &self.mods
    }

    pub fn inherit_attrs(&self) -> bool {
        self.meta.params().inherit_attrs
    }

    /// Create a fresh, not yet initialized instance.
    ///
    /// Externals the instance's watchers refer to should be attached before
    /// [`before_create`](Self::before_create) runs.
    pub fn instantiate(&self) -> Arc<Component> {
        Component::new(&self.meta, Arc::clone(&self.config))
    }

    /// Run `beforeRuntime`, resolve props, initialize system fields, bind the
    /// `!`-prefixed watchers and run `beforeCreate`.
    pub async fn before_create(&self, ctx: &Arc<Component>, props: Data) -> MetaResult<()> {
        self.checkpoint(Hook::BeforeRuntime, ctx, &[]).await?;
        init_props(ctx, props)?;
        self.bound_checkpoint(Hook::BeforeCreate, ctx).await
    }

    /// Initialize the instance's fields and make them reactive.
    ///
    /// Returns the initialized fields.
    pub async fn data(&self, ctx: &Arc<Component>) -> MetaResult<Data> {
        let fields = init_data(ctx)?;
        self.checkpoint(Hook::BeforeDataCreate, ctx, &[]).await?;
        Ok(fields)
    }

    /// Whether the options describe a functional component.
    pub fn is_functional(&self) -> bool {
        self.meta.is_functional()
    }

    /// Render a fresh instance straight from its props.
    ///
    /// This is how functional components are drawn: props, system fields and
    /// fields are initialized, but no hook runs and no watcher is bound.
    pub async fn render_functional(&self, props: Data) -> MetaResult<Value> {
        let ctx = self.instantiate();
        init_props(&ctx, props)?;
        init_data(&ctx)?;
        self.render(&ctx).await
    }

    /// Carry field state over from a previous instance of the component.
    ///
    /// Returns how many fields were carried.
    pub fn restore(&self, ctx: &Component, old_ctx: &Component) -> usize {
        let fields = ctx.meta().fields();
        let carried = merge_fields(&fields, ctx, old_ctx, Data::new());
        let count = carried.len();

        for (name, value) in carried {
            ctx.data().set(&name, value);
        }

        count
    }

    pub async fn created(&self, ctx: &Arc<Component>) -> MetaResult<()> {
        self.bound_checkpoint(Hook::Created, ctx).await
    }

    pub async fn before_mount(&self, ctx: &Arc<Component>) -> MetaResult<()> {
        self.checkpoint(Hook::BeforeMount, ctx, &[]).await
    }

    pub async fn mounted(&self, ctx: &Arc<Component>) -> MetaResult<()> {
        self.bound_checkpoint(Hook::Mounted, ctx).await
    }

    pub async fn before_update(&self, ctx: &Arc<Component>) -> MetaResult<()> {
        self.checkpoint(Hook::BeforeUpdate, ctx, &[]).await
    }

    pub async fn updated(&self, ctx: &Arc<Component>) -> MetaResult<()> {
        self.checkpoint(Hook::Updated, ctx, &[]).await
    }

    pub async fn activated(&self, ctx: &Arc<Component>) -> MetaResult<()> {
        self.checkpoint(Hook::Activated, ctx, &[]).await
    }

    pub async fn deactivated(&self, ctx: &Arc<Component>) -> MetaResult<()> {
        self.checkpoint(Hook::Deactivated, ctx, &[]).await
    }

    /// Cancel everything registered in the instance's async group, then run
    /// `beforeDestroy`.
    pub async fn before_destroy(&self, ctx: &Arc<Component>) -> MetaResult<()> {
        let cleared = ctx.async_group().clear_all();
        tracing::trace!(component = ctx.name(), cleared, "async group cleared");
        self.checkpoint(Hook::BeforeDestroy, ctx, &[]).await
    }

    pub async fn destroyed(&self, ctx: &Arc<Component>) -> MetaResult<()> {
        self.checkpoint(Hook::Destroyed, ctx, &[]).await
    }

    pub async fn error_captured(&self, ctx: &Arc<Component>, args: &[Value]) -> MetaResult<()> {
        self.checkpoint(Hook::ErrorCaptured, ctx, args).await
    }

    /// Render the instance: its `render` method when it has one, else its
    /// templates.
    pub async fn render(&self, ctx: &Arc<Component>) -> MetaResult<Value> {
        if ctx.meta().method("render").is_some() {
            return ctx.call("render", Vec::new()).await;
        }

        Ok(match &self.templates {
            Some(templates) => templates.render(ctx),
            None => empty_element(),
        })
    }

    /// Set the hook and bind its watchers before running it.
    async fn bound_checkpoint(&self, hook: Hook, ctx: &Arc<Component>) -> MetaResult<()> {
        ctx.set_hook(hook);
        bind_watchers(ctx)?;
        self.checkpoint(hook, ctx, &[]).await
    }

    async fn checkpoint(&self, hook: Hook, ctx: &Arc<Component>, args: &[Value]) -> MetaResult<()> {
        let result = match run_hook(hook, ctx.meta(), ctx, args).await {
            Ok(()) => self.call_hook_method(hook, ctx, args).await,
            Err(err) => Err(err),
        };

        match result {
            Err(err) if !err.is_fatal() => {
                tracing::error!(component = ctx.name(), %hook, error = %err, "lifecycle handler failed");
                Ok(())
            }
            other => other,
        }
    }

    async fn call_hook_method(&self, hook: Hook, ctx: &Arc<Component>, args: &[Value]) -> MetaResult<()> {
        if matches!(hook, Hook::BeforeRuntime | Hook::BeforeDataCreate) {
            return Ok(());
        }

        if ctx.meta().method(hook.as_str()).is_none() {
            return Ok(());
        }

        ctx.call(hook.as_str(), args.to_vec()).await.map(drop)
    }
}

impl std::fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("name", &self.name())
            .field("functional", &self.is_functional())
            .field("mods", &self.mods)
            .field("templates", &self.templates.is_some())
            .finish()
    }
}

/// Resolve props into the data object and initialize system fields.
fn init_props(ctx: &Arc<Component>, props: Data) -> MetaResult<()> {
    let props = resolve_props(ctx, props)?;
    ctx.data().materialize(props);

    let system_fields = ctx.meta().system_fields();
    let system = init_fields(&system_fields, ctx, ctx.instance(), Data::new())?;
    ctx.set_system_fields(system);
    Ok(())
}

/// Initialize fields and make them reactive next to the props.
fn init_data(ctx: &Arc<Component>) -> MetaResult<Data> {
    let fields_table = ctx.meta().fields();
    let fields = init_fields(&fields_table, ctx, ctx.instance(), Data::new())?;

    let mut data = ctx.data().snapshot();
    data.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
    ctx.data().materialize(data);
    Ok(fields)
}

/// Supplied value, else the declared default, else the instance value.
fn resolve_props(ctx: &Component, mut supplied: Data) -> MetaResult<Data> {
    let meta = ctx.meta();
    let mut props = Data::new();

    for (name, spec) in meta.props() {
        let value = supplied
            .shift_remove(name)
            .or_else(|| spec.default.clone())
            .or_else(|| ctx.instance().get(name).cloned());

        match value {
            Some(value) => {
                props.insert(name.to_string(), value);
            }
            None if spec.required => {
                return Err(MetaError::MissingProp {
                    component: meta.name().to_string(),
                    prop: name.to_string(),
                });
            }
            None => {
                props.insert(name.to_string(), Value::Null);
            }
        }
    }

    if !supplied.is_empty() {
        tracing::trace!(component = meta.name(), ignored = ?supplied.keys().collect::<Vec<_>>(), "undeclared props");
    }

    Ok(props)
}
