//! Template loading.
//!
//! Render functions come from an external [`TemplateProvider`], keyed by
//! component name. Templates may be registered after the component class, so
//! loading polls the provider, yielding to the runtime between attempts.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{json, Value};

use super::instance::Component;
use crate::error::{MetaError, MetaResult};

/// Produces the virtual tree of a component.
pub type RenderFn = Arc<dyn Fn(&Component) -> Value + Send + Sync>;

/// The render functions registered for one component.
#[derive(Clone)]
pub struct TemplateSet {
    index: RenderFn,
}

impl TemplateSet {
    pub fn new<F>(index: F) -> Self
    where
        F: Fn(&Component) -> Value + Send + Sync + 'static,
    {
        Self { index: Arc::new(index) }
    }

    /// The set used when template loading is disabled: an empty element.
    pub fn block() -> Self {
        Self::new(|_| empty_element())
    }

    pub fn render(&self, ctx: &Component) -> Value {
        (self.index)(ctx)
    }
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TemplateSet(..)")
    }
}

pub(crate) fn empty_element() -> Value {
    json!({ "tag": "span" })
}

/// Source of compiled templates.
pub trait TemplateProvider: Send + Sync {
    /// The templates of `component_name`, if they are available yet.
    fn templates(&self, component_name: &str) -> Option<TemplateSet>;
}

/// An in-memory [`TemplateProvider`].
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    sets: DashMap<String, TemplateSet>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, component_name: impl Into<String>, set: TemplateSet) -> Option<TemplateSet> {
        self.sets.insert(component_name.into(), set)
    }

    pub fn remove(&self, component_name: &str) -> Option<TemplateSet> {
        self.sets.remove(component_name).map(|(_, set)| set)
    }
}

impl TemplateProvider for TemplateRegistry {
    fn templates(&self, component_name: &str) -> Option<TemplateSet> {
        self.sets.get(component_name).map(|set| set.value().clone())
    }
}

/// Wait until `provider` has templates for `component_name`.
///
/// Polls once per scheduler turn. With a `limit`, gives up after that many
/// unsuccessful polls.
pub async fn load_templates(
    provider: &dyn TemplateProvider,
    component_name: &str,
    limit: Option<u32>,
) -> MetaResult<TemplateSet> {
    let mut attempts = 0u32;

    loop {
        if let Some(set) = provider.templates(component_name) {
            tracing::trace!(component = component_name, attempts, "templates available");
            return Ok(set);
        }

        attempts += 1;
        if limit.is_some_and(|limit| attempts >= limit) {
            return Err(MetaError::TemplateUnavailable(component_name.to_string()));
        }

        tokio::task::yield_now().await;
    }
}
