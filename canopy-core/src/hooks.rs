//! Hook Execution
//!
//! Runs the bindings registered under a lifecycle hook as a one-shot
//! [`TaskGraph`]: every binding whose `after` names have completed runs
//! concurrently with the others, and [`run_hook`] resolves once every binding
//! has settled.

use std::sync::Arc;

use serde_json::Value;

use crate::component::Component;
use crate::error::{MetaError, MetaResult};
use crate::graph::TaskGraph;
use crate::meta::{ComponentMeta, Hook};

/// Run the bindings of `hook` registered in `meta` against `ctx`.
///
/// Sets the component's current hook first. Graph errors (unknown `after`
/// names, cycles) are reported before any binding runs. If a binding fails,
/// the bindings waiting on it never start, independent ones still finish,
/// and the first failure is returned.
pub async fn run_hook(hook: Hook, meta: &ComponentMeta, ctx: &Arc<Component>, args: &[Value]) -> MetaResult<()> {
    ctx.set_hook(hook);

    let tag = format!("component:hook:{}:{}", meta.component_name(), hook);
    tracing::debug!(event = %tag);

    let bindings = meta.hooks(hook);
    if bindings.is_empty() {
        return Ok(());
    }

    let mut graph = TaskGraph::new();
    for binding in bindings {
        graph.add_task(binding.name.clone(), binding.after.iter().cloned(), binding.handler.clone());
    }

    let outcome = graph
        .execute(ctx.config().max_concurrent_hooks, |node| {
            let handler = node.payload().clone();
            let ctx = Arc::clone(ctx);
            let args = args.to_vec();
            async move { handler(ctx, args).await.map(drop) }
        })
        .await
        .map_err(|source| MetaError::HookGraph {
            hook: hook.to_string(),
            source,
        })?;

    outcome.map_err(|failure| {
        if !failure.skipped.is_empty() {
            tracing::warn!(event = %tag, skipped = ?failure.skipped, "bindings skipped after a failure");
        }
        MetaError::handler(failure.task, failure.error)
    })
}
