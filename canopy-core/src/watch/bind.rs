//! Binding watch declarations to live subscriptions.

use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::Value;

use super::key::{WatchKey, WatchTarget};
use crate::component::Component;
use crate::error::{MetaError, MetaResult};
use crate::meta::member::MethodFuture;
use crate::meta::{WatchBinding, WatchHandler, WatchParams, WrappedListener};
use crate::reactive::{AsyncOptions, Listener, SubscribeOptions, WatchOptions};

/// Bind every watcher of the component's meta that activates at the current
/// hook.
///
/// Only `beforeCreate`, `created` and `mounted` bind anything. Each binding is
/// bound at most once per instance. Method-name handlers are checked before
/// anything is subscribed; a missing method fails the whole call.
///
/// Bindings whose wrapper hands back a pending listener are installed once it
/// resolves, so not every watcher is necessarily live when this returns.
pub fn bind_watchers(ctx: &Arc<Component>) -> MetaResult<()> {
    let Some(stage) = ctx.hook().watch_stage() else {
        return Ok(());
    };

    let meta = Arc::clone(ctx.meta());
    let mut pending = Vec::new();

    for (key, bindings) in meta.watchers() {
        let parsed = WatchKey::parse(key);
        if parsed.stage != stage {
            continue;
        }

        let unbound: Vec<(usize, &WatchBinding)> = bindings
            .iter()
            .enumerate()
            .filter(|(index, _)| !ctx.is_bound(key, *index))
            .collect();

        for (_, binding) in &unbound {
            if let WatchHandler::Method(name) = &binding.handler {
                if meta.method(name).is_none() {
                    return Err(MetaError::MethodNotFound {
                        key: key.clone(),
                        method: name.clone(),
                    });
                }
            }
        }

        if !unbound.is_empty() {
            pending.push((key.as_str(), parsed, unbound));
        }
    }

    for (key, parsed, bindings) in pending {
        for (index, binding) in bindings {
            if !ctx.mark_bound(key, index) {
                continue;
            }

            tracing::debug!(event = "component:watch", component = ctx.name(), key, index);
            bind(ctx, key, &parsed, binding);
        }
    }

    Ok(())
}

fn bind(ctx: &Arc<Component>, key: &str, parsed: &WatchKey, binding: &WatchBinding) {
    let listener = handler_listener(ctx, binding);
    let mut params = binding.params.clone();

    // An explicit label wins over method names.
    let label = params.label.take().or_else(|| binding.method.clone()).or_else(|| match &binding.handler {
        WatchHandler::Method(name) => Some(name.clone()),
        WatchHandler::Func(_) => None,
    });
    params.label = label.map(|label| format!("[[WATCHER:{key}:{label}]]"));

    let Some(wrapper) = params.wrapper.clone() else {
        install(ctx, parsed, &params, listener);
        return;
    };

    match wrapper(ctx, listener) {
        WrappedListener::Ready(listener) => install(ctx, parsed, &params, listener),
        WrappedListener::Pending(future) => {
            let weak = Arc::downgrade(ctx);
            let parsed = parsed.clone();

            let options = AsyncOptions {
                group: params.group.clone(),
                label: params.label.clone(),
            };

            ctx.async_group().spawn(
                async move {
                    let listener = future.await;
                    if let Some(ctx) = weak.upgrade() {
                        install(&ctx, &parsed, &params, listener);
                    }
                },
                options,
            );
        }
    }
}

/// Turn a binding's handler into a listener that invokes it.
fn handler_listener(ctx: &Arc<Component>, binding: &WatchBinding) -> Listener {
    let weak = Arc::downgrade(ctx);
    let provide_args = binding.params.provide_args;
    let forward = move |args: &[Value]| if provide_args { args.to_vec() } else { Vec::new() };

    match &binding.handler {
        WatchHandler::Method(name) => {
            let name = name.clone();
            let options = AsyncOptions::group(ctx.config().watcher_group.clone()).with_label(name.clone());

            // Calls run on a later turn; a newer call replaces a pending one.
            let listener: Listener = Arc::new(move |args: &[Value]| {
                let Some(ctx) = weak.upgrade() else {
                    return;
                };

                let weak = Arc::downgrade(&ctx);
                let name = name.clone();
                let args = forward(args);

                ctx.async_group().spawn(
                    async move {
                        tokio::task::yield_now().await;

                        let Some(ctx) = weak.upgrade() else {
                            return;
                        };
                        let Some(handler) = ctx.meta().method(&name).map(|spec| spec.handler.clone()) else {
                            return;
                        };

                        if let Err(error) = handler(Arc::clone(&ctx), args).await {
                            report(ctx.name(), &name, &*error);
                        }
                    },
                    options.clone(),
                );
            });
            listener
        }

        WatchHandler::Func(handler) => {
            let handler = handler.clone();
            let name = binding.method.clone().unwrap_or_else(|| "<fn>".to_string());

            let listener: Listener = Arc::new(move |args: &[Value]| {
                let Some(ctx) = weak.upgrade() else {
                    return;
                };

                let task = handler(Arc::clone(&ctx), forward(args));
                dispatch(&ctx, &name, task, AsyncOptions::default());
            });
            listener
        }
    }
}

/// Run a function handler invocation: inline if it completes on first poll,
/// otherwise in the component's async group.
fn dispatch(ctx: &Component, name: &str, mut task: MethodFuture, options: AsyncOptions) {
    match (&mut task).now_or_never() {
        Some(Ok(_)) => {}
        Some(Err(error)) => report(ctx.name(), name, &*error),
        None => {
            let component = ctx.name().to_string();
            let name = name.to_string();

            ctx.async_group().spawn(
                async move {
                    if let Err(error) = task.await {
                        report(&component, &name, &*error);
                    }
                },
                options,
            );
        }
    }
}

fn report(component: &str, handler: &str, error: &(dyn std::error::Error + Send + Sync)) {
    tracing::error!(event = "component:watch", component, handler, %error, "watch handler failed");
}

fn install(ctx: &Arc<Component>, parsed: &WatchKey, params: &WatchParams, listener: Listener) {
    let options = AsyncOptions {
        group: params.group.clone(),
        label: params.label.clone(),
    };

    match &parsed.target {
        WatchTarget::Field(path) => {
            let watch = WatchOptions {
                deep: params.deep,
                immediate: params.immediate,
            };
            let id = ctx.data().watch(path, watch, listener);
            let weak = Arc::downgrade(ctx);

            ctx.async_group().add_cleanup(
                move || {
                    if let Some(ctx) = weak.upgrade() {
                        ctx.data().unwatch(id);
                    }
                },
                options,
            );
        }

        WatchTarget::Event { path, event } => {
            let source = ctx.event_source(path.as_deref());
            let subscribe = SubscribeOptions {
                single: params.single,
                options: params.options.clone(),
            };

            ctx.async_group().on(source, event, listener, &subscribe, options);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    use crate::config::EngineConfig;
    use crate::meta::{method, sync_method, ComponentMeta, ComponentParams, Hook, MethodSpec};
    use crate::reactive::{Data, EventEmitter};
    use crate::watch::External;

    type Calls = Arc<Mutex<Vec<Vec<Value>>>>;

    fn recorder(calls: &Calls) -> crate::meta::MethodFn {
        let calls = Arc::clone(calls);
        sync_method(move |_, args| {
            calls.lock().push(args.to_vec());
            Ok(Value::Null)
        })
    }

    fn component(meta: ComponentMeta) -> Arc<Component> {
        let ctx = Component::new(&Arc::new(meta), Arc::new(EngineConfig::default()));
        let mut data = Data::new();
        data.insert("value".into(), json!(1));
        ctx.data().materialize(data);
        ctx
    }

    fn meta() -> ComponentMeta {
        ComponentMeta::new("BWatch", ComponentParams::default())
    }

    #[test]
    fn bang_key_binds_at_before_create_only_once() {
        let calls: Calls = Arc::default();
        let mut meta = meta();
        meta.add_watcher("!remote:change", WatchBinding::func(recorder(&calls)));
        let ctx = component(meta);

        let remote = Arc::new(EventEmitter::new());
        ctx.attach_external("remote", External::Source(remote.clone()));

        ctx.set_hook(Hook::BeforeCreate);
        bind_watchers(&ctx).unwrap();
        assert_eq!(remote.listener_count("change"), 1);

        bind_watchers(&ctx).unwrap();
        ctx.set_hook(Hook::Created);
        bind_watchers(&ctx).unwrap();
        assert_eq!(remote.listener_count("change"), 1);

        remote.emit("change", &[json!("payload")]);
        assert_eq!(*calls.lock(), vec![vec![json!("payload")]]);
    }

    #[test]
    fn created_keys_wait_for_created() {
        let calls: Calls = Arc::default();
        let mut meta = meta();
        meta.add_watcher("remote:change", WatchBinding::func(recorder(&calls)));
        let ctx = component(meta);

        let remote = Arc::new(EventEmitter::new());
        ctx.attach_external("remote", External::Source(remote.clone()));

        ctx.set_hook(Hook::BeforeCreate);
        bind_watchers(&ctx).unwrap();
        assert_eq!(remote.listener_count("change"), 0);

        ctx.set_hook(Hook::Created);
        bind_watchers(&ctx).unwrap();
        assert_eq!(remote.listener_count("change"), 1);
    }

    #[test]
    fn missing_method_fails_before_subscribing() {
        let calls: Calls = Arc::default();
        let mut meta = meta();
        meta.add_watcher("value", WatchBinding::func(recorder(&calls)));
        meta.add_watcher("value", WatchBinding::method("onClick"));
        let ctx = component(meta);

        ctx.set_hook(Hook::Created);
        let err = bind_watchers(&ctx).unwrap_err();
        assert!(matches!(err, MetaError::MethodNotFound { ref method, .. } if method == "onClick"));
        assert_eq!(ctx.data().watcher_count(), 0);
    }

    #[test]
    fn other_hooks_bind_nothing() {
        let mut meta = meta();
        meta.add_watcher("value", WatchBinding::method("onClick"));
        let ctx = component(meta);

        ctx.set_hook(Hook::BeforeDestroy);
        bind_watchers(&ctx).unwrap();
        assert_eq!(ctx.data().watcher_count(), 0);
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn method_watchers_get_change_args() {
        let calls: Calls = Arc::default();
        let silent: Calls = Arc::default();
        let mut meta = meta();
        meta.insert_method("onValue", MethodSpec::new(recorder(&calls)));
        meta.insert_method("onQuiet", MethodSpec::new(recorder(&silent)));
        meta.add_watcher("value", WatchBinding::method("onValue"));
        meta.add_watcher(
            "value",
            WatchBinding::method("onQuiet").with(WatchParams::default().provide_args(false)),
        );
        let ctx = component(meta);

        ctx.set_hook(Hook::Created);
        bind_watchers(&ctx).unwrap();
        ctx.data().set("value", json!(2));
        settle().await;

        assert_eq!(*calls.lock(), vec![vec![json!(2), json!(1)]]);
        assert_eq!(*silent.lock(), vec![Vec::<Value>::new()]);
    }

    #[tokio::test]
    async fn method_handler_burst_runs_once_on_a_later_turn() {
        let calls: Calls = Arc::default();
        let mut meta = meta();
        meta.insert_method("onValue", MethodSpec::new(recorder(&calls)));
        meta.add_watcher("value", WatchBinding::method("onValue"));
        let ctx = component(meta);

        ctx.set_hook(Hook::Created);
        bind_watchers(&ctx).unwrap();
        ctx.data().set("value", json!(2));
        ctx.data().set("value", json!(3));
        ctx.data().set("value", json!(4));
        assert!(calls.lock().is_empty());

        settle().await;
        assert_eq!(*calls.lock(), vec![vec![json!(4), json!(3)]]);
    }

    #[test]
    fn unresolved_path_falls_back_to_local_events() {
        let calls: Calls = Arc::default();
        let mut meta = meta();
        meta.add_watcher("?:closeAll", WatchBinding::func(recorder(&calls)));
        meta.add_watcher("?nowhere:ping", WatchBinding::func(recorder(&calls)));
        let ctx = component(meta);

        ctx.set_hook(Hook::Created);
        bind_watchers(&ctx).unwrap();
        assert_eq!(ctx.emit("close-all", &[]), 0);

        ctx.set_hook(Hook::Mounted);
        bind_watchers(&ctx).unwrap();
        assert_eq!(ctx.emit("close-all", &[]), 1);
        assert_eq!(ctx.emit("ping", &[]), 1);
        assert_eq!(calls.lock().len(), 2);
    }

    #[test]
    fn ready_wrapper_replaces_the_listener() {
        let calls: Calls = Arc::default();
        let mut meta = meta();
        meta.add_watcher(
            ":tick",
            WatchBinding::func(recorder(&calls)).with(WatchParams::default().wrapper(|_, inner| {
                WrappedListener::Ready(Arc::new(move |args: &[Value]| {
                    inner(args);
                    inner(args);
                }))
            })),
        );
        let ctx = component(meta);

        ctx.set_hook(Hook::Created);
        bind_watchers(&ctx).unwrap();
        ctx.emit("tick", &[]);
        assert_eq!(calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn pending_wrapper_installs_once_resolved() {
        let calls: Calls = Arc::default();
        let mut meta = meta();
        meta.add_watcher(
            ":tick",
            WatchBinding::func(recorder(&calls)).with(WatchParams::default().wrapper(|_, inner| {
                WrappedListener::Pending(Box::pin(async move {
                    tokio::task::yield_now().await;
                    inner
                }))
            })),
        );
        let ctx = component(meta);

        ctx.set_hook(Hook::Created);
        bind_watchers(&ctx).unwrap();
        assert_eq!(ctx.events().listener_count("tick"), 0);

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(ctx.emit("tick", &[]), 1);
        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn pending_wrappers_with_one_label_replace_each_other() {
        let calls: Calls = Arc::default();
        let mut meta = meta();
        let params = WatchParams::default().group("sync").label("tick").wrapper(|_, inner| {
            WrappedListener::Pending(Box::pin(async move {
                tokio::task::yield_now().await;
                inner
            }))
        });
        meta.add_watcher(":tick", WatchBinding::func(recorder(&calls)).with(params.clone()));
        meta.add_watcher(":tick", WatchBinding::func(recorder(&calls)).with(params));
        let ctx = component(meta);

        ctx.set_hook(Hook::Created);
        bind_watchers(&ctx).unwrap();
        assert_eq!(ctx.async_group().len(), 1);

        settle().await;
        assert_eq!(ctx.emit("tick", &[]), 1);
        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn async_method_handlers_run_in_the_watcher_group() {
        let calls: Calls = Arc::default();
        let sink = Arc::clone(&calls);
        let mut meta = meta();
        meta.insert_method(
            "onValue",
            MethodSpec::new(method(move |_, args| {
                let sink = Arc::clone(&sink);
                async move {
                    tokio::task::yield_now().await;
                    sink.lock().push(args);
                    Ok(Value::Null)
                }
            })),
        );
        meta.add_watcher("value", WatchBinding::method("onValue"));
        let ctx = component(meta);

        ctx.set_hook(Hook::Created);
        bind_watchers(&ctx).unwrap();
        ctx.data().set("value", json!(5));
        assert!(calls.lock().is_empty());

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(*calls.lock(), vec![vec![json!(5), json!(1)]]);
    }

    #[test]
    fn labelled_bindings_replace_each_other() {
        let calls: Calls = Arc::default();
        let mut meta = meta();
        let params = WatchParams::default().group("sync").label("value");
        meta.add_watcher("value", WatchBinding::func(recorder(&calls)).with(params.clone()));
        meta.add_watcher("value", WatchBinding::func(recorder(&calls)).with(params));
        let ctx = component(meta);

        ctx.set_hook(Hook::Created);
        bind_watchers(&ctx).unwrap();
        assert_eq!(ctx.data().watcher_count(), 1);
        assert_eq!(ctx.async_group().len(), 1);
    }

    #[test]
    fn clearing_the_group_unsubscribes_everything() {
        let calls: Calls = Arc::default();
        let mut meta = meta();
        meta.add_watcher("value", WatchBinding::func(recorder(&calls)));
        meta.add_watcher("!remote:change", WatchBinding::func(recorder(&calls)));
        let ctx = component(meta);

        let remote = Arc::new(EventEmitter::new());
        ctx.attach_external("remote", External::Source(remote.clone()));

        ctx.set_hook(Hook::BeforeCreate);
        bind_watchers(&ctx).unwrap();
        ctx.set_hook(Hook::Created);
        bind_watchers(&ctx).unwrap();
        assert_eq!(ctx.async_group().len(), 2);

        ctx.async_group().clear_all();
        assert_eq!(remote.listener_count("change"), 0);
        assert_eq!(ctx.data().watcher_count(), 0);

        ctx.data().set("value", json!(9));
        remote.emit("change", &[]);
        assert!(calls.lock().is_empty());
    }
}
