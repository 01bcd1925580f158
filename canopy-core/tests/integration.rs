//! Integration Tests for the Component Lifecycle
//!
//! These tests declare component classes, assemble them and drive instances
//! through the lifecycle the way a renderer would.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use canopy_core::collector::ClassDecl;
use canopy_core::component::{assemble, Component, ComponentOptions, TemplateRegistry, TemplateSet};
use canopy_core::config::EngineConfig;
use canopy_core::error::MetaError;
use canopy_core::meta::{
    sync_method, ComponentParams, FieldSpec, Functional, Hook, HookBinding, MetaRegistry, MethodHook, MethodSpec,
    ModValue, Unique, WatchBinding, WatchParams, DECLARE_EVENT,
};
use canopy_core::reactive::{Data, EventEmitter};
use canopy_core::watch::{External, GlobalRegistry};

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, entry: &str) -> MethodSpec {
    let log = Arc::clone(log);
    let entry = entry.to_string();
    MethodSpec::new(sync_method(move |_, _| {
        log.lock().push(entry.clone());
        Ok(Value::Null)
    }))
}

fn no_templates() -> ComponentParams {
    ComponentParams {
        tpl: false,
        ..Default::default()
    }
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

async fn create(options: &ComponentOptions, props: Data) -> Arc<Component> {
    let ctx = options.instantiate();
    options.before_create(&ctx, props).await.unwrap();
    options.data(&ctx).await.unwrap();
    options.created(&ctx).await.unwrap();
    ctx
}

/// Test a full lifecycle through an inherited class.
#[tokio::test]
async fn inherited_component_runs_full_lifecycle() {
    let log: Log = Arc::default();
    let registry = MetaRegistry::new();

    ClassDecl::new("IInput")
        .params(ComponentParams {
            name: Some("i-input".into()),
            ..Default::default()
        })
        .prop("value", FieldSpec::new().default_value(json!("")))
        .field("history", FieldSpec::new().default_value(json!([])))
        .method(
            "initBase",
            record(&log, "base:mounted").hook(Hook::Mounted, MethodHook {
                name: Some("base".into()),
                ..Default::default()
            }),
        )
        .declare(&registry)
        .unwrap();

    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changes);

    let meta = ClassDecl::new("BInput")
        .extends("IInput")
        .field(
            "length",
            FieldSpec::new()
                .init(|cx| Some(json!(cx.ctx().get("value")?.as_str()?.len())))
                .after(["history"]),
        )
        .method(
            "onValue",
            MethodSpec::new(sync_method(move |_, args| {
                sink.lock().push(args.to_vec());
                Ok(Value::Null)
            }))
            .watch("value", WatchParams::default()),
        )
        .method(
            "initSelf",
            record(&log, "self:mounted").hook(Hook::Mounted, MethodHook {
                name: None,
                after: ["base".to_string()].into_iter().collect(),
            }),
        )
        .method("created", record(&log, "created"))
        .method("destroyed", record(&log, "destroyed"))
        .mods("size", [ModValue::value("s"), ModValue::default_value("m")])
        .declare(&registry)
        .unwrap();

    let templates = TemplateRegistry::new();
    templates.insert("b-input", TemplateSet::new(|ctx| json!({ "tag": "input", "value": ctx.get("value") })));

    let options = assemble(&meta, &templates, Arc::new(EngineConfig::default())).await.unwrap();
    assert_eq!(options.mods()["size"], Some("m".to_string()));

    let mut props = Data::new();
    props.insert("value".into(), json!("abc"));
    let ctx = create(&options, props).await;

    assert_eq!(ctx.get("length"), Some(json!(3)));
    assert_eq!(ctx.get("history"), Some(json!([])));

    options.before_mount(&ctx).await.unwrap();
    options.mounted(&ctx).await.unwrap();
    assert_eq!(*log.lock(), vec!["created", "base:mounted", "self:mounted"]);

    ctx.set("value", json!("abcd"));
    assert_eq!(*changes.lock(), vec![vec![json!("abcd"), json!("abc")]]);
    assert_eq!(
        options.render(&ctx).await.unwrap(),
        json!({ "tag": "input", "value": "abcd" })
    );

    options.before_destroy(&ctx).await.unwrap();
    options.destroyed(&ctx).await.unwrap();

    ctx.set("value", json!("ignored"));
    assert_eq!(changes.lock().len(), 1);
    assert_eq!(log.lock().last().map(String::as_str), Some("destroyed"));
}

/// Test that a `!`-prefixed watcher on a global external fires from beforeCreate.
#[tokio::test]
async fn before_create_watcher_listens_to_global_external() {
    let remote = Arc::new(EventEmitter::new());
    GlobalRegistry::global().insert("lifecycleRemote", External::Source(remote.clone()));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let registry = MetaRegistry::new();

    let meta = ClassDecl::new("BRemote")
        .params(no_templates())
        .method(
            "onChange",
            MethodSpec::new(sync_method(move |_, args| {
                sink.lock().push(args.to_vec());
                Ok(Value::Null)
            })),
        )
        .watch("!lifecycleRemote:change", WatchBinding::method("onChange"))
        .method(
            "beforeCreate",
            MethodSpec::new(sync_method({
                let remote = Arc::clone(&remote);
                move |_, _| {
                    remote.emit("change", &[json!(1)]);
                    Ok(Value::Null)
                }
            })),
        )
        .declare(&registry)
        .unwrap();

    let options = assemble(&meta, &TemplateRegistry::new(), Arc::new(EngineConfig::default()))
        .await
        .unwrap();
    let ctx = create(&options, Data::new()).await;
    settle().await;
    assert_eq!(*seen.lock(), vec![vec![json!(1)]]);

    remote.emit("change", &[json!(2)]);
    settle().await;
    assert_eq!(*seen.lock(), vec![vec![json!(1)], vec![json!(2)]]);

    options.before_destroy(&ctx).await.unwrap();
    assert_eq!(remote.listener_count("change"), 0);
    GlobalRegistry::global().remove("lifecycleRemote");
}

/// Test that a string watcher naming an undefined method aborts `created`.
#[tokio::test]
async fn missing_watcher_method_is_fatal() {
    let registry = MetaRegistry::new();
    let meta = ClassDecl::new("BBroken")
        .params(no_templates())
        .field("value", FieldSpec::new())
        .watch("value", WatchBinding::method("onClick"))
        .declare(&registry)
        .unwrap();

    let options = assemble(&meta, &TemplateRegistry::new(), Arc::new(EngineConfig::default()))
        .await
        .unwrap();
    let ctx = options.instantiate();
    options.before_create(&ctx, Data::new()).await.unwrap();
    options.data(&ctx).await.unwrap();

    let err = options.created(&ctx).await.unwrap_err();
    assert!(matches!(err, MetaError::MethodNotFound { method, .. } if method == "onClick"));
    assert_eq!(ctx.data().watcher_count(), 0);
}

/// Test that a failing hook binding does not stop the lifecycle.
#[tokio::test]
async fn failing_hook_binding_is_isolated() {
    let log: Log = Arc::default();
    let registry = MetaRegistry::new();

    let fail = HookBinding::new(sync_method(|_, _| Err("boom".into()))).named("fail");
    let dependent = {
        let log = Arc::clone(&log);
        HookBinding::new(sync_method(move |_, _| {
            log.lock().push("dependent".into());
            Ok(Value::Null)
        }))
        .after(["fail"])
    };

    let meta = ClassDecl::new("BFlaky")
        .params(no_templates())
        .hook(Hook::Created, fail)
        .hook(Hook::Created, dependent)
        .method("mounted", record(&log, "mounted"))
        .declare(&registry)
        .unwrap();

    let options = assemble(&meta, &TemplateRegistry::new(), Arc::new(EngineConfig::default()))
        .await
        .unwrap();
    let ctx = create(&options, Data::new()).await;
    options.mounted(&ctx).await.unwrap();

    assert_eq!(*log.lock(), vec!["mounted"]);
}

/// Test that fields waiting on each other are reported instead of hanging.
#[tokio::test]
async fn mutually_dependent_fields_stall() {
    let registry = MetaRegistry::new();
    let meta = ClassDecl::new("BLoop")
        .params(no_templates())
        .field("a", FieldSpec::new().after(["b"]))
        .field("b", FieldSpec::new().after(["a"]))
        .declare(&registry)
        .unwrap();

    let options = assemble(&meta, &TemplateRegistry::new(), Arc::new(EngineConfig::default()))
        .await
        .unwrap();
    let ctx = options.instantiate();
    options.before_create(&ctx, Data::new()).await.unwrap();

    let err = options.data(&ctx).await.unwrap_err();
    assert!(matches!(err, MetaError::FieldStall { fields } if fields == ["a", "b"]));
}

/// Test that a configured poll limit bounds template loading.
#[tokio::test]
async fn template_poll_limit_comes_from_config() {
    let config = EngineConfig::from_toml_str("template_poll_limit = 3").unwrap();
    let registry = MetaRegistry::new();
    let meta = ClassDecl::new("BLate").declare(&registry).unwrap();

    let err = assemble(&meta, &TemplateRegistry::new(), Arc::new(config)).await.unwrap_err();
    assert!(matches!(err, MetaError::TemplateUnavailable(name) if name == "b-late"));
}

/// Test that state carries over between instances unless a field is unique.
#[tokio::test]
async fn restore_skips_unique_fields() {
    let registry = MetaRegistry::new();
    let meta = ClassDecl::new("BForm")
        .params(no_templates())
        .field("draft", FieldSpec::new().default_value(json!("")))
        .field("id", FieldSpec::new().default_value(json!(0)).unique(Unique::Yes))
        .declare(&registry)
        .unwrap();

    let options = assemble(&meta, &TemplateRegistry::new(), Arc::new(EngineConfig::default()))
        .await
        .unwrap();

    let old = create(&options, Data::new()).await;
    old.set("draft", json!("hello"));
    old.set("id", json!(7));

    let fresh = create(&options, Data::new()).await;
    assert_eq!(options.restore(&fresh, &old), 1);
    assert_eq!(fresh.get("draft"), Some(json!("hello")));
    assert_eq!(fresh.get("id"), Some(json!(0)));
}

/// Test that smart and root declarations land in the right tables and render.
#[tokio::test]
async fn smart_and_root_components_register_apart() {
    let registry = MetaRegistry::new();
    let declared = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&declared);
    registry.events().on(
        DECLARE_EVENT,
        Arc::new(move |args: &[Value]| sink.lock().push(args[0].as_str().unwrap_or_default().to_string())),
    );

    ClassDecl::new("PRoot")
        .params(ComponentParams {
            root: true,
            tpl: false,
            ..Default::default()
        })
        .declare(&registry)
        .unwrap();

    ClassDecl::new("BTag")
        .params(ComponentParams {
            functional: Functional::Smart,
            ..Default::default()
        })
        .prop("text", FieldSpec::new().default_value(json!("tag")))
        .declare(&registry)
        .unwrap();

    assert_eq!(*declared.lock(), vec!["p-root", "b-tag", "b-tag-functional"]);
    assert!(registry.component("p-root").is_none());
    assert_eq!(registry.roots(), vec!["p-root"]);

    let templates = TemplateRegistry::new();
    templates.insert("b-tag", TemplateSet::new(|ctx| json!({ "tag": "i", "text": ctx.get("text") })));
    let config = Arc::new(EngineConfig::default());

    let twin = registry.component("b-tag-functional").unwrap();
    let options = assemble(&twin, &templates, Arc::clone(&config)).await.unwrap();
    assert_eq!(
        options.render_functional(Data::new()).await.unwrap(),
        json!({ "tag": "i", "text": "tag" })
    );

    let root = registry.root("p-root").unwrap();
    let options = assemble(&root, &templates, config).await.unwrap();
    assert!(!options.is_functional());
    let ctx = create(&options, Data::new()).await;
    assert_eq!(options.render(&ctx).await.unwrap(), json!({ "tag": "span" }));
}
