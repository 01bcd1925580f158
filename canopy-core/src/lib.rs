//! Canopy Core
//!
//! This crate provides the component model of the Canopy UI runtime. It
//! turns class declarations into component descriptors and drives those
//! descriptors through the lifecycle a renderer imposes. It implements:
//!
//! - Component descriptors with prototype-style inheritance
//! - Member collection (accessors, methods, method-level watchers and hooks)
//! - Field initialization with `after` dependencies between fields
//! - Hook execution as a small dependency-graph scheduler
//! - Watcher binding at the `beforeCreate`, `created` and `mounted` stages
//! - Root, functional and smart (functional twin) components
//!
//! Rendering itself is left to the renderer; this crate only hands it the
//! lifecycle callbacks and a render function.
//!
//! # Architecture
//!
//! - `meta`: descriptors, their specs and the registry
//! - `collector`: class declarations compiled into descriptors
//! - `fields`: the field initialization engine
//! - `graph` / `hooks`: task graph and hook execution
//! - `reactive`: reactive data, event emitters and async groups
//! - `watch`: watch keys, externals and binding
//! - `component`: instances, templates and renderer options
//!
//! # Example
//!
//! ```rust,ignore
//! use canopy_core::collector::ClassDecl;
//! use canopy_core::component::{assemble, TemplateRegistry};
//! use canopy_core::meta::{FieldSpec, MetaRegistry};
//!
//! let registry = MetaRegistry::new();
//! let meta = ClassDecl::new("BCounter")
//!     .prop("start", FieldSpec::new().default_value(json!(0)))
//!     .field("count", FieldSpec::new().init(|cx| cx.ctx().get("start")))
//!     .declare(&registry)?;
//!
//! let options = assemble(&meta, &templates, config).await?;
//! let ctx = options.instantiate();
//! options.before_create(&ctx, Data::new()).await?;
//! options.data(&ctx).await?;
//! options.created(&ctx).await?;
//! ```

pub mod collector;
pub mod component;
pub mod config;
pub mod error;
pub mod fields;
pub mod graph;
pub mod hooks;
pub mod meta;
pub mod reactive;
pub mod watch;

pub use component::{assemble, Component, ComponentOptions};
pub use config::EngineConfig;
pub use error::{HandlerError, MetaError, MetaResult};
