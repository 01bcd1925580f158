//! Component Meta Descriptors
//!
//! This module defines the descriptor a component class compiles into, the
//! specs stored in it, and the registry that holds one descriptor per class.
//!
//! # Overview
//!
//! - [`ComponentMeta`]: fields, props, system fields, methods, accessors,
//!   computed accessors, modifiers, watchers and hooks of one class.
//! - [`member`]: the entries of those tables ([`FieldSpec`], [`MethodSpec`],
//!   [`WatchBinding`], [`HookBinding`], ...).
//! - [`MetaRegistry`]: class name to descriptor, with name uniqueness.
//!
//! Descriptors are built once when a class is declared (see
//! [`collector`](crate::collector)) and are read-only afterwards. Each
//! component instance works on its own derived copy.

mod descriptor;
mod hook;
mod mods;
mod registry;
pub mod member;

pub use descriptor::{component_name_of, ComponentMeta, ComponentParams, FieldTable, Functional, FUNCTIONAL_SUFFIX};
pub use hook::{Hook, UnknownHook, WatchStage};
pub use mods::{ModValue, ModsDecl};
pub use registry::{MetaRegistry, DECLARE_EVENT};
pub use member::{
    method, sync_method, Accessor, FieldSpec, FieldWatcher, HookBinding, MethodFn, MethodHook, MethodSpec, Unique,
    WatchBinding, WatchHandler, WatchParams, WrappedListener,
};
