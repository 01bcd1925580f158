//! Field Initialization
//!
//! Computes the initial data object of a component from its merged field
//! table.
//!
//! # Ordering
//!
//! Fields are split into two groups, each kept in declaration order:
//!
//! 1. Eager fields: atoms, and fields filled from a default or an instance
//!    value without an initializer.
//! 2. Everything else.
//!
//! A field whose `after` names are not all present in the data object yet is
//! queued for another pass. Passes repeat until the queue is empty; a pass
//! that initializes nothing means the remaining fields wait on each other (or
//! on a name that never appears) and is reported as [`MetaError::FieldStall`].
//!
//! Initializers run one at a time, each seeing the data written so far.

use serde_json::Value;

use crate::component::Component;
use crate::error::{MetaError, MetaResult};
use crate::meta::{FieldSpec, FieldTable};
use crate::reactive::Data;

/// What a field initializer sees.
pub struct InitContext<'a> {
    ctx: &'a Component,
    data: &'a Data,
    stack: &'a [String],
}

impl<'a> InitContext<'a> {
    /// The component being initialized.
    pub fn ctx(&self) -> &'a Component {
        self.ctx
    }

    /// Fields initialized so far.
    pub fn data(&self) -> &'a Data {
        self.data
    }

    /// Shorthand for `data().get(name)`.
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.data.get(name)
    }

    /// The field whose initializer is running.
    pub fn active_field(&self) -> Option<&'a str> {
        self.stack.last().map(String::as_str)
    }

    /// Fields currently being initialized, outermost first.
    pub fn stack(&self) -> &'a [String] {
        self.stack
    }

    /// Whether `name` is already being initialized further up the stack.
    pub fn is_initializing(&self, name: &str) -> bool {
        self.stack.iter().any(|field| field == name)
    }
}

/// Initialize every field of `fields` into `data` and return it.
///
/// Keys already present in `data` are left untouched.
pub fn init_fields(fields: &FieldTable<'_>, ctx: &Component, instance: &Data, mut data: Data) -> MetaResult<Data> {
    let (eager, rest): (Vec<_>, Vec<_>) = fields
        .iter()
        .map(|(&name, &spec)| (name, spec))
        .partition(|(name, spec)| spec.is_eager(instance.contains_key(*name)));

    let mut queue: Vec<(&str, &FieldSpec)> = eager.into_iter().chain(rest).collect();

    while !queue.is_empty() {
        let pending = queue.len();
        let mut retry = Vec::new();

        for (name, spec) in queue {
            if data.contains_key(name) {
                continue;
            }

            if !spec.after.iter().all(|dep| data.contains_key(dep)) {
                retry.push((name, spec));
                continue;
            }

            let value = init_field(name, spec, ctx, instance, &data, &[]);
            data.insert(name.to_string(), value);
        }

        if retry.len() == pending {
            return Err(MetaError::FieldStall {
                fields: retry.into_iter().map(|(name, _)| name.to_string()).collect(),
            });
        }

        queue = retry;
    }

    Ok(data)
}

/// Compute one field's value: its initializer, else its default, else the
/// instance value, else `null`.
pub(crate) fn init_field(
    name: &str,
    spec: &FieldSpec,
    ctx: &Component,
    instance: &Data,
    data: &Data,
    outer: &[String],
) -> Value {
    tracing::trace!(event = "component:field:init", field = name);

    let initialized = spec.init.as_ref().and_then(|init| {
        let mut stack = outer.to_vec();
        stack.push(name.to_string());

        init(&InitContext {
            ctx,
            data,
            stack: &stack,
        })
    });

    initialized
        .or_else(|| spec.default.clone())
        .or_else(|| instance.get(name).cloned())
        .unwrap_or(Value::Null)
}

/// Carry state from a previous instance into `data`.
///
/// Unique fields are skipped. A field with a merge function receives
/// `(ctx, old_ctx, name, link)`, where `link` is the field name when the old
/// instance holds a value for it; other fields take the old value verbatim.
pub fn merge_fields(fields: &FieldTable<'_>, ctx: &Component, old_ctx: &Component, mut data: Data) -> Data {
    for (&name, &spec) in fields {
        if spec.unique.check(ctx, old_ctx) {
            continue;
        }

        let old = old_ctx.get(name);
        let carried = match &spec.merge {
            Some(merge) => {
                let link = old.as_ref().map(|_| name);
                merge(ctx, old_ctx, name, link)
            }
            None => old,
        };

        if let Some(value) = carried {
            tracing::trace!(event = "component:field:merge", field = name);
            data.insert(name.to_string(), value);
        }
    }

    data
}
