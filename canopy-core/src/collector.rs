//! Member Collection
//!
//! A component class is declared with a [`ClassDecl`]: its props, fields,
//! system fields, methods, accessors and modifiers, listed explicitly. The
//! collector folds the declaration into a [`ComponentMeta`] derived from the
//! parent class's descriptor and registers it.
//!
//! Declaring does four things on top of copying tables:
//!
//! 1. Accessors replace same-named props and fields, borrow a missing getter
//!    or setter from the accessor they override, and get `<key>Getter` /
//!    `<key>Setter` methods.
//! 2. Watchers declared on methods, props and fields are lifted into the
//!    meta's `watchers` table.
//! 3. Hooks declared on methods are lifted into the meta's `hooks` table.
//! 4. `after` names on fields are checked against the merged field tables.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{MetaError, MetaResult};
use crate::meta::{
    sync_method, Accessor, ComponentMeta, ComponentParams, FieldSpec, FieldTable, Functional, Hook, HookBinding,
    MetaRegistry, MethodSpec, ModValue, WatchBinding, WatchHandler,
};
use crate::reactive::Data;

/// A method or accessor member.
#[derive(Clone)]
pub enum Member {
    Method(MethodSpec),
    /// Registered under `accessors`.
    Accessor(Accessor),
    /// Registered under `computed`, unless the name already is an accessor.
    Computed(Accessor),
}

/// The declaration of one component class.
#[derive(Clone)]
pub struct ClassDecl {
    class_name: String,
    parent: Option<String>,
    params: Option<ComponentParams>,
    props: Vec<(String, FieldSpec)>,
    fields: Vec<(String, FieldSpec)>,
    system_fields: Vec<(String, FieldSpec)>,
    members: Vec<(String, Member)>,
    mods: Vec<(String, Vec<ModValue>)>,
    watchers: Vec<(String, WatchBinding)>,
    hooks: Vec<(Hook, HookBinding)>,
    instance: Data,
}

impl ClassDecl {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            parent: None,
            params: None,
            props: Vec::new(),
            fields: Vec::new(),
            system_fields: Vec::new(),
            members: Vec::new(),
            mods: Vec::new(),
            watchers: Vec::new(),
            hooks: Vec::new(),
            instance: Data::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Inherit from a registered class.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn params(mut self, params: ComponentParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn prop(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.props.push((name.into(), spec));
        self
    }

    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    pub fn system_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.system_fields.push((name.into(), spec));
        self
    }

    pub fn method(mut self, name: impl Into<String>, spec: MethodSpec) -> Self {
        self.members.push((name.into(), Member::Method(spec)));
        self
    }

    pub fn accessor(mut self, name: impl Into<String>, accessor: Accessor) -> Self {
        self.members.push((name.into(), Member::Accessor(accessor)));
        self
    }

    pub fn computed(mut self, name: impl Into<String>, accessor: Accessor) -> Self {
        self.members.push((name.into(), Member::Computed(accessor)));
        self
    }

    /// Declare a modifier and its allowed values.
    pub fn mods<I>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = ModValue>,
    {
        self.mods.push((name.into(), values.into_iter().collect()));
        self
    }

    /// Declare a class-level watcher.
    pub fn watch(mut self, key: impl Into<String>, binding: WatchBinding) -> Self {
        self.watchers.push((key.into(), binding));
        self
    }

    /// Declare a class-level hook binding.
    pub fn hook(mut self, hook: Hook, binding: HookBinding) -> Self {
        self.hooks.push((hook, binding));
        self
    }

    /// A value every fresh instance of the class carries.
    pub fn instance_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.instance.insert(name.into(), value);
        self
    }

    /// Build the descriptor without registering it.
    pub fn build(self, registry: &MetaRegistry) -> MetaResult<ComponentMeta> {
        let parent = match &self.parent {
            Some(name) => Some(registry.class(name).ok_or_else(|| MetaError::UnknownParent(name.clone()))?),
            None => None,
        };

        // Without explicit params a subclass keeps its parent's, under its own name.
        let params = match (&self.params, &parent) {
            (Some(params), _) => params.clone(),
            (None, Some(parent)) => ComponentParams {
                name: None,
                ..parent.params().clone()
            },
            (None, None) => ComponentParams::default(),
        };
        let mut meta = match &parent {
            Some(parent) => ComponentMeta::extend(parent, &self.class_name, params),
            None => ComponentMeta::new(&self.class_name, params),
        };

        self.check_duplicates(meta.name())?;

        for (name, values) in self.mods {
            meta.mods_mut().declare(&name, values);
        }

        for (name, value) in self.instance {
            meta.insert_instance_value(name, value);
        }

        for (name, spec) in &self.props {
            meta.insert_prop(name.as_str(), spec.clone());
        }
        for (name, spec) in &self.fields {
            meta.insert_field(name.as_str(), spec.clone());
        }
        for (name, spec) in &self.system_fields {
            meta.insert_system_field(name.as_str(), spec.clone());
        }

        collect_members(&mut meta, self.members.iter().map(|(name, member)| (name.as_str(), member)));
        lift_methods(&mut meta, self.members.iter().map(|(name, member)| (name.as_str(), member)));

        for (name, spec) in self.props.iter().chain(&self.fields) {
            lift_field_watchers(&mut meta, name, spec);
        }

        for (key, binding) in self.watchers {
            meta.add_watcher(key, binding);
        }
        for (hook, binding) in self.hooks {
            meta.add_hook(hook, binding);
        }

        check_after(&meta, &self.fields, meta.fields())?;
        check_after(&meta, &self.system_fields, meta.system_fields())?;

        Ok(meta)
    }

    /// Build the descriptor and register it.
    ///
    /// A smart component also registers its functional twin.
    pub fn declare(self, registry: &MetaRegistry) -> MetaResult<Arc<ComponentMeta>> {
        let meta = self.build(registry)?;
        let twin = (meta.params().functional == Functional::Smart).then(|| meta.functional_twin());

        let meta = registry.register(meta)?;
        if let Some(twin) = twin {
            registry.register(twin)?;
        }

        Ok(meta)
    }

    fn check_duplicates(&self, component: &str) -> MetaResult<()> {
        let mut seen = std::collections::HashSet::new();

        for (name, _) in self.props.iter().chain(&self.fields).chain(&self.system_fields) {
            if !seen.insert(name.as_str()) {
                return Err(MetaError::DuplicateField {
                    component: component.to_string(),
                    field: name.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Fold methods and accessors into a meta.
///
/// An accessor drops a same-named prop, field or system field, inherits a
/// missing getter or setter from the accessor it overrides, and registers
/// `<key>Getter` / `<key>Setter` methods.
pub fn collect_members<'a, I>(meta: &mut ComponentMeta, members: I)
where
    I: IntoIterator<Item = (&'a str, &'a Member)>,
{
    for (key, member) in members {
        let (accessor, explicit) = match member {
            Member::Method(spec) => {
                meta.insert_method(key, spec.clone());
                continue;
            }
            Member::Accessor(accessor) => (accessor, true),
            Member::Computed(accessor) => (accessor, false),
        };

        meta.remove_field(key);

        let is_accessor = explicit || meta.accessor(key).is_some();
        let old = match is_accessor {
            true => meta.accessor(key),
            false => meta.computed(key),
        }
        .cloned();

        let merged = Accessor {
            get: accessor.get.clone().or_else(|| old.as_ref().and_then(|o| o.get.clone())),
            set: accessor.set.clone().or_else(|| old.as_ref().and_then(|o| o.set.clone())),
        };

        if let Some(set) = merged.set.clone() {
            let setter = sync_method(move |ctx, args| {
                set(ctx, args.first().cloned().unwrap_or(Value::Null));
                Ok(Value::Null)
            });
            meta.insert_method(format!("{key}Setter"), MethodSpec::new(setter));
        }

        if let Some(get) = merged.get.clone() {
            let getter = sync_method(move |ctx, _| Ok(get(ctx)));
            meta.insert_method(format!("{key}Getter"), MethodSpec::new(getter));
        }

        if is_accessor {
            meta.insert_accessor(key, merged);
        } else {
            meta.insert_computed(key, merged);
        }
    }
}

fn lift_methods<'a, I>(meta: &mut ComponentMeta, members: I)
where
    I: IntoIterator<Item = (&'a str, &'a Member)>,
{
    for (name, member) in members {
        let Member::Method(spec) = member else {
            continue;
        };

        for (key, params) in &spec.watchers {
            meta.add_watcher(
                key.as_str(),
                WatchBinding {
                    handler: WatchHandler::Func(spec.handler.clone()),
                    method: Some(name.to_string()),
                    params: params.clone(),
                },
            );
        }

        for (&hook, registration) in &spec.hooks {
            meta.add_hook(
                hook,
                HookBinding {
                    handler: spec.handler.clone(),
                    name: registration.name.clone(),
                    after: registration.after.clone(),
                },
            );
        }
    }
}

fn lift_field_watchers(meta: &mut ComponentMeta, name: &str, spec: &FieldSpec) {
    for watcher in &spec.watchers {
        meta.add_watcher(name, WatchBinding::func(watcher.handler.clone()).with(watcher.params.clone()));
    }
}

fn check_after(meta: &ComponentMeta, own: &[(String, FieldSpec)], table: FieldTable<'_>) -> MetaResult<()> {
    for (name, spec) in own {
        // An accessor may have replaced the field.
        if !table.contains_key(name.as_str()) {
            continue;
        }

        if let Some(missing) = spec.after.iter().find(|dep| !table.contains_key(dep.as_str())) {
            return Err(MetaError::UnknownFieldDependency {
                component: meta.name().to_string(),
                field: name.clone(),
                after: missing.clone(),
            });
        }
    }

    Ok(())
}
