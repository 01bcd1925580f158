//! Component meta descriptors.
//!
//! A [`ComponentMeta`] is the compiled description of one component class.
//!
//! # Inheritance
//!
//! A derived descriptor holds an owning reference to its parent plus its own
//! override tables. Lookups try the descriptor's own table first and then fall
//! back to the parent, explicitly. The exceptions are `hooks` and `watchers`:
//! deriving copies each of the parent's lists, so a child can append bindings
//! without touching the parent's lists.
//!
//! The same derivation is used twice: once when a subclass is declared, and
//! once per component instance to get a private working copy.

use std::collections::HashSet;
use std::sync::Arc;

use convert_case::{Case, Casing};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::hook::Hook;
use super::mods::ModsDecl;
use super::member::{Accessor, FieldSpec, HookBinding, MethodSpec, WatchBinding};
use crate::reactive::Data;

/// A merged view of a field table, parent entries first.
pub type FieldTable<'a> = IndexMap<&'a str, &'a FieldSpec>;

/// Component names starting with these prefixes are abstract.
const ABSTRACT_PREFIXES: [&str; 2] = ["i-", "v-"];

/// Name suffix of the functional twin of a smart component.
pub const FUNCTIONAL_SUFFIX: &str = "-functional";

/// How a component is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Functional {
    /// A regular stateful component.
    #[default]
    No,
    /// Rendered without an instance lifecycle.
    Yes,
    /// Regular, plus a functional twin named `<name>-functional`.
    Smart,
}

/// Per-component declaration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComponentParams {
    /// Explicit component name; derived from the class name when absent.
    pub name: Option<String>,
    /// Registered as an application root.
    pub root: bool,
    /// Load a template for the component; `false` uses the default template.
    pub tpl: bool,
    pub functional: Functional,
    pub inherit_attrs: bool,
    /// Inherit modifier declarations from the parent.
    pub inherit_mods: bool,
}

impl Default for ComponentParams {
    fn default() -> Self {
        Self {
            name: None,
            root: false,
            tpl: true,
            functional: Functional::No,
            inherit_attrs: true,
            inherit_mods: true,
        }
    }
}

/// Derive a component name from a class name: `BButton` becomes `b-button`.
pub fn component_name_of(class_name: &str) -> String {
    class_name.to_case(Case::Kebab)
}

/// The descriptor of one component class.
#[derive(Clone)]
pub struct ComponentMeta {
    name: String,
    component_name: String,
    class_name: String,
    params: ComponentParams,

    parent: Option<Arc<ComponentMeta>>,

    props: IndexMap<String, FieldSpec>,
    fields: IndexMap<String, FieldSpec>,
    system_fields: IndexMap<String, FieldSpec>,
    methods: IndexMap<String, MethodSpec>,
    accessors: IndexMap<String, Accessor>,
    computed: IndexMap<String, Accessor>,
    mods: ModsDecl,

    /// Values a fresh instance of the class carries, used as field fallbacks.
    instance: Data,

    /// Inherited prop/field/system-field names masked by an accessor.
    hidden: HashSet<String>,

    watchers: IndexMap<String, Vec<WatchBinding>>,
    hooks: IndexMap<Hook, Vec<HookBinding>>,
}

impl ComponentMeta {
    /// Create a root descriptor for a class with no registered parent.
    pub fn new(class_name: impl Into<String>, params: ComponentParams) -> Self {
        let class_name = class_name.into();
        let name = params.name.clone().unwrap_or_else(|| component_name_of(&class_name));

        Self {
            component_name: name.strip_suffix(FUNCTIONAL_SUFFIX).unwrap_or(&name).to_string(),
            name,
            class_name,
            params,
            parent: None,
            props: IndexMap::new(),
            fields: IndexMap::new(),
            system_fields: IndexMap::new(),
            methods: IndexMap::new(),
            accessors: IndexMap::new(),
            computed: IndexMap::new(),
            mods: ModsDecl::new(),
            instance: Data::new(),
            hidden: HashSet::new(),
            watchers: IndexMap::new(),
            hooks: Hook::ALL.into_iter().map(|hook| (hook, Vec::new())).collect(),
        }
    }

    /// Derive a descriptor that falls back to `parent`.
    ///
    /// Identity, params and the effective modifier declarations are taken from
    /// the parent; hooks and watchers are copied list by list.
    pub fn derive(parent: &Arc<ComponentMeta>) -> Self {
        Self {
            name: parent.name.clone(),
            component_name: parent.component_name.clone(),
            class_name: parent.class_name.clone(),
            params: parent.params.clone(),
            parent: Some(Arc::clone(parent)),
            props: IndexMap::new(),
            fields: IndexMap::new(),
            system_fields: IndexMap::new(),
            methods: IndexMap::new(),
            accessors: IndexMap::new(),
            computed: IndexMap::new(),
            mods: parent.mods(),
            instance: Data::new(),
            hidden: HashSet::new(),
            watchers: parent.watchers.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            hooks: parent.hooks.iter().map(|(k, v)| (*k, v.clone())).collect(),
        }
    }

    /// Derive a descriptor for a subclass with its own identity.
    pub fn extend(parent: &Arc<ComponentMeta>, class_name: impl Into<String>, params: ComponentParams) -> Self {
        let base = Self::new(class_name, params);
        Self {
            name: base.name,
            component_name: base.component_name,
            class_name: base.class_name,
            params: base.params,
            mods: ModsDecl::new(),
            ..Self::derive(parent)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component_name(&self) -> &str {
        &self.component_name
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn params(&self) -> &ComponentParams {
        &self.params
    }

    pub fn parent(&self) -> Option<&Arc<ComponentMeta>> {
        self.parent.as_ref()
    }

    /// Abstract components are collected but never assembled.
    pub fn is_abstract(&self) -> bool {
        ABSTRACT_PREFIXES.iter().any(|p| self.name.starts_with(p))
    }

    pub fn is_functional(&self) -> bool {
        self.params.functional == Functional::Yes
    }

    /// The functional twin of a smart component. Twins are never parents.
    pub fn is_twin(&self) -> bool {
        self.name != self.component_name
    }

    /// A copy of this descriptor registered as `<name>-functional`.
    pub fn functional_twin(&self) -> Self {
        let name = format!("{}{FUNCTIONAL_SUFFIX}", self.name);
        Self {
            params: ComponentParams {
                name: Some(name.clone()),
                functional: Functional::Yes,
                ..self.params.clone()
            },
            component_name: self.name.clone(),
            name,
            ..self.clone()
        }
    }

    fn lookup<'a, T>(
        &'a self,
        key: &str,
        table: fn(&ComponentMeta) -> &IndexMap<String, T>,
        maskable: bool,
    ) -> Option<&'a T> {
        if let Some(value) = table(self).get(key) {
            return Some(value);
        }
        if maskable && self.hidden.contains(key) {
            return None;
        }
        self.parent.as_deref()?.lookup(key, table, maskable)
    }

    fn merged<'a, T>(
        &'a self,
        table: fn(&ComponentMeta) -> &IndexMap<String, T>,
        maskable: bool,
    ) -> IndexMap<&'a str, &'a T> {
        let mut merged = match self.parent.as_deref() {
            Some(parent) => parent.merged(table, maskable),
            None => IndexMap::new(),
        };

        if maskable {
            merged.retain(|k, _| !self.hidden.contains(*k));
        }

        for (key, value) in table(self) {
            merged.insert(key.as_str(), value);
        }

        merged
    }

    pub fn prop(&self, name: &str) -> Option<&FieldSpec> {
        self.lookup(name, |m| &m.props, true)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.lookup(name, |m| &m.fields, true)
    }

    pub fn system_field(&self, name: &str) -> Option<&FieldSpec> {
        self.lookup(name, |m| &m.system_fields, true)
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.lookup(name, |m| &m.methods, false)
    }

    pub fn accessor(&self, name: &str) -> Option<&Accessor> {
        self.lookup(name, |m| &m.accessors, false)
    }

    pub fn computed(&self, name: &str) -> Option<&Accessor> {
        self.lookup(name, |m| &m.computed, false)
    }

    pub fn props(&self) -> FieldTable<'_> {
        self.merged(|m| &m.props, true)
    }

    pub fn fields(&self) -> FieldTable<'_> {
        self.merged(|m| &m.fields, true)
    }

    pub fn system_fields(&self) -> FieldTable<'_> {
        self.merged(|m| &m.system_fields, true)
    }

    pub fn methods(&self) -> IndexMap<&str, &MethodSpec> {
        self.merged(|m| &m.methods, false)
    }

    pub fn accessors(&self) -> IndexMap<&str, &Accessor> {
        self.merged(|m| &m.accessors, false)
    }

    pub fn computed_accessors(&self) -> IndexMap<&str, &Accessor> {
        self.merged(|m| &m.computed, false)
    }

    /// Modifier declarations, merged with the parent's when inherited.
    pub fn mods(&self) -> ModsDecl {
        match self.parent.as_deref() {
            Some(parent) if self.params.inherit_mods => self.mods.inherit(&parent.mods()),
            _ => self.mods.clone(),
        }
    }

    /// Instance values, own values overriding inherited ones.
    pub fn instance(&self) -> Data {
        let mut data = match self.parent.as_deref() {
            Some(parent) => parent.instance(),
            None => Data::new(),
        };
        data.extend(self.instance.iter().map(|(k, v)| (k.clone(), v.clone())));
        data
    }

    pub fn watchers(&self) -> &IndexMap<String, Vec<WatchBinding>> {
        &self.watchers
    }

    pub fn hooks(&self, hook: Hook) -> &[HookBinding] {
        self.hooks.get(&hook).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_prop(&self, name: &str) -> bool {
        self.prop(name).is_some()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn has_system_field(&self, name: &str) -> bool {
        self.system_field(name).is_some()
    }

    // Mutators used while the descriptor is being built.

    pub fn insert_prop(&mut self, name: impl Into<String>, spec: FieldSpec) {
        self.props.insert(name.into(), spec);
    }

    pub fn insert_field(&mut self, name: impl Into<String>, spec: FieldSpec) {
        self.fields.insert(name.into(), spec);
    }

    pub fn insert_system_field(&mut self, name: impl Into<String>, spec: FieldSpec) {
        self.system_fields.insert(name.into(), spec);
    }

    pub fn insert_method(&mut self, name: impl Into<String>, spec: MethodSpec) {
        self.methods.insert(name.into(), spec);
    }

    pub fn insert_accessor(&mut self, name: impl Into<String>, accessor: Accessor) {
        self.accessors.insert(name.into(), accessor);
    }

    pub fn insert_computed(&mut self, name: impl Into<String>, accessor: Accessor) {
        self.computed.insert(name.into(), accessor);
    }

    pub fn insert_instance_value(&mut self, name: impl Into<String>, value: serde_json::Value) {
        self.instance.insert(name.into(), value);
    }

    pub fn mods_mut(&mut self) -> &mut ModsDecl {
        &mut self.mods
    }

    /// Remove a prop, field or system field of this name, own or inherited.
    ///
    /// Returns whether anything was removed.
    pub fn remove_field(&mut self, name: &str) -> bool {
        let inherited = self
            .parent
            .as_deref()
            .is_some_and(|p| p.has_prop(name) || p.has_field(name) || p.has_system_field(name));

        let own = self.props.shift_remove(name).is_some()
            | self.fields.shift_remove(name).is_some()
            | self.system_fields.shift_remove(name).is_some();

        if inherited {
            self.hidden.insert(name.to_string());
        }

        own || inherited
    }

    pub fn add_watcher(&mut self, key: impl Into<String>, binding: WatchBinding) {
        self.watchers.entry(key.into()).or_default().push(binding);
    }

    pub fn add_hook(&mut self, hook: Hook, binding: HookBinding) {
        self.hooks.entry(hook).or_default().push(binding);
    }
}

impl std::fmt::Debug for ComponentMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentMeta")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("parent", &self.parent.as_ref().map(|p| p.name()))
            .field("props", &self.props.keys().collect::<Vec<_>>())
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("watchers", &self.watchers.keys().collect::<Vec<_>>())
            .finish()
    }
}
