//! Modifier declarations.
//!
//! A component declares, per modifier, the values it accepts. One value may be
//! marked as the default; a `Parent` marker splices in the values the parent
//! component declared for the same modifier.

use convert_case::{Case, Casing};
use indexmap::IndexMap;

/// One entry of a modifier declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModValue {
    Value(String),
    /// An allowed value that is also the default.
    Default(String),
    /// The parent's declared values for this modifier.
    Parent,
}

impl ModValue {
    pub fn value(v: impl ToString) -> Self {
        ModValue::Value(v.to_string())
    }

    pub fn default_value(v: impl ToString) -> Self {
        ModValue::Default(v.to_string())
    }
}

/// Modifier name to declared values, names camel-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModsDecl {
    mods: IndexMap<String, Vec<ModValue>>,
}

impl ModsDecl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a modifier. The name is normalized to camel case.
    pub fn declare<I>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = ModValue>,
    {
        self.mods.insert(name.to_case(Case::Camel), values.into_iter().collect());
    }

    pub fn get(&self, name: &str) -> Option<&[ModValue]> {
        self.mods.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ModValue])> {
        self.mods.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Merge with a parent declaration.
    ///
    /// Modifiers the child does not mention are inherited as is; a `Parent`
    /// marker is replaced by the parent's values for that modifier.
    pub fn inherit(&self, parent: &ModsDecl) -> ModsDecl {
        let mut mods = parent.mods.clone();

        for (name, values) in &self.mods {
            let inherited = parent.mods.get(name);
            let mut merged = Vec::with_capacity(values.len());

            for value in values {
                match value {
                    ModValue::Parent => merged.extend(inherited.into_iter().flatten().cloned()),
                    other => merged.push(other.clone()),
                }
            }

            mods.insert(name.clone(), merged);
        }

        ModsDecl { mods }
    }

    /// Default value of every modifier; `None` when no default is marked.
    pub fn defaults(&self) -> IndexMap<String, Option<String>> {
        self.mods
            .iter()
            .map(|(name, values)| {
                let default = values.iter().find_map(|v| match v {
                    ModValue::Default(d) => Some(d.clone()),
                    _ => None,
                });
                (name.clone(), default)
            })
            .collect()
    }
}
