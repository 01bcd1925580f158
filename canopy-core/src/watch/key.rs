//! Watch key parsing.
//!
//! A key of the form `[!|?]<path>:<event>` declares a custom watcher:
//!
//! - `!` binds at `beforeCreate`, `?` at `mounted`, no prefix at `created`.
//! - `<path>` optionally names an external object; it may not contain `!`,
//!   `?` or `:`.
//! - `<event>` is used verbatim when a path is given and dasherized otherwise.
//!
//! Any other key watches an own reactive field and binds at `created`.

use convert_case::{Case, Casing};

use crate::meta::WatchStage;

/// What a watch key points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchTarget {
    /// A path into the component's own reactive data.
    Field(String),
    /// An event on an external object or, failing that, on the component.
    Event { path: Option<String>, event: String },
}

/// A parsed watch key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchKey {
    pub stage: WatchStage,
    pub target: WatchTarget,
}

impl WatchKey {
    pub fn parse(key: &str) -> Self {
        let (stage, rest) = match key.as_bytes().first() {
            Some(b'!') => (WatchStage::BeforeCreate, &key[1..]),
            Some(b'?') => (WatchStage::Mounted, &key[1..]),
            _ => (WatchStage::Created, key),
        };

        let custom = rest
            .split_once(':')
            .filter(|(path, _)| !path.contains(['!', '?']));

        match custom {
            Some((path, event)) if path.is_empty() => Self {
                stage,
                target: WatchTarget::Event {
                    path: None,
                    event: event.to_case(Case::Kebab),
                },
            },
            Some((path, event)) => Self {
                stage,
                target: WatchTarget::Event {
                    path: Some(path.to_string()),
                    event: event.to_string(),
                },
            },
            None => Self {
                stage: WatchStage::Created,
                target: WatchTarget::Field(key.to_string()),
            },
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self.target, WatchTarget::Event { .. })
    }
}
