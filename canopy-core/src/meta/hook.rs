//! Lifecycle hooks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of lifecycle checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Hook {
    BeforeRuntime,
    BeforeCreate,
    BeforeDataCreate,
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    Activated,
    Deactivated,
    BeforeDestroy,
    Destroyed,
    ErrorCaptured,
}

/// Checkpoints at which watchers are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchStage {
    BeforeCreate,
    Created,
    Mounted,
}

impl Hook {
    /// Every hook, in lifecycle order.
    pub const ALL: [Hook; 13] = [
        Hook::BeforeRuntime,
        Hook::BeforeCreate,
        Hook::BeforeDataCreate,
        Hook::Created,
        Hook::BeforeMount,
        Hook::Mounted,
        Hook::BeforeUpdate,
        Hook::Updated,
        Hook::Activated,
        Hook::Deactivated,
        Hook::BeforeDestroy,
        Hook::Destroyed,
        Hook::ErrorCaptured,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::BeforeRuntime => "beforeRuntime",
            Hook::BeforeCreate => "beforeCreate",
            Hook::BeforeDataCreate => "beforeDataCreate",
            Hook::Created => "created",
            Hook::BeforeMount => "beforeMount",
            Hook::Mounted => "mounted",
            Hook::BeforeUpdate => "beforeUpdate",
            Hook::Updated => "updated",
            Hook::Activated => "activated",
            Hook::Deactivated => "deactivated",
            Hook::BeforeDestroy => "beforeDestroy",
            Hook::Destroyed => "destroyed",
            Hook::ErrorCaptured => "errorCaptured",
        }
    }

    /// The watcher stage bound at this hook, if any.
    pub fn watch_stage(&self) -> Option<WatchStage> {
        match self {
            Hook::BeforeCreate => Some(WatchStage::BeforeCreate),
            Hook::Created => Some(WatchStage::Created),
            Hook::Mounted => Some(WatchStage::Mounted),
            _ => None,
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for a hook name outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown hook `{0}`")]
pub struct UnknownHook(pub String);

impl FromStr for Hook {
    type Err = UnknownHook;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hook::ALL
            .into_iter()
            .find(|hook| hook.as_str() == s)
            .ok_or_else(|| UnknownHook(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for hook in Hook::ALL {
            assert_eq!(hook.as_str().parse::<Hook>(), Ok(hook));
        }
        assert!("beforeRender".parse::<Hook>().is_err());
    }

    #[test]
    fn only_three_hooks_bind_watchers() {
        let stages: Vec<_> = Hook::ALL.iter().filter_map(Hook::watch_stage).collect();
        assert_eq!(
            stages,
            vec![WatchStage::BeforeCreate, WatchStage::Created, WatchStage::Mounted]
        );
    }

    #[test]
    fn serde_uses_camel_case() {
        assert_eq!(serde_json::to_string(&Hook::BeforeDataCreate).unwrap(), "\"beforeDataCreate\"");
    }
}
