//! Engine Configuration
//!
//! Tunables for the lifecycle engines, loadable from TOML:
//!
//! ```toml
//! template_poll_limit = 100
//! max_concurrent_hooks = 8
//! watcher_group = "watchers"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),
}

/// Engine-wide settings shared by every component instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of template availability polls; `None` polls forever.
    pub template_poll_limit: Option<u32>,

    /// Maximum number of hook bindings running at once; `None` is unbounded.
    pub max_concurrent_hooks: Option<usize>,

    /// Async group used for invocations of method-name watch handlers.
    pub watcher_group: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            template_poll_limit: None,
            max_concurrent_hooks: None,
            watcher_group: "watchers".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load a configuration file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        let config = Self::from_toml_str(&content)?;

        debug!("Loaded engine config from: {}", path.display());
        Ok(config)
    }
}
