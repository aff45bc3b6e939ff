//! Engine configuration.
//!
//! Limits and switches shared by every execution context. Defaults match the
//! engine's historical compile-time constants; a JSON document can override
//! any subset of them.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Engine limits and switches.
///
/// # Example
///
/// ```rust
/// use statewright::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{ "max_pseudo_hops": 8 }"#).unwrap();
/// assert_eq!(config.max_pseudo_hops, 8);
/// assert_eq!(config.max_tree_depth, 16);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deepest state nesting, counting the root as level one.
    pub max_tree_depth: usize,
    /// Pseudo-state hops allowed within one transition.
    pub max_pseudo_hops: usize,
    /// Capacity of each thread's internal event queue.
    pub event_pool_size: usize,
    /// Capacity of each thread's external mailbox.
    pub mailbox_capacity: usize,
    /// Application names are truncated to this many characters.
    pub max_app_name_len: usize,
    /// Give focus to an application when it is activated.
    pub focus_on_activate: bool,
    /// Keep trace records in memory in addition to emitting them.
    pub record_trace: bool,
    pub trace_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tree_depth: 16,
            max_pseudo_hops: 4,
            event_pool_size: 8,
            mailbox_capacity: 100,
            max_app_name_len: 64,
            focus_on_activate: false,
            record_trace: false,
            trace_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document. Missing fields keep their defaults.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("max_tree_depth", self.max_tree_depth),
            ("max_pseudo_hops", self.max_pseudo_hops),
            ("event_pool_size", self.event_pool_size),
            ("mailbox_capacity", self.mailbox_capacity),
            ("max_app_name_len", self.max_app_name_len),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{} must be > 0", name)));
            }
        }
        Ok(())
    }
}
