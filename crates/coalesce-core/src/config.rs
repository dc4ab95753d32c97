//! Engine configuration
//!
//! Controls how an instance reacts to contract misuse: writing a property
//! that has no accessor, or calling `ready()` a second time. Neither breaks
//! the engine, so the default is to log a warning and carry on.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What to do when a caller breaks the usage contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MisusePolicy {
    /// Proceed silently
    Allow,
    /// Proceed and log a warning
    #[default]
    Warn,
    /// Refuse with an error
    Reject,
}

/// Configuration for a property instance
///
/// # Example
///
/// ```
/// use coalesce_core::{EngineConfig, MisusePolicy};
///
/// let config = EngineConfig::from_ron_str("(on_repeated_ready: Reject)").unwrap();
/// assert_eq!(config.on_repeated_ready, MisusePolicy::Reject);
/// assert_eq!(config.on_undeclared_property, MisusePolicy::Warn);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Writes to names without a declared accessor
    pub on_undeclared_property: MisusePolicy,
    /// `ready()` called after the instance is already ready
    pub on_repeated_ready: MisusePolicy,
}

impl EngineConfig {
    /// Accept every misuse without logging
    pub fn permissive() -> Self {
        Self {
            on_undeclared_property: MisusePolicy::Allow,
            on_repeated_ready: MisusePolicy::Allow,
        }
    }

    /// Reject every misuse with an error
    pub fn strict() -> Self {
        Self {
            on_undeclared_property: MisusePolicy::Reject,
            on_repeated_ready: MisusePolicy::Reject,
        }
    }

    /// Parse a configuration from RON text; missing fields use defaults
    pub fn from_ron_str(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    /// Load a configuration from a RON file
    pub fn from_ron_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }
}
