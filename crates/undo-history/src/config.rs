#![forbid(unsafe_code)]

//! Configuration for [`UndoManager`](crate::UndoManager).
//!
//! # Loading
//!
//! With the `config` feature enabled the configuration can be read from TOML
//! or JSON. Missing keys fall back to [`UndoConfig::default`].
//!
//! ```toml
//! # undo.toml
//! levels_of_undo = 50
//! registration_enabled = true
//! default_group_description = "Multiple Changes"
//! ```
//!
//! ```rust,ignore
//! let config = UndoConfig::from_toml_file("undo.toml")?;
//! let manager = UndoManager::new(config);
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "config")]
use crate::error::ConfigError;

/// Label used for groups opened without an explicit description.
pub const DEFAULT_GROUP_DESCRIPTION: &str = "Multiple Changes";

/// Configuration for an undo manager.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct UndoConfig {
    /// Maximum number of top-level entries kept in history (0 = unbounded).
    pub levels_of_undo: usize,
    /// Whether the manager starts with registration enabled.
    pub registration_enabled: bool,
    /// Description used by [`begin_default_group`](crate::UndoManager::begin_default_group).
    pub default_group_description: String,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            levels_of_undo: 0,
            registration_enabled: true,
            default_group_description: DEFAULT_GROUP_DESCRIPTION.to_string(),
        }
    }
}

impl UndoConfig {
    /// Create a configuration with a history cap.
    #[must_use]
    pub fn new(levels_of_undo: usize) -> Self {
        Self {
            levels_of_undo,
            ..Self::default()
        }
    }

    /// Create an unbounded configuration.
    #[must_use]
    pub fn unlimited() -> Self {
        Self::new(0)
    }

    /// Set the history cap.
    #[must_use]
    pub fn with_levels_of_undo(mut self, levels: usize) -> Self {
        self.levels_of_undo = levels;
        self
    }

    /// Start with registration enabled or disabled.
    #[must_use]
    pub fn with_registration_enabled(mut self, enabled: bool) -> Self {
        self.registration_enabled = enabled;
        self
    }

    /// Set the description used for default groups.
    #[must_use]
    pub fn with_default_group_description(mut self, description: impl Into<String>) -> Self {
        self.default_group_description = description.into();
        self
    }

    /// True when the history has no length cap.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.levels_of_undo == 0
    }

    /// Validate the configuration.
    ///
    /// Returns a list of problems; an empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.default_group_description.trim().is_empty() {
            errors.push("default_group_description must not be empty".into());
        }
        errors
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Serialize to a TOML string.
    #[cfg(feature = "config")]
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "config")]
    fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}
