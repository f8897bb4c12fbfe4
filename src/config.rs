//! Configuration System
//!
//! Settings for the propagation interceptor and logging, merged from defaults, an optional
//! TOML file and `RX_CONTEXT__*` environment variables.

use crate::error::SettingsError;
use crate::logging::LoggingConfig;
use crate::propagation::PropagationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod merge_policy;
mod sources;

pub use sources::{default_config_path, ENV_PREFIX};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Assembly interceptor settings
    #[serde(default)]
    pub propagation: PropagationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl Settings {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Render the settings as TOML
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        toml::to_string_pretty(self).map_err(|e| SettingsError::Config(e.to_string()))
    }
}

/// Loads [`Settings`] from all sources
pub struct SettingsLoader;

impl SettingsLoader {
    /// Load settings: defaults, then `path` (or the default config file when `path` is `None`
    /// and that file exists), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Settings, SettingsError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = match path {
            Some(path) => sources::add_required_file(builder, path)?,
            None => sources::add_default_file(builder)?,
        };
        let builder = sources::add_environment(builder);

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            SettingsError::Invalid(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(settings)
    }

    /// Load settings from a specific file plus environment overrides
    pub fn load_from_file(path: &Path) -> Result<Settings, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        Self::load(Some(path))
    }

    pub fn default_config_path() -> Option<PathBuf> {
        default_config_path()
    }
}
