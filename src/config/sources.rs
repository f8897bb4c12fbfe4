//! Configuration sources: settings file and environment variables.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::{Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix for environment overrides, e.g. `RX_CONTEXT__PROPAGATION__ENABLED=false`.
pub const ENV_PREFIX: &str = "RX_CONTEXT";

/// Default settings file: $XDG_CONFIG_HOME/rx-context/config.toml, else
/// ~/.config/rx-context/config.toml.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(base.join("rx-context").join("config.toml"))
}

/// Add an explicitly requested settings file; it must exist.
pub fn add_required_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(File::from(path).required(true)))
}

/// Add the default settings file if it exists.
pub fn add_default_file(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    match default_config_path() {
        Some(path) if path.exists() => {
            debug!(config_path = %path.display(), "Loading default settings file");
            Ok(builder.add_source(File::from(path).required(false)))
        }
        Some(path) => {
            debug!(config_path = %path.display(), "No default settings file found");
            Ok(builder)
        }
        None => Ok(builder),
    }
}

/// Add `RX_CONTEXT__SECTION__KEY` environment overrides.
pub fn add_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    )
}
