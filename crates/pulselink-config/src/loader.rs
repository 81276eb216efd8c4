//! Core TOML config loading: read from path or platform default.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::errors::ConfigError;
use crate::schema::PulselinkConfig;
use crate::validation;

/// Load config from a specific TOML file path.
///
/// Deserializes the file using serde defaults for any missing fields.
/// After loading, the config is validated; if validation fails, a warning
/// is logged and the parsed config is returned as-is.
pub fn load_from_path(path: &Path) -> Result<PulselinkConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.to_path_buf())
        } else {
            ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
        }
    })?;

    let config: PulselinkConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e}; using parsed values as-is");
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On macOS: `~/Library/Application Support/pulselink/config.toml`
/// On Linux: `~/.config/pulselink/config.toml`
///
/// If the file does not exist, creates a default config file and returns
/// defaults.
pub fn load_config() -> Result<PulselinkConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!("no config found at {}, creating default", path.display());
            create_default_config(&path)?;
            Ok(PulselinkConfig::default())
        }
        Err(e) => Err(e),
    }
}

fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("pulselink").join("config.toml"))
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))
}

/// Write a default config file, creating parent directories as needed.
fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    let serialized = toml::to_string_pretty(&PulselinkConfig::default())
        .map_err(|e| ConfigError::ParseError(format!("failed to serialize defaults: {e}")))?;
    std::fs::write(path, serialized)
        .map_err(|e| ConfigError::ParseError(format!("failed to write {}: {e}", path.display())))
}
