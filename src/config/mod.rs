//! Run configuration loading and parsing.
//!
//! Package dimensions live in parameter files (see [`crate::params`]); this
//! module covers the tool's own settings: logging, which artefacts to write,
//! and reference kernel tessellation.
//!
//! # Configuration File Locations
//!
//! 1. Path specified via `--config` CLI flag
//! 2. Default location:
//!    - **Linux/macOS:** `~/.ic3d-synth/config.json`
//!    - **Windows:** `%USERPROFILE%\.ic3d-synth\config.json`
//!
//! A missing file at the default location is not an error: built-in defaults
//! are used instead. A missing file named explicitly is an error.

mod settings;

pub use settings::{Config, KernelConfig, LoggingConfig, OutputConfig, MIN_CYLINDER_SEGMENTS};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".ic3d-synth"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, uses the platform-specific default location and
/// falls back to [`Config::default`] when nothing is there.
///
/// # Errors
///
/// Returns an error if:
/// - An explicitly named file does not exist
/// - The file cannot be read
/// - The JSON is malformed
/// - A setting is out of range
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}
