//! Run configuration as read from `config.json`.
//!
//! Every section is optional; absent fields take the defaults below.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;

/// Smallest cylinder facet count accepted by [`KernelConfig`].
pub const MIN_CYLINDER_SEGMENTS: usize = 8;

/// Root of the JSON configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Reference kernel settings.
    #[serde(default)]
    pub kernel: KernelConfig,

    /// Which artefacts to write.
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// File that receives the numeric exit code of every run.
    #[serde(default)]
    pub rc_file: Option<PathBuf>,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kernel.cylinder_segments < MIN_CYLINDER_SEGMENTS {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "kernel.cylinder_segments must be at least {MIN_CYLINDER_SEGMENTS}, got {}",
                    self.kernel.cylinder_segments
                ),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            });
        }
        Ok(())
    }
}

/// Reference geometry kernel configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KernelConfig {
    /// Number of side facets used to approximate a cylinder.
    #[serde(default = "default_cylinder_segments")]
    pub cylinder_segments: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            cylinder_segments: default_cylinder_segments(),
        }
    }
}

const fn default_cylinder_segments() -> usize {
    24
}

/// Output artefact selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(clippy::struct_excessive_bools)]
pub struct OutputConfig {
    /// Write the native JSON document.
    #[serde(default = "default_true")]
    pub native: bool,

    /// Write the STEP interchange file.
    #[serde(default = "default_true")]
    pub interchange: bool,

    /// Write the deterministic description log.
    #[serde(default = "default_true")]
    pub description_log: bool,

    /// Mirror debug-level events into a file next to the model.
    #[serde(default = "default_true")]
    pub debug_file: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            native: true,
            interchange: true,
            description_log: true,
            debug_file: true,
        }
    }
}

const fn default_true() -> bool {
    true
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.kernel.cylinder_segments, 24);
        assert!(config.output.native);
        assert!(config.rc_file.is_none());
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "kernel": { "cylinder_segments": 48 },
            "output": {
                "native": false,
                "interchange": true,
                "description_log": true,
                "debug_file": false
            },
            "logging": { "level": "debug" },
            "rc_file": "/tmp/ic3d.rc"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.kernel.cylinder_segments, 48);
        assert!(!config.output.native);
        assert!(!config.output.debug_file);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.rc_file, Some(PathBuf::from("/tmp/ic3d.rc")));
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_coarse_cylinders() {
        let json = r#"{ "kernel": { "cylinder_segments": 4 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_invalid_log_level() {
        let json = r#"{ "logging": { "level": "loud" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
