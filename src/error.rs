//! Error types for ic3d-synth.
//!
//! Every fatal condition in the synthesis pipeline maps to one [`SynthError`]
//! variant, and every variant maps to a distinct process exit code (see
//! [`SynthError::exit_code`]). Geometry kernel failures are reported as
//! [`KernelError`] and wrapped with the operation that triggered them.

use std::path::PathBuf;

use thiserror::Error;

use crate::kernel::KernelError;
use crate::params::ParamError;

/// Errors that can occur while loading the run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised by the synthesis pipeline.
#[derive(Error, Debug)]
pub enum SynthError {
    /// Package parameters are missing, malformed, or geometrically inconsistent.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// A package family, pin kind, or pin side is not supported.
    #[error("unsupported {what}: '{token}'")]
    UnsupportedFamily {
        /// What kind of token was rejected (family, pin kind, pin side).
        what: &'static str,
        /// The offending token.
        token: String,
    },

    /// A geometry kernel operation failed.
    #[error("kernel operation '{operation}' failed")]
    Kernel {
        /// Name of the document-level operation.
        operation: String,
        /// The kernel failure.
        #[source]
        source: KernelError,
    },

    /// Parameter file loading failed.
    #[error(transparent)]
    Params(#[from] ParamError),

    /// Output file could not be written.
    #[error("failed to write {path}")]
    Io {
        /// Path being written.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serialising an output document failed.
    #[error("export failed: {message}")]
    Export {
        /// Description of the failure.
        message: String,
    },
}

impl SynthError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an unsupported-token error.
    pub fn unsupported(what: &'static str, token: impl Into<String>) -> Self {
        Self::UnsupportedFamily {
            what,
            token: token.into(),
        }
    }

    /// Wraps a kernel failure with the operation that caused it.
    pub fn kernel(operation: impl Into<String>, source: KernelError) -> Self {
        Self::Kernel {
            operation: operation.into(),
            source,
        }
    }

    /// Creates an output write error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the process exit code for this error.
    ///
    /// Each error kind has its own ordinal so callers driving the tool from
    /// scripts can tell failures apart without parsing messages.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration { .. } | Self::Params(_) => 2,
            Self::UnsupportedFamily { .. } => 3,
            Self::Kernel { .. } => 4,
            Self::Io { .. } | Self::Export { .. } => 5,
        }
    }
}

/// Result type for synthesis operations.
pub type SynthResult<T> = Result<T, SynthError>;
