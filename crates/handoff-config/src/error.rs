//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration path was supplied.
    #[error("configuration path missing")]
    MissingPath {
        /// Environment variable consulted as fallback.
        env: &'static str,
    },
    /// Reading the configuration file failed.
    #[error("filesystem operation failed")]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// YAML document could not be parsed.
    #[error("invalid yaml configuration")]
    Yaml {
        /// File that failed to parse.
        path: PathBuf,
        /// Source YAML error.
        source: serde_yaml::Error,
    },
    /// JSON document could not be parsed.
    #[error("invalid json configuration")]
    Json {
        /// File that failed to parse.
        path: PathBuf,
        /// Source JSON error.
        source: serde_json::Error,
    },
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Section that failed validation.
        section: String,
        /// Field that failed validation.
        field: String,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// A download client name did not resolve.
    #[error("unknown download client")]
    UnknownClient {
        /// Requested client name.
        name: String,
    },
    /// An action name did not resolve.
    #[error("unknown action")]
    UnknownAction {
        /// Requested action name.
        name: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        section: impl Into<String>,
        field: impl Into<String>,
        value: Option<String>,
        reason: &'static str,
    ) -> Self {
        Self::InvalidField {
            section: section.into(),
            field: field.into(),
            value,
            reason,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
