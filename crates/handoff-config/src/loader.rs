//! Configuration loading from YAML or JSON files.
//!
//! # Design
//! - The file extension selects the parser (`.json` is JSON, anything else YAML).
//! - Every loaded document is validated before it is returned.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::model::HandoffConfig;
use crate::validate::validate;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "HANDOFF_CONFIG";

/// Serialisation format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// YAML document.
    Yaml,
    /// JSON document.
    Json,
}

impl DocumentFormat {
    /// Pick the format from a file extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

/// Resolve the configuration path from an explicit value or `HANDOFF_CONFIG`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingPath`] when neither source provides a path.
pub fn resolve_path(explicit: Option<PathBuf>) -> ConfigResult<PathBuf> {
    resolve_path_with(explicit, std::env::var(CONFIG_PATH_ENV).ok())
}

fn resolve_path_with(explicit: Option<PathBuf>, env_value: Option<String>) -> ConfigResult<PathBuf> {
    explicit
        .or_else(|| {
            env_value
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
        })
        .ok_or(ConfigError::MissingPath {
            env: CONFIG_PATH_ENV,
        })
}

/// Read, parse and validate a configuration file.
///
/// # Errors
///
/// Returns an error when the file cannot be read, parsed, or fails validation.
pub fn load_from_path(path: &Path) -> ConfigResult<HandoffConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_document(&raw, DocumentFormat::from_path(path), path)?;
    info!(
        path = %path.display(),
        clients = config.clients.len(),
        actions = config.actions.len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Parse and validate a configuration document held in memory.
///
/// `origin` is only used for error context.
///
/// # Errors
///
/// Returns an error when the document cannot be parsed or fails validation.
pub fn parse_document(
    raw: &str,
    format: DocumentFormat,
    origin: &Path,
) -> ConfigResult<HandoffConfig> {
    let config: HandoffConfig = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(raw).map_err(|source| ConfigError::Yaml {
            path: origin.to_path_buf(),
            source,
        })?,
        DocumentFormat::Json => serde_json::from_str(raw).map_err(|source| ConfigError::Json {
            path: origin.to_path_buf(),
            source,
        })?,
    };
    debug!(?format, "configuration document parsed");
    validate(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("handoff.json")),
            DocumentFormat::Json
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("handoff.yml")),
            DocumentFormat::Yaml
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("handoff")),
            DocumentFormat::Yaml
        );
    }

    #[test]
    fn explicit_path_wins_over_environment() {
        let resolved = resolve_path_with(
            Some(PathBuf::from("/etc/handoff.yaml")),
            Some("/tmp/other.yaml".into()),
        )
        .expect("path should resolve");
        assert_eq!(resolved, PathBuf::from("/etc/handoff.yaml"));
    }

    #[test]
    fn environment_path_is_used_as_fallback() {
        let resolved = resolve_path_with(None, Some("/tmp/handoff.yaml".into()))
            .expect("path should resolve");
        assert_eq!(resolved, PathBuf::from("/tmp/handoff.yaml"));
        assert!(matches!(
            resolve_path_with(None, Some("  ".into())),
            Err(ConfigError::MissingPath { .. })
        ));
        assert!(resolve_path_with(None, None).is_err());
    }

    #[test]
    fn empty_yaml_document_uses_defaults() {
        let config = parse_document("{}", DocumentFormat::Yaml, Path::new("inline"))
            .expect("empty document should parse");
        assert!(config.clients.is_empty());
        assert_eq!(config.convergence.max_attempts, 50);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse_document("{\"bogus\": 1}", DocumentFormat::Json, Path::new("inline"))
            .expect_err("unknown field should fail");
        assert!(matches!(err, ConfigError::Json { .. }));
    }
}
