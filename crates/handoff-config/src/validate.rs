//! Validation helpers for configuration documents.

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{ActionProfile, ClientProfile, ConvergenceSection, HandoffConfig, LoggingSection};

/// Validate a parsed configuration document.
///
/// # Errors
///
/// Returns the first [`ConfigError::InvalidField`] encountered.
pub fn validate(config: &HandoffConfig) -> ConfigResult<()> {
    let mut client_names = HashSet::new();
    for client in &config.clients {
        validate_client(client)?;
        if !client_names.insert(client.name.as_str()) {
            return Err(ConfigError::invalid(
                "clients",
                "name",
                Some(client.name.clone()),
                "must be unique",
            ));
        }
    }

    let mut action_names = HashSet::new();
    for action in &config.actions {
        validate_action(action, &client_names)?;
        if !action_names.insert(action.name.as_str()) {
            return Err(ConfigError::invalid(
                "actions",
                "name",
                Some(action.name.clone()),
                "must be unique",
            ));
        }
    }

    validate_convergence(&config.convergence)?;
    validate_logging(&config.logging)
}

fn validate_client(client: &ClientProfile) -> ConfigResult<()> {
    let section = format!("clients.{}", client.name);
    if client.name.trim().is_empty() {
        return Err(ConfigError::invalid("clients", "name", None, "must not be empty"));
    }
    if client.host.trim().is_empty() {
        return Err(ConfigError::invalid(section, "host", None, "must not be empty"));
    }
    if client.host.contains("://") {
        return Err(ConfigError::invalid(
            section,
            "host",
            Some(client.host.clone()),
            "must not include a scheme; use `tls`",
        ));
    }
    if client.port == 0 {
        return Err(ConfigError::invalid(
            section,
            "port",
            Some("0".to_string()),
            "must be between 1 and 65535",
        ));
    }
    if client.timeout_secs == 0 {
        return Err(ConfigError::invalid(
            section,
            "timeout_secs",
            Some("0".to_string()),
            "must be positive",
        ));
    }
    if let Some(base_path) = client.base_path.as_deref()
        && !base_path.starts_with('/')
    {
        return Err(ConfigError::invalid(
            section,
            "base_path",
            Some(base_path.to_string()),
            "must start with '/'",
        ));
    }
    Ok(())
}

fn validate_action(action: &ActionProfile, clients: &HashSet<&str>) -> ConfigResult<()> {
    if action.name.trim().is_empty() {
        return Err(ConfigError::invalid("actions", "name", None, "must not be empty"));
    }
    if !clients.contains(action.client.as_str()) {
        return Err(ConfigError::invalid(
            format!("actions.{}", action.name),
            "client",
            Some(action.client.clone()),
            "references an unknown client",
        ));
    }
    if action.tags.iter().any(|tag| tag.contains(',')) {
        return Err(ConfigError::invalid(
            format!("actions.{}", action.name),
            "tags",
            Some(action.tags.join(",")),
            "tags must not contain commas",
        ));
    }
    Ok(())
}

fn validate_convergence(section: &ConvergenceSection) -> ConfigResult<()> {
    if section.max_attempts == 0 {
        return Err(ConfigError::invalid(
            "convergence",
            "max_attempts",
            Some("0".to_string()),
            "must be at least 1",
        ));
    }
    if section.interval_ms == 0 {
        return Err(ConfigError::invalid(
            "convergence",
            "interval_ms",
            Some("0".to_string()),
            "must be positive",
        ));
    }
    Ok(())
}

fn validate_logging(section: &LoggingSection) -> ConfigResult<()> {
    if section.level.trim().is_empty() {
        return Err(ConfigError::invalid("logging", "level", None, "must not be empty"));
    }
    match section.format.as_deref() {
        None | Some("json" | "pretty") => Ok(()),
        Some(other) => Err(ConfigError::invalid(
            "logging",
            "format",
            Some(other.to_string()),
            "must be 'json' or 'pretty'",
        )),
    }
}
