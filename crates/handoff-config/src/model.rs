//! Typed configuration documents.
//!
//! # Design
//! - Pure data carriers deserialised from YAML or JSON.
//! - Conversion helpers produce the core types consumed by the handoff cycle.

use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use handoff_core::{ClientRuleSet, ConvergenceSettings, JobOptions};
use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::{ConfigError, ConfigResult};

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct HandoffConfig {
    #[serde(default)]
    /// Download clients available to actions.
    pub clients: Vec<ClientProfile>,
    #[serde(default)]
    /// Named submission profiles.
    pub actions: Vec<ActionProfile>,
    #[serde(default)]
    /// Announce convergence loop timings.
    pub convergence: ConvergenceSection,
    #[serde(default)]
    /// Logging output.
    pub logging: LoggingSection,
}

impl HandoffConfig {
    /// Look up a client by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownClient`] when no client has that name.
    pub fn client(&self, name: &str) -> ConfigResult<&ClientProfile> {
        self.clients
            .iter()
            .find(|client| client.name == name)
            .ok_or_else(|| ConfigError::UnknownClient {
                name: name.to_string(),
            })
    }

    /// Look up an action by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownAction`] when no action has that name.
    pub fn action(&self, name: &str) -> ConfigResult<&ActionProfile> {
        self.actions
            .iter()
            .find(|action| action.name == name)
            .ok_or_else(|| ConfigError::UnknownAction {
                name: name.to_string(),
            })
    }

    /// Convergence settings derived from the `convergence` section.
    #[must_use]
    pub const fn convergence_settings(&self) -> ConvergenceSettings {
        self.convergence.to_settings()
    }
}

/// Connection details and admission rules for one download client.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientProfile {
    /// Unique client name referenced by actions.
    pub name: String,
    /// Hostname or IP address, without scheme.
    pub host: String,
    /// Web UI port.
    pub port: u16,
    #[serde(default)]
    /// Web UI username.
    pub username: String,
    #[serde(default)]
    /// Web UI password.
    pub password: String,
    #[serde(default)]
    /// Use HTTPS.
    pub tls: bool,
    #[serde(default)]
    /// Path prefix when the web UI sits behind a reverse proxy.
    pub base_path: Option<String>,
    #[serde(default = "defaults::client_timeout_secs")]
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    #[serde(default)]
    /// Admission rules evaluated before each submission.
    pub rules: ClientRuleSet,
}

impl ClientProfile {
    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Debug for ClientProfile {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientProfile")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("tls", &self.tls)
            .field("base_path", &self.base_path)
            .field("timeout_secs", &self.timeout_secs)
            .field("rules", &self.rules)
            .finish()
    }
}

/// Named submission profile: which client to use and how to add jobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ActionProfile {
    /// Unique action name.
    pub name: String,
    /// Client this action submits to.
    pub client: String,
    #[serde(default)]
    /// Save path override.
    pub save_path: Option<String>,
    #[serde(default)]
    /// Category label.
    pub category: Option<String>,
    #[serde(default)]
    /// Tags applied to submitted jobs.
    pub tags: Vec<String>,
    #[serde(default)]
    /// Create jobs paused (skips announce convergence).
    pub paused: bool,
    #[serde(default)]
    /// Upload cap in bytes per second; zero leaves the client default.
    pub upload_limit: Option<u64>,
    #[serde(default)]
    /// Download cap in bytes per second; zero leaves the client default.
    pub download_limit: Option<u64>,
    #[serde(default)]
    /// Bypass the client's admission rules.
    pub ignore_rules: bool,
}

impl ActionProfile {
    /// Submission options declared by this action.
    #[must_use]
    pub fn job_options(&self) -> JobOptions {
        JobOptions {
            save_path: self.save_path.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
            start_paused: self.paused,
            upload_limit: self.upload_limit,
            download_limit: self.download_limit,
        }
    }
}

/// Convergence loop timings as written in the configuration file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConvergenceSection {
    #[serde(default = "defaults::initial_delay_secs")]
    /// Wait before the first tracker check, in seconds.
    pub initial_delay_secs: u64,
    #[serde(default = "defaults::interval_ms")]
    /// Wait after each re-announce, in milliseconds.
    pub interval_ms: u64,
    #[serde(default = "defaults::max_attempts")]
    /// Tracker polls before the job is abandoned.
    pub max_attempts: u32,
    #[serde(default = "defaults::grace_delay_secs")]
    /// Wait before the compensating delete, in seconds.
    pub grace_delay_secs: u64,
    #[serde(default = "defaults::enabled")]
    /// Delete jobs whose trackers never converge.
    pub delete_on_failure: bool,
}

impl Default for ConvergenceSection {
    fn default() -> Self {
        Self {
            initial_delay_secs: defaults::initial_delay_secs(),
            interval_ms: defaults::interval_ms(),
            max_attempts: defaults::max_attempts(),
            grace_delay_secs: defaults::grace_delay_secs(),
            delete_on_failure: defaults::enabled(),
        }
    }
}

impl ConvergenceSection {
    /// Convert into the settings consumed by the convergence loop.
    #[must_use]
    pub const fn to_settings(&self) -> ConvergenceSettings {
        ConvergenceSettings {
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            interval: Duration::from_millis(self.interval_ms),
            max_attempts: self.max_attempts,
            grace_delay: Duration::from_secs(self.grace_delay_secs),
            delete_on_failure: self.delete_on_failure,
        }
    }
}

/// Logging output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    #[serde(default = "defaults::log_level")]
    /// Level or `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    #[serde(default)]
    /// `json` or `pretty`; inferred from the build profile when unset.
    pub format: Option<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
            format: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HandoffConfig {
        HandoffConfig {
            clients: vec![ClientProfile {
                name: "main".into(),
                host: "localhost".into(),
                port: 8080,
                username: "admin".into(),
                password: "hunter2".into(),
                tls: false,
                base_path: None,
                timeout_secs: 10,
                rules: ClientRuleSet::default(),
            }],
            actions: vec![ActionProfile {
                name: "tv".into(),
                client: "main".into(),
                save_path: Some("/data/tv".into()),
                category: Some("tv".into()),
                tags: vec!["auto".into()],
                paused: true,
                upload_limit: None,
                download_limit: Some(2_048),
                ignore_rules: false,
            }],
            ..HandoffConfig::default()
        }
    }

    #[test]
    fn lookups_resolve_names() {
        let config = sample();
        assert_eq!(config.client("main").expect("client").port, 8080);
        assert!(matches!(
            config.client("missing"),
            Err(ConfigError::UnknownClient { .. })
        ));
        assert!(config.action("tv").is_ok());
        assert!(matches!(
            config.action("movies"),
            Err(ConfigError::UnknownAction { .. })
        ));
    }

    #[test]
    fn action_maps_to_job_options() {
        let config = sample();
        let options = config.action("tv").expect("action").job_options();
        assert_eq!(options.save_path.as_deref(), Some("/data/tv"));
        assert!(options.start_paused);
        assert_eq!(options.download_limit, Some(2_048));
        assert_eq!(options.upload_limit, None);
    }

    #[test]
    fn default_convergence_section_matches_core_defaults() {
        assert_eq!(
            ConvergenceSection::default().to_settings(),
            ConvergenceSettings::default()
        );
    }

    #[test]
    fn client_debug_redacts_password() {
        let config = sample();
        let rendered = format!("{:?}", config.clients[0]);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
