//! CLI error type and download client connection helpers.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use anyhow::anyhow;
use handoff_action::HandoffCycle;
use handoff_config::{ClientProfile, ConfigError, HandoffConfig};
use handoff_core::DownloadClient;
use handoff_qbit::{QbitClient, QbitSettings};
use handoff_telemetry::Metrics;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        if matches!(
            error,
            ConfigError::Io { .. } | ConfigError::Yaml { .. } | ConfigError::Json { .. }
        ) {
            return Self::failure(anyhow::Error::new(error).context("failed to load configuration"));
        }
        let message = match &error {
            ConfigError::MissingPath { env } => {
                format!("no configuration file given; pass --config or set {env}")
            }
            ConfigError::InvalidField {
                section,
                field,
                value,
                reason,
            } => match value {
                Some(value) => format!("{section}.{field} = '{value}': {reason}"),
                None => format!("{section}.{field}: {reason}"),
            },
            ConfigError::UnknownClient { name } => format!("unknown client '{name}'"),
            ConfigError::UnknownAction { name } => format!("unknown action '{name}'"),
            ConfigError::Io { .. } | ConfigError::Yaml { .. } | ConfigError::Json { .. } => {
                error.to_string()
            }
        };
        Self::validation(message)
    }
}

/// Log in to the client described by `profile`.
pub(crate) async fn connect(profile: &ClientProfile) -> CliResult<QbitClient> {
    let settings = QbitSettings::from_profile(profile).map_err(|err| {
        CliError::validation(format!("client '{}' has an invalid endpoint: {err}", profile.name))
    })?;
    QbitClient::connect(settings).await.map_err(|err| {
        CliError::failure(anyhow::Error::new(err).context(format!(
            "failed to open a session with client '{}'",
            profile.name
        )))
    })
}

/// Cycle runner for `profile`, connected and wired to `metrics`.
pub(crate) async fn cycle_for(
    config: &HandoffConfig,
    profile: &ClientProfile,
    metrics: &Metrics,
) -> CliResult<HandoffCycle> {
    let client: Arc<dyn DownloadClient> = Arc::new(connect(profile).await?);
    Ok(
        HandoffCycle::new(client, profile.rules, config.convergence_settings())
            .with_metrics(metrics.clone()),
    )
}

pub(crate) fn metrics() -> CliResult<Metrics> {
    Metrics::new().map_err(|err| CliError::failure(anyhow!("failed to build metrics registry: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_exit_codes() {
        let missing: CliError = ConfigError::UnknownAction { name: "tv".into() }.into();
        assert_eq!(missing.exit_code(), 2);
        assert_eq!(missing.display_message(), "unknown action 'tv'");

        let io: CliError = ConfigError::Io {
            path: "/nope".into(),
            source: std::io::Error::other("denied"),
        }
        .into();
        assert_eq!(io.exit_code(), 3);
        assert!(io.display_message().starts_with("failed to load configuration"));
    }

    #[test]
    fn invalid_field_message_names_the_field() {
        let err: CliError = ConfigError::InvalidField {
            section: "clients.main".into(),
            field: "port".into(),
            value: Some("0".into()),
            reason: "must be between 1 and 65535",
        }
        .into();
        assert_eq!(
            err.display_message(),
            "clients.main.port = '0': must be between 1 and 65535"
        );
    }
}
