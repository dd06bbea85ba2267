//! Connection settings for one qBittorrent instance.

use std::fmt::{self, Debug, Formatter};
use std::time::Duration;

use handoff_config::ClientProfile;
use handoff_config::defaults::CLIENT_TIMEOUT_SECS;
use url::Url;

use crate::error::{QbitError, QbitResult};

/// Endpoint, credentials and timeout used to open a session.
#[derive(Clone)]
pub struct QbitSettings {
    name: String,
    base_url: Url,
    username: String,
    password: String,
    timeout: Duration,
}

impl QbitSettings {
    /// Settings for the web UI at `base_url` with empty credentials.
    ///
    /// # Errors
    ///
    /// Returns an error when `base_url` is not an http(s) URL.
    pub fn new(name: impl Into<String>, base_url: &str) -> QbitResult<Self> {
        let name = name.into();
        let parsed = Url::parse(base_url).map_err(|source| QbitError::InvalidEndpoint {
            client: name.clone(),
            value: base_url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(QbitError::UnsupportedScheme {
                client: name,
                scheme: parsed.scheme().to_string(),
            });
        }
        Ok(Self {
            name,
            base_url: parsed,
            username: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(CLIENT_TIMEOUT_SECS),
        })
    }

    /// Build settings from a configured client profile.
    ///
    /// # Errors
    ///
    /// Returns an error when host, port and base path do not form a valid URL.
    pub fn from_profile(profile: &ClientProfile) -> QbitResult<Self> {
        let scheme = if profile.tls { "https" } else { "http" };
        let base_path = profile
            .base_path
            .as_deref()
            .map_or("", |path| path.trim_end_matches('/'));
        let url = format!("{scheme}://{}:{}{base_path}", profile.host, profile.port);
        Ok(Self::new(profile.name.clone(), &url)?
            .with_credentials(profile.username.clone(), profile.password.clone())
            .with_timeout(profile.timeout()))
    }

    /// Replace the login credentials.
    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Replace the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Client name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub(crate) fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Absolute URL of a WebAPI v2 method, e.g. `torrents/info`.
    #[must_use]
    pub fn api_url(&self, method: &str) -> String {
        format!(
            "{}/api/v2/{method}",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}

impl Debug for QbitSettings {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("QbitSettings")
            .field("name", &self.name)
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}
