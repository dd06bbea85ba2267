//! Error types for building qBittorrent client settings.

use thiserror::Error;

/// Failure raised before any request reaches the client.
#[derive(Debug, Error)]
pub enum QbitError {
    /// The configured host, port or base path do not form a valid URL.
    #[error("invalid qBittorrent endpoint")]
    InvalidEndpoint {
        /// Client name from configuration.
        client: String,
        /// URL that failed to parse.
        value: String,
        /// Underlying parse failure.
        #[source]
        source: url::ParseError,
    },
    /// The endpoint uses a scheme other than http or https.
    #[error("unsupported qBittorrent endpoint scheme")]
    UnsupportedScheme {
        /// Client name from configuration.
        client: String,
        /// Scheme that was supplied.
        scheme: String,
    },
}

/// Convenience alias for settings results.
pub type QbitResult<T> = Result<T, QbitError>;
