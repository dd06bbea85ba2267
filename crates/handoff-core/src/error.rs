//! Error types reported by download client adapters.

use std::error::Error;

use thiserror::Error;

/// Failure of a single remote call against a download client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client could not be reached (connect, TLS, timeout, broken body).
    #[error("download client unreachable")]
    Unreachable {
        /// Client name from configuration.
        client: String,
        /// Operation identifier.
        operation: &'static str,
        /// Underlying transport failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The client refused the session credentials.
    #[error("download client rejected credentials")]
    Unauthorized {
        /// Client name from configuration.
        client: String,
        /// Operation identifier.
        operation: &'static str,
    },
    /// The client answered but refused the request.
    #[error("download client rejected request")]
    Rejected {
        /// Client name from configuration.
        client: String,
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status returned by the client.
        status: u16,
        /// Response body, when one was sent.
        message: Option<String>,
    },
    /// The client answered with a payload that could not be decoded.
    #[error("download client response could not be decoded")]
    Decode {
        /// Client name from configuration.
        client: String,
        /// Operation identifier.
        operation: &'static str,
        /// Underlying decode failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl ClientError {
    /// Operation that produced the failure.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Unreachable { operation, .. }
            | Self::Unauthorized { operation, .. }
            | Self::Rejected { operation, .. }
            | Self::Decode { operation, .. } => operation,
        }
    }

    /// Client name recorded on the failure.
    #[must_use]
    pub fn client(&self) -> &str {
        match self {
            Self::Unreachable { client, .. }
            | Self::Unauthorized { client, .. }
            | Self::Rejected { client, .. }
            | Self::Decode { client, .. } => client,
        }
    }

    /// Whether the failure is a network or authentication problem rather than
    /// a refusal of the specific request.
    #[must_use]
    pub const fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Unauthorized { .. })
    }
}

/// Convenience alias for client call results.
pub type ClientResult<T> = Result<T, ClientError>;
