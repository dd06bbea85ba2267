//! Failures raised while wiring logging and metrics.

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global tracing subscriber is already installed.
    #[error("global tracing subscriber could not be installed")]
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        #[source]
        source: tracing_subscriber::util::TryInitError,
    },
    /// A handoff counter or gauge definition was rejected.
    #[error("handoff metric definition rejected")]
    CounterBuild {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// A handoff metric clashed with one already in the registry.
    #[error("handoff metric could not be registered")]
    CounterRegister {
        /// Metric name.
        name: &'static str,
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// The text exposition could not be encoded.
    #[error("metrics exposition could not be encoded")]
    ExpositionEncode {
        /// Underlying Prometheus error.
        #[source]
        source: PrometheusError,
    },
    /// The encoded exposition was not UTF-8.
    #[error("metrics exposition was not utf-8")]
    ExpositionUtf8 {
        /// Underlying conversion error.
        #[source]
        source: std::string::FromUtf8Error,
    },
}
