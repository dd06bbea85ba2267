//! Default values applied when a configuration document omits a field.
//!
//! # Design
//! - Loop timings mirror `handoff_core::ConvergenceSettings::default()`.
//! - Keep defaults as plain functions so serde can reference them.

use handoff_core::model::{
    DEFAULT_GRACE_DELAY, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_REANNOUNCE_INTERVAL,
};

/// Default HTTP timeout for client requests, in seconds.
pub const CLIENT_TIMEOUT_SECS: u64 = 30;
/// Default log level.
pub const LOG_LEVEL: &str = "info";

pub(crate) const fn client_timeout_secs() -> u64 {
    CLIENT_TIMEOUT_SECS
}

pub(crate) const fn initial_delay_secs() -> u64 {
    DEFAULT_INITIAL_DELAY.as_secs()
}

pub(crate) fn interval_ms() -> u64 {
    u64::try_from(DEFAULT_REANNOUNCE_INTERVAL.as_millis()).unwrap_or(u64::MAX)
}

pub(crate) const fn max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

pub(crate) const fn grace_delay_secs() -> u64 {
    DEFAULT_GRACE_DELAY.as_secs()
}

pub(crate) const fn enabled() -> bool {
    true
}

pub(crate) fn log_level() -> String {
    LOG_LEVEL.to_string()
}
