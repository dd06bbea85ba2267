//! Announce convergence loop run after a job is submitted.
//!
//! # Design
//! - Waits a fixed quiescence delay, then polls trackers up to `max_attempts`
//!   times, re-announcing and pausing after every poll without a working tracker.
//! - Disabled entries (DHT, `PeX`, LSD) never block or satisfy convergence.
//! - An exhausted budget is an outcome, not an error: the job is deleted after a
//!   grace delay, keeping its data.
//! - Every wait races the cancellation token; a cancelled loop issues no
//!   further remote calls.

use std::time::Duration;

use handoff_core::{ContentHash, ConvergenceSettings, DownloadClient, TrackerEntry, TrackerStatus};
use handoff_telemetry::Metrics;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{HandoffError, HandoffResult, Stage};

/// Final state of a convergence loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceOutcome {
    /// A tracker reported the job as working.
    Converged {
        /// Tracker polls performed, including the successful one.
        attempts: u32,
    },
    /// No tracker worked within the attempt budget.
    Abandoned {
        /// Tracker polls performed.
        attempts: u32,
        /// Whether the job was removed from the client.
        deleted: bool,
    },
}

impl ConvergenceOutcome {
    /// Metric label for the outcome.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Converged { .. } => "converged",
            Self::Abandoned { .. } => "abandoned",
        }
    }
}

/// Whether any enabled tracker reports `Working`.
#[must_use]
pub fn trackers_converged(entries: &[TrackerEntry]) -> bool {
    entries
        .iter()
        .filter(|entry| entry.status != TrackerStatus::Disabled)
        .any(|entry| entry.status == TrackerStatus::Working)
}

/// Drives a submitted job until one of its trackers accepts it.
#[derive(Clone, Default)]
pub struct AnnounceConvergence {
    settings: ConvergenceSettings,
    metrics: Option<Metrics>,
}

impl AnnounceConvergence {
    /// Loop with the given timings.
    #[must_use]
    pub const fn new(settings: ConvergenceSettings) -> Self {
        Self {
            settings,
            metrics: None,
        }
    }

    /// Count re-announce requests in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Timings in effect.
    #[must_use]
    pub const fn settings(&self) -> &ConvergenceSettings {
        &self.settings
    }

    /// Poll and re-announce `hash` until a tracker works or the budget runs out.
    ///
    /// # Errors
    ///
    /// - [`HandoffError::ObservationFailed`] when the tracker list cannot be read.
    /// - [`HandoffError::ReannounceFailed`] when the client refuses to re-announce.
    /// - [`HandoffError::ClientUnreachable`] on transport or session failures.
    /// - [`HandoffError::CompensationFailed`] when the abandoned job cannot be deleted.
    /// - [`HandoffError::Cancelled`] when `cancel` fires during a wait.
    pub async fn converge(
        &self,
        client: &dyn DownloadClient,
        hash: &ContentHash,
        cancel: &CancellationToken,
    ) -> HandoffResult<ConvergenceOutcome> {
        let settings = &self.settings;
        pause(settings.initial_delay, cancel, Stage::Convergence).await?;

        for attempt in 1..=settings.max_attempts {
            let trackers = client
                .trackers(hash)
                .await
                .map_err(|err| HandoffError::observation(Stage::Convergence, err))?;
            if trackers_converged(&trackers) {
                info!(client = client.name(), hash = %hash, attempt, "tracker announce converged");
                return Ok(ConvergenceOutcome::Converged { attempts: attempt });
            }

            debug!(
                client = client.name(),
                hash = %hash,
                attempt,
                trackers = trackers.len(),
                "no working tracker yet, re-announcing"
            );
            client
                .reannounce(hash)
                .await
                .map_err(|err| HandoffError::reannounce(attempt, err))?;
            if let Some(metrics) = &self.metrics {
                metrics.inc_reannounce();
            }
            pause(settings.interval, cancel, Stage::Convergence).await?;
        }

        let attempts = settings.max_attempts;
        if !settings.delete_on_failure {
            warn!(
                client = client.name(),
                hash = %hash,
                attempts,
                "tracker announce never converged, leaving job on client"
            );
            return Ok(ConvergenceOutcome::Abandoned {
                attempts,
                deleted: false,
            });
        }

        warn!(
            client = client.name(),
            hash = %hash,
            attempts,
            "tracker announce never converged, deleting job"
        );
        pause(settings.grace_delay, cancel, Stage::Compensation).await?;
        client
            .delete(hash, false)
            .await
            .map_err(|source| HandoffError::CompensationFailed {
                hash: hash.clone(),
                source,
            })?;
        Ok(ConvergenceOutcome::Abandoned {
            attempts,
            deleted: true,
        })
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub(crate) async fn pause(
    duration: Duration,
    cancel: &CancellationToken,
    stage: Stage,
) -> HandoffResult<()> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(HandoffError::Cancelled { stage }),
        () = sleep(duration) => Ok(()),
    }
}
