//! Error types for handoff cycles.
//!
//! # Design
//! - Constant messages; context lives in fields.
//! - The originating `ClientError` is always kept as the source.
//! - Transport and authentication failures collapse into `ClientUnreachable`
//!   except during the compensating delete.

use std::fmt::{self, Display, Formatter};

use handoff_core::{ClientError, ContentHash};
use thiserror::Error;

/// Phase of the handoff cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Admission rule evaluation.
    Admission,
    /// Job submission.
    Submission,
    /// Tracker polling and re-announce.
    Convergence,
    /// Delete of an abandoned job.
    Compensation,
}

impl Stage {
    /// Lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admission => "admission",
            Self::Submission => "submission",
            Self::Convergence => "convergence",
            Self::Compensation => "compensation",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Failure that aborted a handoff cycle.
#[derive(Debug, Error)]
pub enum HandoffError {
    /// The client could not be reached or refused the session.
    #[error("download client unreachable")]
    ClientUnreachable {
        /// Stage the call was made in.
        stage: Stage,
        /// Underlying client failure.
        #[source]
        source: ClientError,
    },
    /// The client refused the job.
    #[error("job submission failed")]
    SubmissionFailed {
        /// Underlying client failure.
        #[source]
        source: ClientError,
    },
    /// Reading client state (active jobs, transfer rates, trackers) failed.
    #[error("client state observation failed")]
    ObservationFailed {
        /// Stage the read was made in.
        stage: Stage,
        /// Underlying client failure.
        #[source]
        source: ClientError,
    },
    /// The client refused to re-announce the job.
    #[error("re-announce request failed")]
    ReannounceFailed {
        /// Poll attempt that triggered the re-announce (1-based).
        attempt: u32,
        /// Underlying client failure.
        #[source]
        source: ClientError,
    },
    /// Deleting an abandoned job failed; the job is still on the client.
    #[error("compensating delete failed")]
    CompensationFailed {
        /// Job left behind on the client.
        hash: ContentHash,
        /// Underlying client failure.
        #[source]
        source: ClientError,
    },
    /// The cycle was cancelled by its caller.
    #[error("handoff cycle cancelled")]
    Cancelled {
        /// Stage that was interrupted.
        stage: Stage,
    },
}

impl HandoffError {
    pub(crate) fn observation(stage: Stage, source: ClientError) -> Self {
        if source.is_connectivity() {
            Self::ClientUnreachable { stage, source }
        } else {
            Self::ObservationFailed { stage, source }
        }
    }

    pub(crate) fn submission(source: ClientError) -> Self {
        if source.is_connectivity() {
            Self::ClientUnreachable {
                stage: Stage::Submission,
                source,
            }
        } else {
            Self::SubmissionFailed { source }
        }
    }

    pub(crate) fn reannounce(attempt: u32, source: ClientError) -> Self {
        if source.is_connectivity() {
            Self::ClientUnreachable {
                stage: Stage::Convergence,
                source,
            }
        } else {
            Self::ReannounceFailed { attempt, source }
        }
    }

    /// Stable label used for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ClientUnreachable { .. } => "client_unreachable",
            Self::SubmissionFailed { .. } => "submission_failed",
            Self::ObservationFailed { .. } => "observation_failed",
            Self::ReannounceFailed { .. } => "reannounce_failed",
            Self::CompensationFailed { .. } => "compensation_failed",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Stage the failure was raised in.
    #[must_use]
    pub const fn stage(&self) -> Stage {
        match self {
            Self::ClientUnreachable { stage, .. }
            | Self::ObservationFailed { stage, .. }
            | Self::Cancelled { stage } => *stage,
            Self::SubmissionFailed { .. } => Stage::Submission,
            Self::ReannounceFailed { .. } => Stage::Convergence,
            Self::CompensationFailed { .. } => Stage::Compensation,
        }
    }

    /// Client error that caused the failure, if any.
    #[must_use]
    pub const fn client_error(&self) -> Option<&ClientError> {
        match self {
            Self::ClientUnreachable { source, .. }
            | Self::SubmissionFailed { source }
            | Self::ObservationFailed { source, .. }
            | Self::ReannounceFailed { source, .. }
            | Self::CompensationFailed { source, .. } => Some(source),
            Self::Cancelled { .. } => None,
        }
    }
}

/// Convenience alias for handoff results.
pub type HandoffResult<T> = Result<T, HandoffError>;
