//! One admission, submission and convergence pass for a single job.
//!
//! # Design
//! - Runs sequentially inside a `handoff_cycle` span tagged with a fresh cycle id.
//! - Any hard error aborts the cycle and is returned unchanged; nothing is retried.
//! - Paused jobs and jobs without a content handle skip convergence.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use handoff_core::{ClientRuleSet, ContentHash, ConvergenceSettings, DownloadClient, Job};
use handoff_telemetry::Metrics;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::admission::{AdmissionDecision, AdmissionGate, DeferReason};
use crate::convergence::{AnnounceConvergence, ConvergenceOutcome};
use crate::dispatch::SubmissionDispatcher;
use crate::error::{HandoffError, HandoffResult, Stage};

/// Result of a completed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The admission gate refused the job; nothing was submitted.
    Deferred(DeferReason),
    /// The job was handed to the client.
    Submitted {
        /// Content handle, when the caller supplied one.
        hash: Option<ContentHash>,
        /// Convergence result; `None` when convergence was skipped.
        convergence: Option<ConvergenceOutcome>,
    },
}

/// Runs handoff cycles against one client.
#[derive(Clone)]
pub struct HandoffCycle {
    client: Arc<dyn DownloadClient>,
    gate: AdmissionGate,
    dispatcher: SubmissionDispatcher,
    convergence: AnnounceConvergence,
    metrics: Option<Metrics>,
}

impl HandoffCycle {
    /// Cycle runner for `client` with its admission rules and loop timings.
    #[must_use]
    pub fn new(
        client: Arc<dyn DownloadClient>,
        rules: ClientRuleSet,
        settings: ConvergenceSettings,
    ) -> Self {
        Self {
            client,
            gate: AdmissionGate::new(rules),
            dispatcher: SubmissionDispatcher::new(),
            convergence: AnnounceConvergence::new(settings),
            metrics: None,
        }
    }

    /// Record decisions, submissions and outcomes in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.dispatcher = self.dispatcher.with_metrics(metrics.clone());
        self.convergence = self.convergence.with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    /// Evaluate admission only, without submitting anything.
    ///
    /// # Errors
    ///
    /// Returns an error when the client state needed by the rules cannot be read.
    pub async fn admit(&self, rule_exempt: bool) -> HandoffResult<AdmissionDecision> {
        let decision = self.gate.evaluate(self.client.as_ref(), rule_exempt).await?;
        if let Some(metrics) = &self.metrics {
            metrics.inc_admission(decision.as_str());
        }
        Ok(decision)
    }

    /// Run admission, submission and convergence for `job`.
    ///
    /// # Errors
    ///
    /// Returns the first [`HandoffError`] raised by any stage, including
    /// [`HandoffError::Cancelled`] when `cancel` fires.
    pub async fn run(&self, job: &Job, cancel: &CancellationToken) -> HandoffResult<CycleOutcome> {
        let cycle_id = Uuid::new_v4();
        let span = info_span!(
            "handoff_cycle",
            cycle_id = %cycle_id,
            client = self.client.name(),
            hash = job.hash.as_ref().map(ContentHash::as_str),
        );

        if let Some(metrics) = &self.metrics {
            metrics.cycle_started();
        }
        let result = self.run_stages(job, cancel).instrument(span.clone()).await;
        if let Some(metrics) = &self.metrics {
            metrics.cycle_finished();
            if let Err(err) = &result {
                metrics.inc_cycle_error(err.kind());
            }
        }
        if let Err(err) = &result {
            span.in_scope(|| {
                warn!(
                    error = %err,
                    kind = err.kind(),
                    stage = %err.stage(),
                    "handoff cycle aborted"
                );
            });
        }
        result
    }

    async fn run_stages(
        &self,
        job: &Job,
        cancel: &CancellationToken,
    ) -> HandoffResult<CycleOutcome> {
        if cancel.is_cancelled() {
            return Err(HandoffError::Cancelled {
                stage: Stage::Admission,
            });
        }

        if let AdmissionDecision::Defer(reason) = self.admit(job.ignore_rules).await? {
            info!(%reason, "job deferred by admission rules");
            return Ok(CycleOutcome::Deferred(reason));
        }

        if cancel.is_cancelled() {
            return Err(HandoffError::Cancelled {
                stage: Stage::Submission,
            });
        }
        let hash = self.dispatcher.submit(job, self.client.as_ref()).await?;

        if job.options.start_paused {
            info!("job added paused, skipping announce convergence");
            return Ok(CycleOutcome::Submitted {
                hash,
                convergence: None,
            });
        }
        let Some(content_hash) = hash.as_ref() else {
            warn!("job has no content hash, skipping announce convergence");
            return Ok(CycleOutcome::Submitted {
                hash,
                convergence: None,
            });
        };

        let outcome = self
            .convergence
            .converge(self.client.as_ref(), content_hash, cancel)
            .await?;
        if let Some(metrics) = &self.metrics {
            metrics.inc_convergence(outcome.as_str());
        }
        Ok(CycleOutcome::Submitted {
            hash,
            convergence: Some(outcome),
        })
    }
}

impl Debug for HandoffCycle {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HandoffCycle")
            .field("client", &self.client.name())
            .field("gate", &self.gate)
            .field("settings", self.convergence.settings())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
