//! Prometheus-backed metrics registry and snapshot helpers.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - Exposes only the counters the handoff cycle reports.

use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared by handoff cycles.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    admission_decisions_total: IntCounterVec,
    submissions_total: IntCounterVec,
    reannounce_requests_total: IntCounter,
    convergence_outcomes_total: IntCounterVec,
    cycle_errors_total: IntCounterVec,
    cycles_in_flight: IntGauge,
}

/// Snapshot of selected counters for reporting.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Jobs admitted by the admission gate.
    pub admitted_total: u64,
    /// Jobs deferred by the admission gate.
    pub deferred_total: u64,
    /// Re-announce requests issued.
    pub reannounce_requests_total: u64,
    /// Jobs whose trackers converged.
    pub converged_total: u64,
    /// Jobs abandoned after the attempt budget ran out.
    pub abandoned_total: u64,
    /// Cycles currently running.
    pub cycles_in_flight: i64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let admission_decisions_total = counter_vec(
            "handoff_admission_decisions_total",
            "Admission decisions by outcome",
            &["decision"],
        )?;
        let submissions_total = counter_vec(
            "handoff_submissions_total",
            "Job submissions by status",
            &["status"],
        )?;
        let reannounce_requests_total = IntCounter::with_opts(Opts::new(
            "handoff_reannounce_requests_total",
            "Re-announce requests sent to download clients",
        ))
        .map_err(|source| TelemetryError::CounterBuild {
            name: "handoff_reannounce_requests_total",
            source,
        })?;
        let convergence_outcomes_total = counter_vec(
            "handoff_convergence_outcomes_total",
            "Announce convergence outcomes",
            &["outcome"],
        )?;
        let cycle_errors_total = counter_vec(
            "handoff_cycle_errors_total",
            "Handoff cycles aborted by error kind",
            &["kind"],
        )?;
        let cycles_in_flight = IntGauge::with_opts(Opts::new(
            "handoff_cycles_in_flight",
            "Handoff cycles currently running",
        ))
        .map_err(|source| TelemetryError::CounterBuild {
            name: "handoff_cycles_in_flight",
            source,
        })?;

        register(
            &registry,
            "handoff_admission_decisions_total",
            Box::new(admission_decisions_total.clone()),
        )?;
        register(
            &registry,
            "handoff_submissions_total",
            Box::new(submissions_total.clone()),
        )?;
        register(
            &registry,
            "handoff_reannounce_requests_total",
            Box::new(reannounce_requests_total.clone()),
        )?;
        register(
            &registry,
            "handoff_convergence_outcomes_total",
            Box::new(convergence_outcomes_total.clone()),
        )?;
        register(
            &registry,
            "handoff_cycle_errors_total",
            Box::new(cycle_errors_total.clone()),
        )?;
        register(
            &registry,
            "handoff_cycles_in_flight",
            Box::new(cycles_in_flight.clone()),
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                admission_decisions_total,
                submissions_total,
                reannounce_requests_total,
                convergence_outcomes_total,
                cycle_errors_total,
                cycles_in_flight,
            }),
        })
    }

    /// Count an admission decision (`admit` or `defer`).
    pub fn inc_admission(&self, decision: &str) {
        self.inner
            .admission_decisions_total
            .with_label_values(&[decision])
            .inc();
    }

    /// Count a submission attempt by status (`ok` or `failed`).
    pub fn inc_submission(&self, status: &str) {
        self.inner
            .submissions_total
            .with_label_values(&[status])
            .inc();
    }

    /// Count one re-announce request.
    pub fn inc_reannounce(&self) {
        self.inner.reannounce_requests_total.inc();
    }

    /// Count a convergence outcome (`converged` or `abandoned`).
    pub fn inc_convergence(&self, outcome: &str) {
        self.inner
            .convergence_outcomes_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Count a cycle aborted by the given error kind.
    pub fn inc_cycle_error(&self, kind: &str) {
        self.inner
            .cycle_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Mark a cycle as started.
    pub fn cycle_started(&self) {
        self.inner.cycles_in_flight.inc();
    }

    /// Mark a cycle as finished.
    pub fn cycle_finished(&self) {
        self.inner.cycles_in_flight.dec();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::ExpositionEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::ExpositionUtf8 { source })
    }

    /// Take a point-in-time snapshot of the handoff counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = &self.inner;
        MetricsSnapshot {
            admitted_total: inner
                .admission_decisions_total
                .with_label_values(&["admit"])
                .get(),
            deferred_total: inner
                .admission_decisions_total
                .with_label_values(&["defer"])
                .get(),
            reannounce_requests_total: inner.reannounce_requests_total.get(),
            converged_total: inner
                .convergence_outcomes_total
                .with_label_values(&["converged"])
                .get(),
            abandoned_total: inner
                .convergence_outcomes_total
                .with_label_values(&["abandoned"])
                .get(),
            cycles_in_flight: inner.cycles_in_flight.get(),
        }
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::CounterBuild { name, source })
}

fn register(
    registry: &Registry,
    name: &'static str,
    collector: Box<dyn prometheus::core::Collector>,
) -> Result<()> {
    registry
        .register(collector)
        .map_err(|source| TelemetryError::CounterRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_admission("admit");
        metrics.inc_admission("admit");
        metrics.inc_admission("defer");
        metrics.inc_submission("ok");
        metrics.inc_reannounce();
        metrics.inc_reannounce();
        metrics.inc_convergence("converged");
        metrics.inc_cycle_error("observation_failed");
        metrics.cycle_started();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.admitted_total, 2);
        assert_eq!(snapshot.deferred_total, 1);
        assert_eq!(snapshot.reannounce_requests_total, 2);
        assert_eq!(snapshot.converged_total, 1);
        assert_eq!(snapshot.abandoned_total, 0);
        assert_eq!(snapshot.cycles_in_flight, 1);

        metrics.cycle_finished();
        assert_eq!(metrics.snapshot().cycles_in_flight, 0);

        let rendered = metrics.render()?;
        assert!(rendered.contains("handoff_admission_decisions_total"));
        assert!(rendered.contains("handoff_cycle_errors_total"));
        Ok(())
    }

    #[test]
    fn clones_share_the_registry() -> Result<()> {
        let metrics = Metrics::new()?;
        let clone = metrics.clone();
        clone.inc_reannounce();
        assert_eq!(metrics.snapshot().reannounce_requests_total, 1);
        Ok(())
    }
}
