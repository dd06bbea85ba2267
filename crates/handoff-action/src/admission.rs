//! Admission gate evaluated before a job is handed to a client.
//!
//! # Design
//! - Stateless: every decision is taken against the client's current state.
//! - Remote reads happen only when the rules are enabled for the job.
//! - Transfer info is fetched only when the active limit is reached and the
//!   slow-client override is on.

use std::fmt::{self, Display, Formatter};

use handoff_core::{ClientRuleSet, DownloadClient};
use tracing::debug;

use crate::error::{HandoffError, HandoffResult, Stage};

/// Why a job was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitReason {
    /// The client has no rules enabled.
    RulesDisabled,
    /// The job bypasses the rules.
    RuleExempt,
    /// The active-download limit is unlimited.
    Unlimited,
    /// Fewer jobs are active than the limit allows.
    BelowLimit {
        /// Jobs currently downloading.
        active: usize,
        /// Configured ceiling.
        max: usize,
    },
    /// The limit is reached but the client is downloading slowly.
    SlowClient {
        /// Aggregate download rate in KiB/s.
        rate_kib: u64,
        /// Configured threshold in KiB/s.
        threshold_kib: u64,
    },
}

/// Why a job was deferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// The active-download limit is reached.
    ActiveLimitReached {
        /// Jobs currently downloading.
        active: usize,
        /// Configured ceiling.
        max: usize,
    },
    /// The limit is reached and the client is busy downloading.
    ClientBusy {
        /// Jobs currently downloading.
        active: usize,
        /// Configured ceiling.
        max: usize,
        /// Aggregate download rate in KiB/s.
        rate_kib: u64,
        /// Configured threshold in KiB/s.
        threshold_kib: u64,
    },
}

impl Display for DeferReason {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActiveLimitReached { active, max } => {
                write!(formatter, "active download limit reached ({active}/{max})")
            }
            Self::ClientBusy {
                active,
                max,
                rate_kib,
                threshold_kib,
            } => write!(
                formatter,
                "active download limit reached ({active}/{max}) and client is downloading at {rate_kib} KiB/s (threshold {threshold_kib} KiB/s)"
            ),
        }
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Submit the job.
    Admit(AdmitReason),
    /// Do not submit the job now.
    Defer(DeferReason),
}

impl AdmissionDecision {
    /// Whether the job may be submitted.
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admit(_))
    }

    /// Metric label for the decision.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admit(_) => "admit",
            Self::Defer(_) => "defer",
        }
    }
}

/// Evaluates one client's admission rules.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionGate {
    rules: ClientRuleSet,
}

impl AdmissionGate {
    /// Gate for the given rule set.
    #[must_use]
    pub const fn new(rules: ClientRuleSet) -> Self {
        Self { rules }
    }

    /// Rules this gate applies.
    #[must_use]
    pub const fn rules(&self) -> &ClientRuleSet {
        &self.rules
    }

    /// Decide whether a job may be submitted to `client` right now.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::ObservationFailed`] or
    /// [`HandoffError::ClientUnreachable`] when the active-download list or
    /// transfer info cannot be read.
    pub async fn evaluate(
        &self,
        client: &dyn DownloadClient,
        rule_exempt: bool,
    ) -> HandoffResult<AdmissionDecision> {
        if !self.rules.enabled {
            return Ok(AdmissionDecision::Admit(AdmitReason::RulesDisabled));
        }
        if rule_exempt {
            return Ok(AdmissionDecision::Admit(AdmitReason::RuleExempt));
        }

        let active = client
            .active_downloads()
            .await
            .map_err(|err| HandoffError::observation(Stage::Admission, err))?
            .len();

        let Some(max) = self.rules.active_limit() else {
            return Ok(AdmissionDecision::Admit(AdmitReason::Unlimited));
        };
        if active < max {
            debug!(client = client.name(), active, max, "below active download limit");
            return Ok(AdmissionDecision::Admit(AdmitReason::BelowLimit { active, max }));
        }
        if !self.rules.ignore_slow_torrents {
            debug!(client = client.name(), active, max, "active download limit reached");
            return Ok(AdmissionDecision::Defer(DeferReason::ActiveLimitReached {
                active,
                max,
            }));
        }

        let rate_kib = client
            .transfer_info()
            .await
            .map_err(|err| HandoffError::observation(Stage::Admission, err))?
            .download_kib();
        let threshold_kib = self.rules.download_speed_threshold_kib;
        debug!(
            client = client.name(),
            active,
            max,
            rate_kib,
            threshold_kib,
            "limit reached, checking download rate"
        );
        if rate_kib >= threshold_kib {
            return Ok(AdmissionDecision::Defer(DeferReason::ClientBusy {
                active,
                max,
                rate_kib,
                threshold_kib,
            }));
        }
        Ok(AdmissionDecision::Admit(AdmitReason::SlowClient {
            rate_kib,
            threshold_kib,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handoff_test_support::mocks::{Failure, Operation, ScriptedClient};

    const fn rules(max: i64, ignore_slow: bool, threshold_kib: u64) -> ClientRuleSet {
        ClientRuleSet {
            enabled: true,
            max_active_downloads: max,
            ignore_slow_torrents: ignore_slow,
            download_speed_threshold_kib: threshold_kib,
        }
    }

    #[tokio::test]
    async fn disabled_rules_admit_without_remote_calls() {
        let client = ScriptedClient::new("main").with_active_downloads(100);
        let gate = AdmissionGate::new(ClientRuleSet::default());
        let decision = gate.evaluate(&client, false).await.unwrap();
        assert_eq!(decision, AdmissionDecision::Admit(AdmitReason::RulesDisabled));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn rule_exempt_jobs_skip_remote_calls() {
        let client = ScriptedClient::new("main").with_active_downloads(100);
        let gate = AdmissionGate::new(rules(1, false, 0));
        let decision = gate.evaluate(&client, true).await.unwrap();
        assert_eq!(decision, AdmissionDecision::Admit(AdmitReason::RuleExempt));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn non_positive_limit_is_unlimited() {
        for max in [0, -3] {
            let client = ScriptedClient::new("main").with_active_downloads(40);
            let decision = AdmissionGate::new(rules(max, false, 0))
                .evaluate(&client, false)
                .await
                .unwrap();
            assert_eq!(decision, AdmissionDecision::Admit(AdmitReason::Unlimited));
        }
    }

    #[tokio::test]
    async fn below_limit_admits_and_at_limit_defers() {
        let client = ScriptedClient::new("main").with_active_downloads(4);
        let decision = AdmissionGate::new(rules(5, false, 0))
            .evaluate(&client, false)
            .await
            .unwrap();
        assert_eq!(
            decision,
            AdmissionDecision::Admit(AdmitReason::BelowLimit { active: 4, max: 5 })
        );

        let client = ScriptedClient::new("main").with_active_downloads(5);
        let decision = AdmissionGate::new(rules(5, false, 0))
            .evaluate(&client, false)
            .await
            .unwrap();
        assert_eq!(
            decision,
            AdmissionDecision::Defer(DeferReason::ActiveLimitReached { active: 5, max: 5 })
        );
        assert_eq!(client.count(Operation::TransferInfo), 0);
    }

    #[tokio::test]
    async fn slow_client_override_compares_whole_kib() {
        let gate = AdmissionGate::new(rules(2, true, 1));
        let slow = ScriptedClient::new("main")
            .with_active_downloads(2)
            .with_download_bps(1_023);
        assert!(gate.evaluate(&slow, false).await.unwrap().is_admitted());
        let at_threshold = ScriptedClient::new("main")
            .with_active_downloads(2)
            .with_download_bps(2_047);
        assert!(!gate.evaluate(&at_threshold, false).await.unwrap().is_admitted());

        let busy = ScriptedClient::new("main")
            .with_active_downloads(2)
            .with_download_kib(100);
        let decision = AdmissionGate::new(rules(2, true, 100))
            .evaluate(&busy, false)
            .await
            .unwrap();
        assert!(matches!(
            decision,
            AdmissionDecision::Defer(DeferReason::ClientBusy { rate_kib: 100, .. })
        ));

        let below = ScriptedClient::new("main")
            .with_active_downloads(3)
            .with_download_kib(99);
        let decision = AdmissionGate::new(rules(2, true, 100))
            .evaluate(&below, false)
            .await
            .unwrap();
        assert_eq!(
            decision,
            AdmissionDecision::Admit(AdmitReason::SlowClient {
                rate_kib: 99,
                threshold_kib: 100
            })
        );
    }

    #[tokio::test]
    async fn observation_failures_are_reported() {
        let client = ScriptedClient::new("main")
            .failing(Operation::ActiveDownloads, Failure::Rejected(500));
        let err = AdmissionGate::new(rules(5, false, 0))
            .evaluate(&client, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "observation_failed");
        assert_eq!(err.stage(), Stage::Admission);

        let client = ScriptedClient::new("main")
            .with_active_downloads(5)
            .failing(Operation::TransferInfo, Failure::Unreachable);
        let err = AdmissionGate::new(rules(5, true, 10))
            .evaluate(&client, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "client_unreachable");
    }

    #[test]
    fn defer_reasons_render_for_logs() {
        let reason = DeferReason::ActiveLimitReached { active: 5, max: 5 };
        assert_eq!(reason.to_string(), "active download limit reached (5/5)");
    }
}
