//! Output renderers and formatting helpers for CLI commands.

use anyhow::anyhow;
use clap::ValueEnum;
use handoff_action::{AdmissionDecision, AdmitReason, ConvergenceOutcome, CycleOutcome};
use serde::Serialize;

use crate::client::{CliError, CliResult};

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
pub(crate) struct DecisionView<'a> {
    client: &'a str,
    decision: &'static str,
    detail: String,
}

impl<'a> DecisionView<'a> {
    pub(crate) fn new(client: &'a str, decision: &AdmissionDecision) -> Self {
        let detail = match decision {
            AdmissionDecision::Admit(reason) => describe_admit(reason),
            AdmissionDecision::Defer(reason) => reason.to_string(),
        };
        Self {
            client,
            decision: decision.as_str(),
            detail,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OutcomeView<'a> {
    client: &'a str,
    action: &'a str,
    result: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    deleted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl<'a> OutcomeView<'a> {
    pub(crate) fn new(client: &'a str, action: &'a str, outcome: &CycleOutcome) -> Self {
        let mut view = Self {
            client,
            action,
            result: "submitted",
            hash: None,
            attempts: None,
            deleted: None,
            reason: None,
        };
        match outcome {
            CycleOutcome::Deferred(reason) => {
                view.result = "deferred";
                view.reason = Some(reason.to_string());
            }
            CycleOutcome::Submitted { hash, convergence } => {
                view.hash = hash.as_ref().map(ToString::to_string);
                match convergence {
                    Some(ConvergenceOutcome::Converged { attempts }) => {
                        view.result = "converged";
                        view.attempts = Some(*attempts);
                    }
                    Some(ConvergenceOutcome::Abandoned { attempts, deleted }) => {
                        view.result = "abandoned";
                        view.attempts = Some(*attempts);
                        view.deleted = Some(*deleted);
                    }
                    None => {}
                }
            }
        }
        view
    }
}

fn describe_admit(reason: &AdmitReason) -> String {
    match reason {
        AdmitReason::RulesDisabled => "admission rules disabled".to_string(),
        AdmitReason::RuleExempt => "job is exempt from admission rules".to_string(),
        AdmitReason::Unlimited => "no active download limit".to_string(),
        AdmitReason::BelowLimit { active, max } => {
            format!("{active} of {max} active download slots in use")
        }
        AdmitReason::SlowClient {
            rate_kib,
            threshold_kib,
        } => format!(
            "limit reached but client is downloading at {rate_kib} KiB/s (threshold {threshold_kib} KiB/s)"
        ),
    }
}

pub(crate) fn render_decision(view: &DecisionView<'_>, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(view),
        OutputFormat::Text => Ok(format!(
            "{}: {} ({})",
            view.client, view.decision, view.detail
        )),
    }
}

pub(crate) fn render_outcome(view: &OutcomeView<'_>, format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Json => to_json(view),
        OutputFormat::Text => {
            let mut line = format!("{} via {}: {}", view.action, view.client, view.result);
            if let Some(hash) = &view.hash {
                line.push_str(&format!(" hash={hash}"));
            }
            if let Some(attempts) = view.attempts {
                line.push_str(&format!(" attempts={attempts}"));
            }
            if let Some(deleted) = view.deleted {
                line.push_str(&format!(" deleted={deleted}"));
            }
            if let Some(reason) = &view.reason {
                line.push_str(&format!(" ({reason})"));
            }
            Ok(line)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))
}
