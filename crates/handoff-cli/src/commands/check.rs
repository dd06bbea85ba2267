//! `handoff check`: report the admission decision for a client.

use handoff_config::HandoffConfig;

use crate::cli::CheckArgs;
use crate::client::{CliError, CliResult, cycle_for, metrics};
use crate::output::{DecisionView, OutputFormat, render_decision};

pub(crate) async fn handle_check(
    config: &HandoffConfig,
    args: &CheckArgs,
    format: OutputFormat,
) -> CliResult<String> {
    let profile = config.client(&args.client)?;
    let metrics = metrics()?;
    let cycle = cycle_for(config, profile, &metrics).await?;
    let decision = cycle.admit(false).await.map_err(|err| {
        CliError::failure(anyhow::Error::new(err).context("admission check failed"))
    })?;
    render_decision(&DecisionView::new(&profile.name, &decision), format)
}
