//! Submission of an admitted job to the client.

use handoff_core::{AddOptions, ContentHash, DownloadClient, Job, JobOptions};
use handoff_telemetry::Metrics;
use tracing::{debug, info};

use crate::error::{HandoffError, HandoffResult};

/// Translate declared job options into the client's sparse add parameters.
///
/// Only set values are emitted. Rate caps are sent only when strictly
/// positive, and an explicit save path turns automatic management off.
#[must_use]
pub fn build_options(options: &JobOptions) -> AddOptions {
    let mut add = AddOptions::new();
    if options.start_paused {
        add.insert(AddOptions::PAUSED, "true");
    }
    if let Some(path) = non_empty(options.save_path.as_deref()) {
        add.insert(AddOptions::SAVE_PATH, path);
        add.insert(AddOptions::AUTO_TMM, "false");
    }
    if let Some(category) = non_empty(options.category.as_deref()) {
        add.insert(AddOptions::CATEGORY, category);
    }
    let tags: Vec<&str> = options
        .tags
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .collect();
    if !tags.is_empty() {
        add.insert(AddOptions::TAGS, tags.join(","));
    }
    if let Some(limit) = options.upload_limit.filter(|limit| *limit > 0) {
        add.insert(AddOptions::UPLOAD_LIMIT, limit.to_string());
    }
    if let Some(limit) = options.download_limit.filter(|limit| *limit > 0) {
        add.insert(AddOptions::DOWNLOAD_LIMIT, limit.to_string());
    }
    add
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}

/// Hands admitted jobs to a client.
#[derive(Clone, Default)]
pub struct SubmissionDispatcher {
    metrics: Option<Metrics>,
}

impl SubmissionDispatcher {
    /// Dispatcher without metrics.
    #[must_use]
    pub const fn new() -> Self {
        Self { metrics: None }
    }

    /// Count submissions in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Submit `job` with one remote call and return its content handle.
    ///
    /// # Errors
    ///
    /// Returns [`HandoffError::SubmissionFailed`] when the client refuses the
    /// job and [`HandoffError::ClientUnreachable`] on transport or session
    /// failures.
    pub async fn submit(
        &self,
        job: &Job,
        client: &dyn DownloadClient,
    ) -> HandoffResult<Option<ContentHash>> {
        let options = build_options(&job.options);
        debug!(
            client = client.name(),
            options = options.len(),
            paused = job.options.start_paused,
            "submitting job"
        );
        let submitted = client
            .submit(&job.source, job.name_hint.as_deref(), &options)
            .await;
        if let Some(metrics) = &self.metrics {
            metrics.inc_submission(if submitted.is_ok() { "ok" } else { "failed" });
        }
        submitted.map_err(HandoffError::submission)?;
        info!(
            client = client.name(),
            hash = job.hash.as_ref().map(ContentHash::as_str),
            "job handed to client"
        );
        Ok(job.hash.clone())
    }
}
