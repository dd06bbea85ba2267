//! Client trait implemented by download client adapters.

use async_trait::async_trait;

use crate::error::ClientResult;
use crate::model::{AddOptions, ContentHash, JobSource, JobSummary, TrackerEntry, TransferInfo};

/// Authenticated handle to one remote download client.
///
/// Every call is a self-contained request/response, so one handle may be
/// shared by concurrent handoff cycles.
#[async_trait]
pub trait DownloadClient: Send + Sync {
    /// Name of the client instance, used in logs and errors.
    fn name(&self) -> &str;

    /// Jobs currently downloading.
    async fn active_downloads(&self) -> ClientResult<Vec<JobSummary>>;

    /// Aggregate transfer rates.
    async fn transfer_info(&self) -> ClientResult<TransferInfo>;

    /// Add a job with the given sparse option map.
    async fn submit(
        &self,
        source: &JobSource,
        name_hint: Option<&str>,
        options: &AddOptions,
    ) -> ClientResult<()>;

    /// Force the job to contact its trackers now.
    async fn reannounce(&self, hash: &ContentHash) -> ClientResult<()>;

    /// Per-tracker status for the job.
    async fn trackers(&self, hash: &ContentHash) -> ClientResult<Vec<TrackerEntry>>;

    /// Remove the job, optionally deleting downloaded data.
    async fn delete(&self, hash: &ContentHash, delete_payload: bool) -> ClientResult<()>;
}
