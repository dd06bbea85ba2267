//! Scripted download client used by handoff cycle tests.
//!
//! # Design
//! - Every call is recorded so tests can assert on ordering and payloads.
//! - Tracker polls replay a script, then repeat a fallback list forever.
//! - Failures are injected per operation, either once or persistently.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use handoff_core::{
    AddOptions, ClientError, ClientResult, ContentHash, DownloadClient, JobSource, JobSummary,
    TrackerEntry, TransferInfo,
};

/// Remote operations exposed by [`DownloadClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `active_downloads`.
    ActiveDownloads,
    /// `transfer_info`.
    TransferInfo,
    /// `submit`.
    Submit,
    /// `reannounce`.
    Reannounce,
    /// `trackers`.
    Trackers,
    /// `delete`.
    Delete,
}

impl Operation {
    /// Identifier reported in [`ClientError`] context.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ActiveDownloads => "active_downloads",
            Self::TransferInfo => "transfer_info",
            Self::Submit => "submit",
            Self::Reannounce => "reannounce",
            Self::Trackers => "trackers",
            Self::Delete => "delete",
        }
    }
}

/// Kind of failure to inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Transport failure.
    Unreachable,
    /// Session refused.
    Unauthorized,
    /// Non-success HTTP status.
    Rejected(u16),
    /// Undecodable response body.
    Decode,
}

/// Call observed by the [`ScriptedClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCall {
    /// Active download listing.
    ActiveDownloads,
    /// Transfer statistics.
    TransferInfo,
    /// Job submission.
    Submit {
        /// Submitted payload.
        source: JobSource,
        /// File name hint.
        name_hint: Option<String>,
        /// Option map sent with the job.
        options: AddOptions,
    },
    /// Re-announce request.
    Reannounce(ContentHash),
    /// Tracker listing.
    Trackers(ContentHash),
    /// Removal request.
    Delete {
        /// Removed job.
        hash: ContentHash,
        /// Whether payload data was deleted too.
        delete_payload: bool,
    },
}

impl ClientCall {
    /// Operation this call exercised.
    #[must_use]
    pub const fn operation(&self) -> Operation {
        match self {
            Self::ActiveDownloads => Operation::ActiveDownloads,
            Self::TransferInfo => Operation::TransferInfo,
            Self::Submit { .. } => Operation::Submit,
            Self::Reannounce(_) => Operation::Reannounce,
            Self::Trackers(_) => Operation::Trackers,
            Self::Delete { .. } => Operation::Delete,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Injected {
    failure: Failure,
    persistent: bool,
}

#[derive(Debug, Default)]
struct ScriptState {
    active: Vec<JobSummary>,
    transfer: TransferInfo,
    tracker_script: VecDeque<Vec<TrackerEntry>>,
    tracker_fallback: Vec<TrackerEntry>,
    failures: HashMap<Operation, Injected>,
    calls: Vec<ClientCall>,
}

/// In-memory [`DownloadClient`] that replays scripted responses.
#[derive(Debug)]
pub struct ScriptedClient {
    name: String,
    state: Mutex<ScriptState>,
}

impl ScriptedClient {
    /// Client with no active downloads, idle transfer and empty tracker lists.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(ScriptState::default()),
        }
    }

    /// Report `count` jobs as currently downloading.
    #[must_use]
    pub fn with_active_downloads(self, count: usize) -> Self {
        self.lock().active = (0..count)
            .map(|index| JobSummary {
                hash: format!("{index:040x}"),
                name: format!("active-{index}"),
                state: "downloading".to_string(),
            })
            .collect();
        self
    }

    /// Report the given aggregate download rate, in KiB/s.
    #[must_use]
    pub fn with_download_kib(self, kib: u64) -> Self {
        self.lock().transfer.download_bps = kib.saturating_mul(1024);
        self
    }

    /// Report the given aggregate download rate, in bytes per second.
    #[must_use]
    pub fn with_download_bps(self, bps: u64) -> Self {
        self.lock().transfer.download_bps = bps;
        self
    }

    /// Tracker lists returned by successive polls, in order.
    #[must_use]
    pub fn with_tracker_script<I>(self, script: I) -> Self
    where
        I: IntoIterator<Item = Vec<TrackerEntry>>,
    {
        self.lock().tracker_script = script.into_iter().collect();
        self
    }

    /// Tracker list returned once the script is exhausted.
    #[must_use]
    pub fn with_tracker_fallback(self, trackers: Vec<TrackerEntry>) -> Self {
        self.lock().tracker_fallback = trackers;
        self
    }

    /// Fail every call to `operation`.
    #[must_use]
    pub fn failing(self, operation: Operation, failure: Failure) -> Self {
        self.inject(operation, failure, true);
        self
    }

    /// Fail the next call to `operation` only.
    #[must_use]
    pub fn failing_once(self, operation: Operation, failure: Failure) -> Self {
        self.inject(operation, failure, false);
        self
    }

    /// Snapshot of every recorded call.
    #[must_use]
    pub fn calls(&self) -> Vec<ClientCall> {
        self.lock().calls.clone()
    }

    /// Recorded operations in call order.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().calls.iter().map(ClientCall::operation).collect()
    }

    /// Number of recorded calls to `operation`.
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.operation() == operation)
            .count()
    }

    /// Option maps sent with each submission.
    #[must_use]
    pub fn submitted_options(&self) -> Vec<AddOptions> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                ClientCall::Submit { options, .. } => Some(options.clone()),
                _ => None,
            })
            .collect()
    }

    fn inject(&self, operation: Operation, failure: Failure, persistent: bool) {
        self.lock()
            .failures
            .insert(operation, Injected { failure, persistent });
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: ClientCall) -> ClientResult<()> {
        let operation = call.operation();
        let mut state = self.lock();
        state.calls.push(call);
        let Some(injected) = state.failures.get(&operation).copied() else {
            return Ok(());
        };
        if !injected.persistent {
            state.failures.remove(&operation);
        }
        drop(state);
        Err(self.error_for(operation, injected.failure))
    }

    fn error_for(&self, operation: Operation, failure: Failure) -> ClientError {
        let client = self.name.clone();
        let operation = operation.as_str();
        match failure {
            Failure::Unreachable => ClientError::Unreachable {
                client,
                operation,
                source: "connection refused".into(),
            },
            Failure::Unauthorized => ClientError::Unauthorized { client, operation },
            Failure::Rejected(status) => ClientError::Rejected {
                client,
                operation,
                status,
                message: Some("scripted rejection".to_string()),
            },
            Failure::Decode => ClientError::Decode {
                client,
                operation,
                source: "unexpected payload".into(),
            },
        }
    }
}

#[async_trait]
impl DownloadClient for ScriptedClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn active_downloads(&self) -> ClientResult<Vec<JobSummary>> {
        self.record(ClientCall::ActiveDownloads)?;
        Ok(self.lock().active.clone())
    }

    async fn transfer_info(&self) -> ClientResult<TransferInfo> {
        self.record(ClientCall::TransferInfo)?;
        Ok(self.lock().transfer)
    }

    async fn submit(
        &self,
        source: &JobSource,
        name_hint: Option<&str>,
        options: &AddOptions,
    ) -> ClientResult<()> {
        self.record(ClientCall::Submit {
            source: source.clone(),
            name_hint: name_hint.map(str::to_string),
            options: options.clone(),
        })
    }

    async fn reannounce(&self, hash: &ContentHash) -> ClientResult<()> {
        self.record(ClientCall::Reannounce(hash.clone()))
    }

    async fn trackers(&self, hash: &ContentHash) -> ClientResult<Vec<TrackerEntry>> {
        self.record(ClientCall::Trackers(hash.clone()))?;
        let mut state = self.lock();
        let trackers = match state.tracker_script.pop_front() {
            Some(next) => next,
            None => state.tracker_fallback.clone(),
        };
        drop(state);
        Ok(trackers)
    }

    async fn delete(&self, hash: &ContentHash, delete_payload: bool) -> ClientResult<()> {
        self.record(ClientCall::Delete {
            hash: hash.clone(),
            delete_payload,
        })
    }
}
