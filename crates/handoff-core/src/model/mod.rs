//! Core handoff domain types and DTOs shared across the workspace.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const V1_HASH_LEN: usize = 40;

/// Stable identifier of a job on the download client (a v1 or v2 info-hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

/// Raised when a content hash is not 40 or 64 hexadecimal characters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid content hash")]
pub struct InvalidContentHash {
    /// Offending input.
    pub value: String,
}

impl ContentHash {
    /// Parse and normalise (lowercase) a hex info-hash.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidContentHash`] when the value is not a 40 (SHA-1) or
    /// 64 (SHA-256) character hexadecimal string.
    pub fn parse(value: &str) -> Result<Self, InvalidContentHash> {
        let trimmed = value.trim();
        let valid_len = matches!(trimmed.len(), 40 | 64);
        if !valid_len || !trimmed.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(InvalidContentHash {
                value: value.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Borrow the normalised hash string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 40-character torrent id the client addresses the job by.
    ///
    /// A v1 hash is returned unchanged; a v2 SHA-256 hash is truncated to its
    /// first 40 characters.
    #[must_use]
    pub fn torrent_id(&self) -> &str {
        self.0.get(..V1_HASH_LEN).unwrap_or(&self.0)
    }
}

impl Display for ContentHash {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl FromStr for ContentHash {
    type Err = InvalidContentHash;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = InvalidContentHash;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

/// Source describing how a job should be handed to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobSource {
    /// Magnet URI or remote `.torrent` URL the client fetches itself.
    Url {
        /// URI forwarded to the client.
        uri: String,
    },
    /// Raw `.torrent` metainfo bytes uploaded with the request.
    Metainfo {
        /// Bencoded metainfo payload.
        bytes: Vec<u8>,
    },
}

impl JobSource {
    #[must_use]
    /// Convenience constructor for magnet or URL sources.
    pub fn url(uri: impl Into<String>) -> Self {
        Self::Url { uri: uri.into() }
    }

    #[must_use]
    /// Convenience constructor for metainfo-based sources.
    pub fn metainfo(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Metainfo {
            bytes: bytes.into(),
        }
    }
}

/// Sparse submission options declared for a job.
///
/// Unset values defer to the client's defaults; nothing here is ever sent as zero.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct JobOptions {
    /// Target save path; setting it also disables automatic torrent management.
    pub save_path: Option<String>,
    /// Category label.
    pub category: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Whether the job is created paused (convergence is skipped when set).
    pub start_paused: bool,
    /// Upload cap in bytes per second.
    pub upload_limit: Option<u64>,
    /// Download cap in bytes per second.
    pub download_limit: Option<u64>,
}

/// Candidate unit of work supplied by the caller for one handoff cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    /// Content handle when already known (required for convergence).
    pub hash: Option<ContentHash>,
    /// Payload handed to the client.
    pub source: JobSource,
    /// File name used for metainfo uploads.
    pub name_hint: Option<String>,
    #[serde(default)]
    /// Declared submission options.
    pub options: JobOptions,
    #[serde(default)]
    /// Skip client admission rules for this job.
    pub ignore_rules: bool,
}

impl Job {
    /// Build a job with default options and no content handle.
    #[must_use]
    pub fn new(source: JobSource) -> Self {
        Self {
            hash: None,
            source,
            name_hint: None,
            options: JobOptions::default(),
            ignore_rules: false,
        }
    }

    /// Attach the content handle used for convergence.
    #[must_use]
    pub fn with_hash(mut self, hash: ContentHash) -> Self {
        self.hash = Some(hash);
        self
    }

    /// Replace the declared options.
    #[must_use]
    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }

    /// Attach a display/file name hint.
    #[must_use]
    pub fn with_name_hint(mut self, name: impl Into<String>) -> Self {
        self.name_hint = Some(name.into());
        self
    }

    /// Mark the job as exempt from admission rules.
    #[must_use]
    pub fn exempt_from_rules(mut self) -> Self {
        self.ignore_rules = true;
        self
    }
}

/// Form fields accepted by the client's add endpoint, stringified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AddOptions(BTreeMap<String, String>);

impl AddOptions {
    /// Create the job in a paused state.
    pub const PAUSED: &'static str = "paused";
    /// Explicit save path.
    pub const SAVE_PATH: &'static str = "savepath";
    /// Automatic torrent management toggle.
    pub const AUTO_TMM: &'static str = "autoTMM";
    /// Category label.
    pub const CATEGORY: &'static str = "category";
    /// Comma-separated tag list.
    pub const TAGS: &'static str = "tags";
    /// Upload cap in bytes per second.
    pub const UPLOAD_LIMIT: &'static str = "upLimit";
    /// Download cap in bytes per second.
    pub const DOWNLOAD_LIMIT: &'static str = "dlLimit";

    /// Empty option map.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Set a field, replacing any previous value.
    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Look up a field value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Whether a field is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// Admission rules attached to one download client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ClientRuleSet {
    /// Whether the rules are evaluated at all.
    pub enabled: bool,
    /// Maximum concurrently downloading jobs; zero or negative means unlimited.
    pub max_active_downloads: i64,
    /// Admit past the limit when aggregate download speed is below the threshold.
    pub ignore_slow_torrents: bool,
    /// Download speed threshold in KiB/s used by `ignore_slow_torrents`.
    pub download_speed_threshold_kib: u64,
}

impl ClientRuleSet {
    /// Effective active-download ceiling, `None` when unlimited.
    #[must_use]
    pub fn active_limit(&self) -> Option<usize> {
        if self.max_active_downloads <= 0 {
            return None;
        }
        usize::try_from(self.max_active_downloads).ok()
    }
}

/// Job currently downloading on the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobSummary {
    /// Content handle as reported by the client.
    pub hash: String,
    /// Display name.
    pub name: String,
    /// Client-native state label.
    pub state: String,
}

/// Aggregate transfer statistics for the whole client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TransferInfo {
    /// Current download rate in bytes per second.
    pub download_bps: u64,
    /// Current upload rate in bytes per second.
    pub upload_bps: u64,
}

impl TransferInfo {
    /// Download rate truncated to KiB/s.
    #[must_use]
    pub const fn download_kib(&self) -> u64 {
        self.download_bps / 1024
    }
}

/// Announce state of one tracker endpoint for a job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u8", into = "u8")]
pub enum TrackerStatus {
    /// Pseudo-tracker (DHT, PeX, LSD); never blocks or satisfies convergence.
    Disabled,
    /// Not contacted yet.
    NotContacted,
    /// Contacted and working.
    Working,
    /// Announce in flight.
    Updating,
    /// Contacted but failing.
    NotWorking,
}

/// Raised when a client reports a tracker status code outside `0..=4`.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("unknown tracker status code")]
pub struct UnknownTrackerStatus {
    /// Offending status code.
    pub code: u8,
}

impl TrackerStatus {
    /// Lowercase label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::NotContacted => "not_contacted",
            Self::Working => "working",
            Self::Updating => "updating",
            Self::NotWorking => "not_working",
        }
    }
}

impl TryFrom<u8> for TrackerStatus {
    type Error = UnknownTrackerStatus;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::NotContacted),
            2 => Ok(Self::Working),
            3 => Ok(Self::Updating),
            4 => Ok(Self::NotWorking),
            other => Err(UnknownTrackerStatus { code: other }),
        }
    }
}

impl From<TrackerStatus> for u8 {
    fn from(status: TrackerStatus) -> Self {
        match status {
            TrackerStatus::Disabled => 0,
            TrackerStatus::NotContacted => 1,
            TrackerStatus::Working => 2,
            TrackerStatus::Updating => 3,
            TrackerStatus::NotWorking => 4,
        }
    }
}

/// Tracker endpoint and its latest observed status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerEntry {
    /// Announce URL (or pseudo-tracker label such as `** [DHT] **`).
    pub url: String,
    /// Latest status.
    pub status: TrackerStatus,
    #[serde(default)]
    /// Last message returned by the tracker, if any.
    pub message: Option<String>,
}

impl TrackerEntry {
    /// Entry without a tracker message.
    #[must_use]
    pub fn new(url: impl Into<String>, status: TrackerStatus) -> Self {
        Self {
            url: url.into(),
            status,
            message: None,
        }
    }
}

/// Default quiescence delay before the first tracker check.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(6);
/// Default pause between re-announce attempts.
pub const DEFAULT_REANNOUNCE_INTERVAL: Duration = Duration::from_millis(7_000);
/// Default number of tracker polls before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;
/// Default buffer between the last poll and the compensating delete.
pub const DEFAULT_GRACE_DELAY: Duration = Duration::from_secs(30);

/// Timing and budget knobs for the announce convergence loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceSettings {
    /// Wait before the first tracker check.
    pub initial_delay: Duration,
    /// Wait after each re-announce.
    pub interval: Duration,
    /// Tracker polls before the job is abandoned.
    pub max_attempts: u32,
    /// Wait between exhausting the budget and deleting the job.
    pub grace_delay: Duration,
    /// Whether an abandoned job is deleted from the client.
    pub delete_on_failure: bool,
}

impl Default for ConvergenceSettings {
    fn default() -> Self {
        Self {
            initial_delay: DEFAULT_INITIAL_DELAY,
            interval: DEFAULT_REANNOUNCE_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            grace_delay: DEFAULT_GRACE_DELAY,
            delete_on_failure: true,
        }
    }
}

impl ConvergenceSettings {
    /// Longest time a loop can block when every attempt fails.
    #[must_use]
    pub const fn worst_case(&self) -> Duration {
        self.initial_delay
            .saturating_add(self.interval.saturating_mul(self.max_attempts))
            .saturating_add(self.grace_delay)
    }
}
