//! JSON payloads returned by the qBittorrent WebAPI.

use serde::Deserialize;

/// Entry of `torrents/info`.
#[derive(Debug, Deserialize)]
pub(crate) struct TorrentInfo {
    pub(crate) hash: String,
    #[serde(default)]
    pub(crate) name: String,
    pub(crate) state: String,
}

impl TorrentInfo {
    /// States in which a job is actually pulling data.
    const TRANSFERRING: [&'static str; 4] = ["downloading", "stalledDL", "forcedDL", "metaDL"];

    pub(crate) fn is_transferring(&self) -> bool {
        Self::TRANSFERRING.contains(&self.state.as_str())
    }
}

/// Body of `transfer/info`.
#[derive(Debug, Deserialize)]
pub(crate) struct TransferStats {
    pub(crate) dl_info_speed: u64,
    pub(crate) up_info_speed: u64,
}

/// Entry of `torrents/trackers`.
#[derive(Debug, Deserialize)]
pub(crate) struct TrackerRow {
    pub(crate) url: String,
    pub(crate) status: u8,
    #[serde(default)]
    pub(crate) msg: String,
}
