//! Test fixtures for handoff scenarios.

use std::time::Duration;

use handoff_core::{ContentHash, ConvergenceSettings, Job, JobSource, TrackerEntry, TrackerStatus};

/// Hash used by fixtures that need a single job.
pub const SAMPLE_HASH: &str = "0123456789abcdef0123456789abcdef01234567";

/// Parsed form of [`SAMPLE_HASH`].
///
/// # Panics
///
/// Panics if [`SAMPLE_HASH`] stops being a valid hash.
#[must_use]
pub fn sample_hash() -> ContentHash {
    ContentHash::parse(SAMPLE_HASH).unwrap_or_else(|err| panic!("fixture hash invalid: {err}"))
}

/// Magnet job carrying [`sample_hash`].
#[must_use]
pub fn magnet_job() -> Job {
    Job::new(JobSource::url(format!(
        "magnet:?xt=urn:btih:{SAMPLE_HASH}&dn=fixture"
    )))
    .with_hash(sample_hash())
    .with_name_hint("fixture")
}

/// Tracker list where one tracker reports `Working`.
#[must_use]
pub fn working_trackers() -> Vec<TrackerEntry> {
    vec![
        TrackerEntry::new("** [DHT] **", TrackerStatus::Disabled),
        TrackerEntry::new("udp://tracker.example:1337/announce", TrackerStatus::Working),
    ]
}

/// Tracker list where no enabled tracker is working yet.
#[must_use]
pub fn stalled_trackers() -> Vec<TrackerEntry> {
    vec![
        TrackerEntry::new("** [DHT] **", TrackerStatus::Disabled),
        TrackerEntry::new("udp://tracker.example:1337/announce", TrackerStatus::NotWorking),
        TrackerEntry::new("https://backup.example/announce", TrackerStatus::Updating),
    ]
}

/// Convergence timings shrunk to milliseconds so loops finish quickly.
#[must_use]
pub const fn compressed_settings(max_attempts: u32) -> ConvergenceSettings {
    ConvergenceSettings {
        initial_delay: Duration::from_millis(5),
        interval: Duration::from_millis(2),
        max_attempts,
        grace_delay: Duration::from_millis(5),
        delete_on_failure: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_are_consistent() {
        let job = magnet_job();
        assert_eq!(job.hash, Some(sample_hash()));
        assert!(working_trackers()
            .iter()
            .any(|entry| entry.status == TrackerStatus::Working));
        assert!(stalled_trackers()
            .iter()
            .all(|entry| entry.status != TrackerStatus::Working));
        assert!(compressed_settings(3).worst_case() < Duration::from_secs(1));
    }
}
