//! `handoff push`: run one admission, submission and convergence cycle.

use std::fs;
use std::path::Path;
use std::time::Duration;

use handoff_config::{ActionProfile, HandoffConfig};
use handoff_core::{ContentHash, Job, JobSource};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::cli::PushArgs;
use crate::client::{CliError, CliResult, cycle_for, metrics};
use crate::output::{OutcomeView, OutputFormat, render_outcome};

pub(crate) async fn handle_push(
    config: &HandoffConfig,
    args: &PushArgs,
    format: OutputFormat,
) -> CliResult<String> {
    let action = config.action(&args.action)?;
    let profile = config.client(&action.client)?;
    let job = build_job(args, action)?;
    let metrics = metrics()?;
    let cycle = cycle_for(config, profile, &metrics).await?;

    let cancel = CancellationToken::new();
    let watchers = spawn_watchers(&cancel, args.timeout);
    let outcome = cycle.run(&job, &cancel).await;
    for watcher in watchers {
        watcher.abort();
    }
    debug!(snapshot = ?metrics.snapshot(), "cycle metrics");

    let outcome = outcome.map_err(|err| {
        CliError::failure(anyhow::Error::new(err).context("handoff cycle failed"))
    })?;
    render_outcome(
        &OutcomeView::new(&profile.name, &action.name, &outcome),
        format,
    )
}

/// Assemble the job from the command line and the action profile.
pub(crate) fn build_job(args: &PushArgs, action: &ActionProfile) -> CliResult<Job> {
    let (source, derived_name) = read_source(&args.source)?;
    let mut job = Job::new(source).with_options(action.job_options());
    if let Some(name) = args.name.clone().or(derived_name) {
        job = job.with_name_hint(name);
    }
    let hash = match args.hash.as_deref() {
        Some(value) => Some(ContentHash::parse(value).map_err(|_| {
            CliError::validation(format!(
                "--hash '{value}' is not a 40 or 64 character hex info-hash"
            ))
        })?),
        None => magnet_hash(&args.source),
    };
    if hash.is_none() {
        warn!(
            source = %args.source,
            "no content hash known, announce convergence will be skipped"
        );
    }
    job.hash = hash;
    if args.ignore_rules || action.ignore_rules {
        job = job.exempt_from_rules();
    }
    Ok(job)
}

fn read_source(source: &str) -> CliResult<(JobSource, Option<String>)> {
    let lowered = source.to_ascii_lowercase();
    if ["magnet:", "http://", "https://"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return Ok((JobSource::url(source), None));
    }
    let path = Path::new(source);
    let bytes = fs::read(path).map_err(|err| {
        CliError::failure(
            anyhow::Error::new(err).context(format!("failed to read '{}'", path.display())),
        )
    })?;
    if bytes.is_empty() {
        return Err(CliError::validation(format!(
            "'{}' is empty",
            path.display()
        )));
    }
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string);
    Ok((JobSource::metainfo(bytes), name))
}

/// Torrent id carried by a magnet URI's `xt` parameters, when present.
///
/// A v1 `btih` topic wins over a v2 `btmh` one; a v2-only magnet yields the
/// SHA-256 digest, which the client addresses by its first 40 characters.
pub(crate) fn magnet_hash(source: &str) -> Option<ContentHash> {
    let url = Url::parse(source).ok()?;
    if url.scheme() != "magnet" {
        return None;
    }
    let topics: Vec<String> = url
        .query_pairs()
        .filter(|(key, _)| key == "xt")
        .map(|(_, value)| value.into_owned())
        .collect();
    let from_prefix = |prefix: &str| {
        topics
            .iter()
            .filter_map(|topic| topic.strip_prefix(prefix))
            .find_map(|digest| ContentHash::parse(digest).ok())
    };
    from_prefix("urn:btih:").or_else(|| from_prefix("urn:btmh:1220"))
}

fn spawn_watchers(cancel: &CancellationToken, timeout: Option<u64>) -> Vec<JoinHandle<()>> {
    let mut watchers = Vec::with_capacity(2);
    let token = cancel.clone();
    watchers.push(tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling cycle");
            token.cancel();
        }
    }));
    if let Some(secs) = timeout {
        let token = cancel.clone();
        watchers.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!(timeout_secs = secs, "cycle timed out, cancelling");
            token.cancel();
        }));
    }
    watchers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEX: &str = "0123456789abcdef0123456789abcdef01234567";

    fn action() -> ActionProfile {
        ActionProfile {
            name: "tv".into(),
            client: "seedbox".into(),
            save_path: None,
            category: Some("tv".into()),
            tags: vec!["auto".into()],
            paused: false,
            upload_limit: None,
            download_limit: None,
            ignore_rules: false,
        }
    }

    fn args(source: &str) -> PushArgs {
        PushArgs {
            source: source.to_string(),
            action: "tv".into(),
            hash: None,
            name: None,
            ignore_rules: false,
            timeout: None,
        }
    }

    #[test]
    fn magnet_hash_is_extracted() {
        let uri = format!("magnet:?xt=urn:btih:{}&dn=Show", HEX.to_uppercase());
        assert_eq!(magnet_hash(&uri).map(|hash| hash.to_string()), Some(HEX.to_string()));
        assert!(magnet_hash("magnet:?xt=urn:btih:ABCDEFGHIJKLMNOPQRSTUVWXYZ234567").is_none());
        assert!(magnet_hash("https://example.test/file.torrent").is_none());
    }

    #[test]
    fn hybrid_magnets_prefer_the_v1_topic() {
        let v2 = "ab".repeat(32);
        let uri = format!("magnet:?xt=urn:btmh:1220{v2}&xt=urn:btih:{HEX}");
        let hash = magnet_hash(&uri).expect("hybrid magnet has a hash");
        assert_eq!(hash.as_str(), HEX);
        assert_eq!(hash.torrent_id().len(), 40);

        let v2_only = magnet_hash(&format!("magnet:?xt=urn:btmh:1220{v2}"))
            .expect("v2 magnet has a hash");
        assert_eq!(v2_only.torrent_id(), "ab".repeat(20));
    }

    #[test]
    fn magnet_jobs_carry_action_options() {
        let job = build_job(&args(&format!("magnet:?xt=urn:btih:{HEX}")), &action())
            .expect("job should build");
        assert!(matches!(job.source, JobSource::Url { .. }));
        assert_eq!(job.hash.as_ref().map(ContentHash::as_str), Some(HEX));
        assert_eq!(job.options.category.as_deref(), Some("tv"));
        assert!(!job.ignore_rules);
    }

    #[test]
    fn explicit_hash_must_be_valid() {
        let mut push = args("magnet:?dn=nohash");
        push.hash = Some("xyz".into());
        let err = build_job(&push, &action()).expect_err("bad hash should fail");
        assert_eq!(err.exit_code(), 2);

        push.hash = Some(HEX.into());
        push.ignore_rules = true;
        let job = build_job(&push, &action()).expect("job should build");
        assert!(job.hash.is_some());
        assert!(job.ignore_rules);
    }

    #[test]
    fn torrent_files_are_uploaded_with_their_stem() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Some.Show.S01.torrent");
        let mut file = fs::File::create(&path).expect("create");
        file.write_all(b"d4:infod4:name4:testee").expect("write");

        let job = build_job(&args(&path.display().to_string()), &action()).expect("job should build");
        assert!(matches!(job.source, JobSource::Metainfo { ref bytes } if !bytes.is_empty()));
        assert_eq!(job.name_hint.as_deref(), Some("Some.Show.S01"));
        assert!(job.hash.is_none());
    }

    #[test]
    fn missing_files_are_failures() {
        let err = build_job(&args("/definitely/not/here.torrent"), &action())
            .expect_err("missing file should fail");
        assert_eq!(err.exit_code(), 3);
    }
}
