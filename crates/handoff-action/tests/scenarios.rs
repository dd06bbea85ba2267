use std::sync::Arc;

use handoff_action::{ConvergenceOutcome, CycleOutcome, DeferReason, HandoffCycle};
use handoff_core::{ClientRuleSet, ConvergenceSettings, DownloadClient, TrackerEntry, TrackerStatus};
use handoff_telemetry::Metrics;
use handoff_test_support::fixtures::{magnet_job, sample_hash};
use handoff_test_support::mocks::{ClientCall, Operation, ScriptedClient};
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn runner(client: &Arc<ScriptedClient>, rules: ClientRuleSet) -> HandoffCycle {
    let shared: Arc<dyn DownloadClient> = Arc::clone(client) as Arc<dyn DownloadClient>;
    HandoffCycle::new(shared, rules, ConvergenceSettings::default())
}

#[tokio::test(start_paused = true)]
async fn full_client_defers_without_submission() -> anyhow::Result<()> {
    let client = Arc::new(ScriptedClient::new("seedbox").with_active_downloads(5));
    let rules = ClientRuleSet {
        enabled: true,
        max_active_downloads: 5,
        ignore_slow_torrents: false,
        download_speed_threshold_kib: 0,
    };
    let metrics = Metrics::new()?;
    let outcome = runner(&client, rules)
        .with_metrics(metrics.clone())
        .run(&magnet_job(), &CancellationToken::new())
        .await?;

    assert_eq!(
        outcome,
        CycleOutcome::Deferred(DeferReason::ActiveLimitReached { active: 5, max: 5 })
    );
    assert_eq!(client.count(Operation::Submit), 0);
    assert_eq!(metrics.snapshot().deferred_total, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn working_tracker_converges_after_initial_delay() -> anyhow::Result<()> {
    let client = Arc::new(ScriptedClient::new("seedbox").with_tracker_fallback(vec![
        TrackerEntry::new("** [DHT] **", TrackerStatus::Disabled),
        TrackerEntry::new("udp://tracker.example:6969", TrackerStatus::NotContacted),
        TrackerEntry::new("https://tracker.example/announce", TrackerStatus::Working),
    ]));
    let started = Instant::now();
    let outcome = runner(&client, ClientRuleSet::default())
        .run(&magnet_job(), &CancellationToken::new())
        .await?;

    assert_eq!(
        outcome,
        CycleOutcome::Submitted {
            hash: Some(sample_hash()),
            convergence: Some(ConvergenceOutcome::Converged { attempts: 1 }),
        }
    );
    assert_eq!(client.count(Operation::Reannounce), 0);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(6));
    assert!(elapsed < Duration::from_secs(7));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn silent_trackers_are_abandoned_after_budget() -> anyhow::Result<()> {
    let client = Arc::new(ScriptedClient::new("seedbox").with_tracker_fallback(vec![
        TrackerEntry::new("udp://tracker.example:6969", TrackerStatus::NotContacted),
    ]));
    let outcome = runner(&client, ClientRuleSet::default())
        .run(&magnet_job(), &CancellationToken::new())
        .await?;

    assert_eq!(
        outcome,
        CycleOutcome::Submitted {
            hash: Some(sample_hash()),
            convergence: Some(ConvergenceOutcome::Abandoned {
                attempts: 50,
                deleted: true,
            }),
        }
    );
    assert_eq!(client.count(Operation::Trackers), 50);
    assert_eq!(client.count(Operation::Reannounce), 50);
    let operations = client.operations();
    let last_reannounce = operations
        .iter()
        .rposition(|op| *op == Operation::Reannounce)
        .expect("re-announces were issued");
    let delete_at = operations
        .iter()
        .position(|op| *op == Operation::Delete)
        .expect("delete was issued");
    assert!(delete_at > last_reannounce);
    assert_eq!(delete_at, operations.len() - 1);
    let deletes: Vec<ClientCall> = client
        .calls()
        .into_iter()
        .filter(|call| call.operation() == Operation::Delete)
        .collect();
    assert_eq!(
        deletes,
        vec![ClientCall::Delete {
            hash: sample_hash(),
            delete_payload: false,
        }]
    );
    Ok(())
}
