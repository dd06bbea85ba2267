use std::fs;
use std::time::Duration;

use handoff_config::{ConfigError, load_from_path};
use tempfile::TempDir;

const YAML_DOCUMENT: &str = r#"
clients:
  - name: seedbox
    host: qbt.internal
    port: 8080
    username: admin
    password: adminadmin
    base_path: /qbittorrent
    rules:
      enabled: true
      max_active_downloads: 2
      ignore_slow_torrents: true
      download_speed_threshold_kib: 500
actions:
  - name: tv
    client: seedbox
    save_path: /data/tv
    category: tv
    tags: [auto, tv]
    upload_limit: 1048576
convergence:
  initial_delay_secs: 2
  interval_ms: 500
  max_attempts: 10
  grace_delay_secs: 5
  delete_on_failure: false
logging:
  level: debug
  format: json
"#;

#[test]
fn yaml_document_loads_with_rules_and_timings() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("handoff.yaml");
    fs::write(&path, YAML_DOCUMENT)?;

    let config = load_from_path(&path)?;
    let client = config.client("seedbox")?;
    assert_eq!(client.base_path.as_deref(), Some("/qbittorrent"));
    assert_eq!(client.timeout(), Duration::from_secs(30));
    assert!(client.rules.enabled);
    assert_eq!(client.rules.active_limit(), Some(2));

    let action = config.action("tv")?;
    let options = action.job_options();
    assert_eq!(options.tags, vec!["auto".to_string(), "tv".to_string()]);
    assert_eq!(options.upload_limit, Some(1_048_576));
    assert!(!options.start_paused);

    let settings = config.convergence_settings();
    assert_eq!(settings.initial_delay, Duration::from_secs(2));
    assert_eq!(settings.interval, Duration::from_millis(500));
    assert_eq!(settings.max_attempts, 10);
    assert!(!settings.delete_on_failure);
    assert_eq!(config.logging.format.as_deref(), Some("json"));
    Ok(())
}

#[test]
fn json_document_is_selected_by_extension() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("handoff.json");
    fs::write(
        &path,
        r#"{
            "clients": [{ "name": "local", "host": "127.0.0.1", "port": 9091 }],
            "actions": [{ "name": "default", "client": "local", "paused": true }]
        }"#,
    )?;

    let config = load_from_path(&path)?;
    assert_eq!(config.clients[0].port, 9091);
    assert!(!config.clients[0].rules.enabled);
    assert!(config.action("default")?.paused);
    assert_eq!(config.convergence.max_attempts, 50);
    assert!(config.convergence.delete_on_failure);
    Ok(())
}

#[test]
fn invalid_documents_report_context() -> anyhow::Result<()> {
    let dir = TempDir::new()?;

    let missing = dir.path().join("absent.yaml");
    assert!(matches!(
        load_from_path(&missing),
        Err(ConfigError::Io { .. })
    ));

    let dangling = dir.path().join("dangling.yaml");
    fs::write(
        &dangling,
        "clients: []\nactions:\n  - name: tv\n    client: nowhere\n",
    )?;
    match load_from_path(&dangling) {
        Err(ConfigError::InvalidField { section, field, .. }) => {
            assert_eq!(section, "actions.tv");
            assert_eq!(field, "client");
        }
        other => panic!("expected invalid field, got {other:?}"),
    }

    let malformed = dir.path().join("broken.yaml");
    fs::write(&malformed, "clients: [")?;
    assert!(matches!(
        load_from_path(&malformed),
        Err(ConfigError::Yaml { .. })
    ));
    Ok(())
}
