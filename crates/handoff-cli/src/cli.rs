//! Argument parsing, bootstrap and command dispatch.

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use handoff_config::{HandoffConfig, load_from_path, resolve_path};
use handoff_telemetry::{LogFormat, LoggingConfig, init_logging};

use crate::client::{CliError, CliResult};
use crate::commands::{check, push};
use crate::output::OutputFormat;

const BUILD_SHA: &str = match option_env!("HANDOFF_BUILD_SHA") {
    Some(sha) => sha,
    None => "dev",
};

#[derive(Debug, Parser)]
#[command(
    name = "handoff",
    version,
    about = "Hand jobs to qBittorrent with admission rules and announce convergence"
)]
pub(crate) struct Cli {
    /// Configuration file (YAML, or JSON with a `.json` extension).
    #[arg(long, global = true, env = "HANDOFF_CONFIG")]
    pub(crate) config: Option<PathBuf>,
    #[arg(
        long = "output",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Select output format for command results"
    )]
    pub(crate) output: OutputFormat,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Evaluate a client's admission rules without submitting anything.
    Check(CheckArgs),
    /// Submit a job through a configured action and wait for announce convergence.
    Push(PushArgs),
}

#[derive(Debug, Args)]
pub(crate) struct CheckArgs {
    /// Client name from the configuration file.
    #[arg(long)]
    pub(crate) client: String,
}

#[derive(Debug, Args)]
pub(crate) struct PushArgs {
    /// Magnet URI, remote `.torrent` URL, or path to a local `.torrent` file.
    pub(crate) source: String,
    /// Action name from the configuration file.
    #[arg(long)]
    pub(crate) action: String,
    /// Info-hash of the job (taken from a magnet URI when omitted).
    #[arg(long)]
    pub(crate) hash: Option<String>,
    /// Display name sent with file uploads.
    #[arg(long)]
    pub(crate) name: Option<String>,
    /// Skip the client's admission rules.
    #[arg(long)]
    pub(crate) ignore_rules: bool,
    /// Cancel the cycle after this many seconds.
    #[arg(long)]
    pub(crate) timeout: Option<u64>,
}

/// Parses CLI arguments, loads configuration, executes the requested command
/// and returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => 0,
        Err(err) => {
            let exit_code = err.exit_code();
            eprintln!("error: {}", err.display_message());
            exit_code
        }
    }
}

async fn execute(cli: Cli) -> CliResult<()> {
    let path = resolve_path(cli.config.clone())?;
    let config = load_from_path(&path)?;
    install_logging(&config)?;
    let rendered = dispatch(cli, &config).await?;
    println!("{rendered}");
    Ok(())
}

fn install_logging(config: &HandoffConfig) -> CliResult<()> {
    let format = match config.logging.format.as_deref() {
        Some(label) => label.parse::<LogFormat>().map_err(CliError::validation)?,
        None => LogFormat::infer(),
    };
    init_logging(&LoggingConfig {
        level: &config.logging.level,
        format,
        build_sha: BUILD_SHA,
    })
    .map_err(|err| CliError::failure(anyhow!("failed to initialise logging: {err}")))
}

pub(crate) async fn dispatch(cli: Cli, config: &HandoffConfig) -> CliResult<String> {
    match cli.command {
        Command::Check(args) => check::handle_check(config, &args, cli.output).await,
        Command::Push(args) => push::handle_push(config, &args, cli.output).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use handoff_config::{DocumentFormat, parse_document};
    use httpmock::MockServer;
    use httpmock::prelude::*;

    #[test]
    fn push_arguments_parse() {
        let cli = Cli::try_parse_from([
            "handoff",
            "--config",
            "/etc/handoff.yaml",
            "push",
            "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567",
            "--action",
            "tv",
            "--ignore-rules",
            "--timeout",
            "120",
            "--output",
            "json",
        ])
        .expect("arguments should parse");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/handoff.yaml")));
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Command::Push(args) => {
                assert_eq!(args.action, "tv");
                assert!(args.ignore_rules);
                assert_eq!(args.timeout, Some(120));
                assert!(args.hash.is_none());
            }
            Command::Check(_) => panic!("expected push"),
        }
    }

    #[test]
    fn check_requires_client() {
        assert!(Cli::try_parse_from(["handoff", "check"]).is_err());
        let cli = Cli::try_parse_from(["handoff", "check", "--client", "seedbox"])
            .expect("arguments should parse");
        assert!(matches!(cli.command, Command::Check(CheckArgs { ref client }) if client == "seedbox"));
        assert_eq!(cli.output, OutputFormat::Text);
    }

    #[test]
    fn push_requires_action() {
        assert!(Cli::try_parse_from(["handoff", "push", "magnet:?xt=urn:btih:abc"]).is_err());
    }

    fn config_for(server: &MockServer, max_active: i64, paused: bool) -> HandoffConfig {
        let yaml = format!(
            r"
clients:
  - name: seedbox
    host: 127.0.0.1
    port: {port}
    username: admin
    password: adminadmin
    rules:
      enabled: true
      max_active_downloads: {max_active}
actions:
  - name: tv
    client: seedbox
    category: tv
    paused: {paused}
",
            port = server.port()
        );
        parse_document(&yaml, DocumentFormat::Yaml, Path::new("inline"))
            .expect("config should parse")
    }

    fn mock_login(server: &MockServer) {
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200)
                .header("set-cookie", "SID=cli-session; HttpOnly; path=/")
                .body("Ok.");
        });
    }

    fn mock_active(server: &MockServer) {
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/info");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"[
                        {"hash": "a", "name": "one", "state": "downloading"},
                        {"hash": "b", "name": "two", "state": "stalledDL"}
                    ]"#,
                );
        });
    }

    #[tokio::test]
    async fn check_reports_deferral_at_limit() {
        let server = MockServer::start_async().await;
        mock_login(&server);
        mock_active(&server);
        let config = config_for(&server, 2, false);
        let cli = Cli::try_parse_from(["handoff", "check", "--client", "seedbox"])
            .expect("arguments should parse");

        let rendered = dispatch(cli, &config).await.expect("check should succeed");
        assert_eq!(
            rendered,
            "seedbox: defer (active download limit reached (2/2))"
        );
    }

    #[tokio::test]
    async fn push_submits_paused_job_without_convergence() {
        let server = MockServer::start_async().await;
        mock_login(&server);
        mock_active(&server);
        let add = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/torrents/add")
                .header("cookie", "SID=cli-session");
            then.status(200).body("Ok.");
        });
        let config = config_for(&server, 5, true);
        let cli = Cli::try_parse_from([
            "handoff",
            "push",
            "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567",
            "--action",
            "tv",
        ])
        .expect("arguments should parse");

        let rendered = dispatch(cli, &config).await.expect("push should succeed");
        add.assert();
        assert_eq!(
            rendered,
            "tv via seedbox: submitted hash=0123456789abcdef0123456789abcdef01234567"
        );
    }

    #[tokio::test]
    async fn unknown_action_is_a_validation_error() {
        let server = MockServer::start_async().await;
        let config = config_for(&server, 5, false);
        let cli = Cli::try_parse_from(["handoff", "push", "magnet:?dn=x", "--action", "movies"])
            .expect("arguments should parse");
        let err = dispatch(cli, &config).await.expect_err("unknown action");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.display_message(), "unknown action 'movies'");
    }
}
