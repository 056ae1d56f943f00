use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use tracing::debug;

use harness_servo_driver::AdjustResult;

mod commands;
mod output;

/// Servo driver contract: `adjust [--version|--info|--query] <app_id>`,
/// with the desired state on stdin when none of the flags is given.
#[derive(Parser, Debug)]
#[command(
    name = "adjust",
    about = "Harness canary adjust driver for the Opsani servo",
    disable_version_flag = true
)]
struct Cli {
    /// Name/ID of the application to adjust.
    #[arg(required_unless_present_any = ["version", "info"])]
    app_id: Option<String>,

    /// Print the driver version and exit.
    #[arg(long)]
    version: bool,

    /// Print driver info (version, cancel support) as JSON and exit.
    #[arg(long)]
    info: bool,

    /// Query the canary component's current settings.
    #[arg(long, conflicts_with = "promote")]
    query: bool,

    /// Trigger the promote workflow instead of an adjustment.
    #[arg(long)]
    promote: bool,

    /// Path to the YAML config file.
    #[arg(long, env = "OPTUNE_CONFIG", default_value = "./config.yaml")]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // stdout carries the servo protocol; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("harness_servo=info".parse()?)
                .add_directive("adjust=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli, std::io::stdin().lock()).await {
        output::failure(&e);
        std::process::exit(1);
    }
    Ok(())
}

/// Dispatch one invocation. `input` carries the desired state for the
/// default adjust action.
async fn run(cli: &Cli, input: impl Read) -> AdjustResult<()> {
    if cli.version {
        commands::info::version();
        return Ok(());
    }
    if cli.info {
        commands::info::info();
        return Ok(());
    }

    debug!(app_id = cli.app_id.as_deref().unwrap_or("-"), config = %cli.config.display(), "driver invoked");

    if cli.query {
        commands::query::query(&cli.config).await
    } else if cli.promote {
        commands::adjust::promote(&cli.config).await
    } else {
        commands::adjust::adjust(&cli.config, input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_and_info_do_not_need_app_id() {
        let cli = Cli::try_parse_from(["adjust", "--version"]).unwrap();
        assert!(cli.version);
        let cli = Cli::try_parse_from(["adjust", "--info"]).unwrap();
        assert!(cli.info);
    }

    #[test]
    fn query_requires_app_id() {
        assert!(Cli::try_parse_from(["adjust", "--query"]).is_err());
        let cli = Cli::try_parse_from(["adjust", "--query", "1234"]).unwrap();
        assert!(cli.query);
        assert_eq!(cli.app_id.as_deref(), Some("1234"));
    }

    #[test]
    fn adjust_is_the_default_action() {
        let cli = Cli::try_parse_from(["adjust", "--config", "/etc/servo.yaml", "1234"]).unwrap();
        assert!(!cli.query && !cli.promote && !cli.info && !cli.version);
        assert_eq!(cli.config, PathBuf::from("/etc/servo.yaml"));
    }

    #[test]
    fn query_and_promote_conflict() {
        assert!(Cli::try_parse_from(["adjust", "--query", "--promote", "1234"]).is_err());
    }

    #[tokio::test]
    async fn run_reports_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        let cli = Cli::try_parse_from(["adjust", "--config", path.to_str().unwrap(), "1234"])
            .unwrap();

        let err = run(&cli, "{}".as_bytes()).await.unwrap_err();
        assert_eq!(err.reason(), "config");

        let cli = Cli::try_parse_from([
            "adjust",
            "--query",
            "--config",
            path.to_str().unwrap(),
            "1234",
        ])
        .unwrap();
        let err = run(&cli, std::io::empty()).await.unwrap_err();
        assert_eq!(err.reason(), "config");
    }

    #[tokio::test]
    async fn run_version_and_info_skip_config() {
        let cli = Cli::try_parse_from(["adjust", "--version", "--config", "/nonexistent.yaml"])
            .unwrap();
        run(&cli, std::io::empty()).await.unwrap();

        let cli = Cli::try_parse_from(["adjust", "--info", "--config", "/nonexistent.yaml"])
            .unwrap();
        run(&cli, std::io::empty()).await.unwrap();
    }
}
