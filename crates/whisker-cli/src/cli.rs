//! Command-line client for the whisker status backend.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;
use whisker_config::{DEFAULT_BASE_URL, Settings};
use whisker_telemetry::{LogFormat, LoggingConfig, init_logging};

use crate::client::{AppContext, CliError, CliResult, parse_url};
use crate::commands::seedbox::handle_seedbox;
use crate::commands::sessions::{handle_sessions, handle_use};
use crate::commands::status::{handle_check, handle_status};
use crate::commands::watch::handle_watch;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Parses CLI arguments, executes the requested command, and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn execute(cli: Cli) -> CliResult<()> {
    let settings = Settings::from_env().map_err(|err| CliError::validation(err.to_string()))?;
    let format = resolve_log_format(settings.log_format.as_deref())?;
    init_logging(&LoggingConfig {
        level: &settings.log_directive,
        format,
    })
    .map_err(CliError::failure)?;

    let ctx = AppContext::new(
        cli.base_url.clone(),
        Duration::from_secs(cli.timeout),
        cli.label.clone(),
    )?;
    dispatch(cli, &ctx, &settings).await
}

async fn dispatch(cli: Cli, ctx: &AppContext, settings: &Settings) -> CliResult<()> {
    let output = cli.output;
    match cli.command {
        Command::Status(args) => handle_status(ctx, args.force, output).await,
        Command::Check => handle_check(ctx, output).await,
        Command::Seedbox => handle_seedbox(ctx).await,
        Command::Sessions => handle_sessions(ctx, output).await,
        Command::Use(args) => handle_use(ctx, &args.label).await,
        Command::Watch => handle_watch(ctx, settings, output).await,
    }
}

fn resolve_log_format(name: Option<&str>) -> CliResult<LogFormat> {
    name.map_or_else(
        || Ok(LogFormat::infer()),
        |name| {
            LogFormat::from_name(name).ok_or_else(|| {
                CliError::validation(format!(
                    "unknown log format '{name}' (expected 'pretty' or 'json')"
                ))
            })
        },
    )
}

#[derive(Parser)]
#[command(name = "whisker", about = "Session status CLI for the whisker backend")]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "WHISKER_BASE_URL",
        value_parser = parse_url,
        default_value = DEFAULT_BASE_URL,
        help = "Backend base URL"
    )]
    base_url: Url,
    #[arg(
        long,
        global = true,
        env = "WHISKER_LABEL",
        help = "Session label to operate on"
    )]
    label: Option<String>,
    #[arg(
        long,
        global = true,
        env = "WHISKER_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help = "HTTP request timeout in seconds"
    )]
    timeout: u64,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Output format for list and detail views"
    )]
    output: OutputFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Status(StatusArgs),
    Check,
    Seedbox,
    Sessions,
    Use(UseArgs),
    Watch,
}

#[derive(Args)]
struct StatusArgs {
    #[arg(long, help = "Ask the backend to run a fresh tracker check")]
    force: bool,
}

#[derive(Args)]
struct UseArgs {
    label: String,
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn status_accepts_the_force_flag() {
        let cli = parse(&["whisker", "status", "--force"]);
        match cli.command {
            Command::Status(args) => assert!(args.force),
            _ => panic!("expected the status command"),
        }
    }

    #[test]
    fn output_accepts_the_format_alias() {
        let cli = parse(&["whisker", "--format", "json", "sessions"]);
        assert!(matches!(cli.output, OutputFormat::Json));
    }

    #[test]
    fn global_flags_apply_after_the_subcommand() {
        let cli = parse(&[
            "whisker",
            "status",
            "--label",
            "alt",
            "--base-url",
            "http://backend:3180",
        ]);
        assert_eq!(cli.label.as_deref(), Some("alt"));
        assert_eq!(cli.base_url.as_str(), "http://backend:3180/");
    }

    #[test]
    fn use_requires_a_label() {
        assert!(Cli::try_parse_from(["whisker", "use"]).is_err());
        let cli = parse(&["whisker", "use", "alt"]);
        match cli.command {
            Command::Use(args) => assert_eq!(args.label, "alt"),
            _ => panic!("expected the use command"),
        }
    }

    #[test]
    fn unknown_log_formats_are_validation_errors() {
        let error = resolve_log_format(Some("yaml")).expect_err("junk formats should be rejected");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn known_log_formats_resolve() {
        assert!(matches!(
            resolve_log_format(Some("json")),
            Ok(LogFormat::Json)
        ));
        assert!(matches!(
            resolve_log_format(Some(" Pretty ")),
            Ok(LogFormat::Pretty)
        ));
    }
}
