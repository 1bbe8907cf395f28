//! tofu-progress CLI entrypoint.
//!
//! Loads a walk script and replays it against the progress hooks.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tofu_progress::cli::{stdout_sink, Cli, Commands, OutputFormat, OutputFormatter, Replay};
use tofu_progress::config::{find_script_file, ScriptParser, ScriptValidator, WalkScript};
use tofu_progress::error::Result;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Initialize logging
    init_logging(cli.verbose);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let formatter = OutputFormatter::new(cli.output);
    match runtime.block_on(run(cli, &formatter)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system. Logs go to stderr so stdout only carries
/// events and results.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli, formatter: &OutputFormatter) -> Result<ExitCode> {
    match cli.command {
        Commands::Validate { warnings } => {
            cmd_validate(cli.script.as_ref(), warnings, formatter)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Plan => cmd_plan(cli.script.as_ref(), cli.output, formatter).await,
        Commands::Apply {
            parallelism,
            heartbeat_interval,
        } => {
            cmd_apply(
                cli.script.as_ref(),
                parallelism,
                heartbeat_interval,
                cli.output,
                formatter,
            )
            .await
        }
    }
}

/// Validate the walk script.
fn cmd_validate(
    script_path: Option<&PathBuf>,
    show_warnings: bool,
    formatter: &OutputFormatter,
) -> Result<()> {
    let script = load_script(script_path)?;
    let result = ScriptValidator::new().validate(&script)?;
    println!("{}", formatter.format_validation(&script, &result, show_warnings));
    Ok(())
}

/// Replay the plan phase.
async fn cmd_plan(
    script_path: Option<&PathBuf>,
    output: OutputFormat,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let script = load_script(script_path)?;
    ScriptValidator::new().validate(&script)?;

    let (report, counts) = Replay::new(&script, stdout_sink(output))?.plan(&script).await?;

    println!("{}", formatter.format_plan(&script, &counts));
    Ok(exit_code(report.is_success()))
}

/// Replay the apply phase, streaming progress events.
async fn cmd_apply(
    script_path: Option<&PathBuf>,
    parallelism: Option<usize>,
    heartbeat_interval: Option<u64>,
    output: OutputFormat,
    formatter: &OutputFormatter,
) -> Result<ExitCode> {
    let mut script = load_script(script_path)?;
    if let Some(parallelism) = parallelism {
        script.parallelism = parallelism;
    }
    if let Some(secs) = heartbeat_interval {
        script.heartbeat_interval_secs = secs;
    }
    ScriptValidator::new().validate(&script)?;

    let (report, counts) = Replay::new(&script, stdout_sink(output))?.apply(&script).await?;

    info!(
        "Walk finished: {} succeeded, {} failed, {} skipped",
        report.succeeded.len(),
        report.failed.len(),
        report.skipped.len()
    );

    println!("{}", formatter.format_apply(&report, &counts));
    Ok(exit_code(report.is_success()))
}

/// Loads the script from `--script` or the nearest default file.
fn load_script(script_path: Option<&PathBuf>) -> Result<WalkScript> {
    let path = match script_path {
        Some(path) => path.clone(),
        None => find_script_file(std::env::current_dir()?)?,
    };
    info!("Using walk script: {}", path.display());

    ScriptParser::new()
        .with_base_path(path.parent().unwrap_or_else(|| Path::new(".")))
        .load_with_env(&path)
}

const fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
