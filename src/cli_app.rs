//! Top-level CLI definition and dispatch.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use more_disk_space::cli::ConsoleOutput;
use more_disk_space::core::config::Config;
use more_disk_space::core::errors::{ErrorCategory, MdsError};
use more_disk_space::core::level::{CleanupLevel, DEFAULT_LEVEL_INPUT};
use more_disk_space::logger::activity::ActivityLog;
use more_disk_space::logger::console::StepOutput;
use more_disk_space::metrics::summary::summarize_files;
use more_disk_space::platform::env::{EnvironmentFacts, detect_runner_image};
use more_disk_space::platform::pal::LinuxPlatform;
use more_disk_space::policy::targets::targets_for;
use more_disk_space::state::channel::{FileStateChannel, GithubStateChannel, StateChannel};
use more_disk_space::steps::post::{PostStepSummary, run_post_step};
use more_disk_space::steps::pre::{PreStepInput, run_pre_step};

/// More Disk Space: frees disk on CI runners by removing unused toolchains.
#[derive(Debug, Parser)]
#[command(
    name = "mds",
    author,
    version,
    about = "More Disk Space - CI runner disk reclaimer",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Emit a JSON document on stdout; step output moves to stderr.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pre-job step: remove preinstalled toolchains for the chosen level.
    Pre(PreArgs),
    /// Post-job step: report remaining space and suggest a level.
    Post(PostArgs),
    /// List what a level would remove, without removing anything.
    Plan(PlanArgs),
    /// Aggregate activity logs into a markdown summary.
    Summarize(SummarizeArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct PreArgs {
    /// Cleanup level 1-4 (defaults to $INPUT_LEVEL, then 2).
    #[arg(long, value_name = "N")]
    level: Option<String>,
    /// Write state to this file instead of $GITHUB_STATE.
    #[arg(long, value_name = "PATH")]
    state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct PostArgs {
    /// Read state from this file instead of the runner environment.
    #[arg(long, value_name = "PATH")]
    state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct PlanArgs {
    /// Cleanup level 1-4 (defaults to $INPUT_LEVEL, then 2).
    #[arg(long, value_name = "N")]
    level: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct SummarizeArgs {
    /// JSONL activity logs to aggregate.
    #[arg(required = true, value_name = "LOG")]
    logs: Vec<PathBuf>,
    /// Also write the markdown summary to this file.
    #[arg(long, value_name = "PATH")]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

impl From<MdsError> for CliError {
    fn from(error: MdsError) -> Self {
        let message = format!("[{}] {error}", error.code());
        match error.category() {
            ErrorCategory::Configuration => Self::User(message),
            ErrorCategory::Internal if !matches!(error, MdsError::Io { .. }) => {
                Self::Internal(message)
            }
            _ => Self::Runtime(message),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Pre(args) => run_pre(cli, args),
        Command::Post(args) => run_post(cli, args),
        Command::Plan(args) => run_plan(cli, args),
        Command::Summarize(args) => run_summarize(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

fn run_pre(cli: &Cli, args: &PreArgs) -> Result<(), CliError> {
    let mode = output_mode(cli);
    let raw_level = resolve_level_input(args.level.as_deref(), env::var("INPUT_LEVEL").ok());
    // Reject a bad level before touching config, state, or disk.
    CleanupLevel::parse(&raw_level)?;

    let config = Config::load(cli.config.as_deref())?;
    let platform = LinuxPlatform::from_config(&config);
    let mut state: Box<dyn StateChannel> = match &args.state_file {
        Some(path) => Box::new(FileStateChannel::new(path)),
        None => Box::new(GithubStateChannel::from_env(&config.state.env_prefix)),
    };
    let mut activity = open_activity_log(&config);
    let mut out = console_for(mode);

    let input = PreStepInput {
        raw_level: &raw_level,
        facts: EnvironmentFacts::detect(),
        root: &config.measurement.root,
        config_hash: config.stable_hash().ok(),
    };
    let summary = run_pre_step(&input, &platform, state.as_mut(), &mut out, &mut activity)?;

    if mode == OutputMode::Json {
        write_json_line(&serde_json::to_value(&summary)?)?;
    }
    Ok(())
}

fn run_post(cli: &Cli, args: &PostArgs) -> Result<(), CliError> {
    let mode = output_mode(cli);
    let mut out = console_for(mode);

    // The post-step never fails the job; a broken config falls back to defaults.
    let config = Config::load(cli.config.as_deref()).unwrap_or_else(|error| {
        out.warn(&format!("Warning: using default config ({error})"));
        Config::default()
    });
    let platform = LinuxPlatform::from_config(&config);
    let state: Box<dyn StateChannel> = match &args.state_file {
        Some(path) => Box::new(FileStateChannel::new(path)),
        None => Box::new(GithubStateChannel::from_env(&config.state.env_prefix)),
    };
    let mut activity = open_activity_log(&config);

    let summary = run_post_step(
        state.as_ref(),
        &config.measurement.root,
        &platform,
        &mut out,
        &mut activity,
    );

    if mode == OutputMode::Json {
        emit_post_json(&summary, &mut io::stdout().lock(), &mut out);
    }
    Ok(())
}

/// A closed or broken stdout only costs the JSON document, never the exit code.
fn emit_post_json(summary: &PostStepSummary, sink: &mut dyn Write, out: &mut dyn StepOutput) {
    let written = serde_json::to_value(summary)
        .map_err(CliError::from)
        .and_then(|payload| write_json_to(sink, &payload));
    if let Err(error) = written {
        out.warn(&format!("Warning: Failed to write post-step report: {error}"));
    }
}

// ---------------------------------------------------------------------------
// Plan & summarize
// ---------------------------------------------------------------------------

fn run_plan(cli: &Cli, args: &PlanArgs) -> Result<(), CliError> {
    let raw_level = resolve_level_input(args.level.as_deref(), env::var("INPUT_LEVEL").ok());
    let level = CleanupLevel::parse(&raw_level)?;
    let targets: Vec<_> = targets_for(level).collect();

    match output_mode(cli) {
        OutputMode::Json => write_json_line(&json!({
            "level": level,
            "targets": targets,
        })),
        OutputMode::Human => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "Level {level} removes:")?;
            for target in targets {
                writeln!(
                    stdout,
                    "  tier {}  {:<10} {}",
                    target.tier,
                    target.label.bold(),
                    target.paths.join(", ")
                )?;
            }
            Ok(())
        }
    }
}

fn run_summarize(cli: &Cli, args: &SummarizeArgs) -> Result<(), CliError> {
    let summary = summarize_files(&args.logs)?;
    let markdown = summary.to_markdown();

    if let Some(path) = &args.out {
        fs::write(path, &markdown).map_err(|source| MdsError::io(path, source))?;
    }

    match output_mode(cli) {
        OutputMode::Json => write_json_line(&serde_json::to_value(&summary)?),
        OutputMode::Human => {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{markdown}")?;
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Explicit flag wins; an empty or absent `INPUT_LEVEL` means the default.
/// Anything else is passed through untouched for validation.
fn resolve_level_input(flag: Option<&str>, input_env: Option<String>) -> String {
    if let Some(raw) = flag {
        return raw.to_string();
    }
    input_env
        .filter(|raw| !raw.is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL_INPUT.to_string())
}

fn open_activity_log(config: &Config) -> ActivityLog {
    ActivityLog::open_optional(
        config.paths.activity_log.as_deref(),
        config.paths.activity_log_fallback.as_deref(),
    )
        .with_image(detect_runner_image(|name| env::var(name).ok()))
}

fn console_for(mode: OutputMode) -> ConsoleOutput {
    match mode {
        OutputMode::Human => ConsoleOutput::stdio(),
        OutputMode::Json => ConsoleOutput::stderr_only(),
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    write_json_to(&mut io::stdout().lock(), payload)
}

fn write_json_to(sink: &mut dyn Write, payload: &Value) -> Result<(), CliError> {
    serde_json::to_writer(&mut *sink, payload)?;
    writeln!(sink)?;
    sink.flush()?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = env::var("MDS_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref())
}

/// Runner logs are not a TTY, so unlike most tools the fallback is always human.
fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        _ => OutputMode::Human,
    }
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    error: &'a str,
    exit_code: i32,
}

/// JSON error document for `--json` callers.
pub fn error_payload(error: &CliError) -> Value {
    serde_json::to_value(ErrorPayload {
        error: &error.to_string(),
        exit_code: error.exit_code(),
    })
    .unwrap_or_else(|_| json!({ "error": "unserializable error" }))
}

/// Whether the parsed command asked for JSON output.
pub fn wants_json(cli: &Cli) -> bool {
    output_mode(cli) == OutputMode::Json
}
