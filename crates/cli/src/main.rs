// dbrecon - batch reconciliation of two tabular sources per job

mod batch;
mod exit_codes;
mod logging;
mod runner;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use dbrecon_config::{ConfigError, JobFile};
use dbrecon_recon::{ReconError, Transform};
use tracing::{info, warn};

use batch::BatchSummary;
use exit_codes::{batch_exit_code, EXIT_INVALID_CONFIG, EXIT_SUCCESS, EXIT_USAGE};
use logging::{init_logging, LogConfig};

#[derive(Parser)]
#[command(name = "dbrecon")]
#[command(about = "Reconcile two tabular sources by join key and report the differences")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also append log output to this file
    #[arg(long, global = true, value_name = "PATH", env = "DBRECON_LOG_FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every job in a config file, or a single one
    #[command(after_help = "\
Examples:
  dbrecon run jobs.toml
  dbrecon run jobs.toml --job customers
  dbrecon -v run jobs.toml --log-file recon.log

Exit codes:
  0  all jobs ran, perfect match
  1  all jobs ran, differences found
  2  usage error
  3  invalid config
  4  at least one job failed")]
    Run {
        /// Job config (TOML)
        config: PathBuf,

        /// Run only this job
        #[arg(short, long)]
        job: Option<String>,
    },

    /// Parse and validate a config without touching any source
    Validate {
        /// Job config (TOML)
        config: PathBuf,
    },

    /// List the join-key transforms
    Transforms,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("DBRECON_GIT_HASH"), ")",
        "\ntarget:  ", env!("DBRECON_TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose).with_log_file(cli.log_file.clone());
    if let Err(e) = init_logging(&log_config) {
        eprintln!("error: cannot initialize logging: {}", e);
        return ExitCode::from(EXIT_USAGE);
    }

    let result = match cli.command {
        Commands::Run { config, job } => cmd_run(&config, job.as_deref()),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Transforms => cmd_transforms(),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_CONFIG, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match &err {
            ConfigError::Read { .. } => CliError::usage(err.to_string())
                .with_hint("check the config path"),
            ConfigError::UnknownJob(_) => CliError::usage(err.to_string())
                .with_hint("run `dbrecon validate <config>` to list the jobs"),
            ConfigError::Recon { source: ReconError::UnknownTransform { .. }, .. } => CliError::config(err.to_string())
                .with_hint("run `dbrecon transforms` to list the valid transform names"),
            _ => CliError::config(err.to_string()),
        }
    }
}

// ============================================================================
// run
// ============================================================================

fn cmd_run(config: &Path, only: Option<&str>) -> Result<u8, CliError> {
    let file = JobFile::load(config)?;
    info!(config = %config.display(), jobs = file.jobs.len(), "config loaded");

    let outcomes = runner::run_all(&file, only)?;

    let summary = BatchSummary::build(&outcomes, config, chrono::Local::now().to_rfc3339());
    let summary_dir = match (only, outcomes.as_slice()) {
        (Some(name), _) => file.output_dir(file.job(name)?),
        (None, [single]) => file.output_dir(file.job(&single.name)?),
        _ => file.base_dir.join("output"),
    };
    match summary.write(&summary_dir) {
        Ok((txt, json)) => info!(text = %txt.display(), json = %json.display(), "batch summary saved"),
        Err(e) => warn!(dir = %summary_dir.display(), error = %e, "could not write batch summary"),
    }

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(summary.render_text().as_bytes())
        .map_err(|e| CliError::usage(e.to_string()))?;

    let failed = summary.execution_status.failed_execution;
    let with_differences = outcomes.iter().filter(|o| o.has_differences()).count();
    Ok(batch_exit_code(failed, with_differences))
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(config: &Path) -> Result<u8, CliError> {
    let file = JobFile::load(config)?;
    let mut stdout = io::stdout().lock();
    let mut out = |line: String| writeln!(stdout, "{}", line).map_err(|e| CliError::usage(e.to_string()));

    for job in &file.jobs {
        let options = job.config.compare_options(&job.name)?;
        let (source1, source2) = file.resolve_sources(job)?;
        out(format!(
            "{}: {} {} ({}) vs {} {} ({}), keys [{}]",
            job.name,
            source1.backend.kind(),
            source1.name,
            source1.backend.path().display(),
            source2.backend.kind(),
            source2.name,
            source2.backend.path().display(),
            options.key_columns().join(", "),
        ))?;
    }
    out(format!("ok: {} job(s)", file.jobs.len()))?;
    Ok(EXIT_SUCCESS)
}

// ============================================================================
// transforms
// ============================================================================

fn cmd_transforms() -> Result<u8, CliError> {
    let mut stdout = io::stdout().lock();
    for name in Transform::NAMES {
        writeln!(stdout, "{}", name).map_err(|e| CliError::usage(e.to_string()))?;
    }
    Ok(EXIT_SUCCESS)
}
