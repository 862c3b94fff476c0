// routeplan CLI - match customers between the planning workbook and the
// system export, apply the results and report on the difference.

mod apply;
mod exit_codes;
mod matching;
mod reports;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use routeplan_io::IoError;
use routeplan_recon::{ReconConfig, ReconError};

use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "rplan")]
#[command(about = "Customer matching between route planning and the order export")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that reads workbooks.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// TOML config file (thresholds, routes, sheet names, column names)
    #[arg(long, short = 'c', env = "RPLAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Score at or above which a match is HIGH confidence (0-100)
    #[arg(long, value_name = "SCORE")]
    pub threshold_high: Option<f64>,

    /// Score at or above which a match is MEDIUM confidence (0-100)
    #[arg(long, value_name = "SCORE")]
    pub threshold_medium: Option<f64>,

    /// Matcher cutoff; candidates below it are not matches (defaults to the medium threshold)
    #[arg(long, value_name = "SCORE")]
    pub min_score: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Match planning customers against the export and write a mapping file
    #[command(after_help = "\
Examples:
  rplan match --planning Planningstabel.xlsx --export export.csv
  rplan match --planning Planningstabel.xlsx --export export.xlsx -o mapping.csv
  rplan match --planning Planningstabel.xlsx --export export.csv --threshold-high 95 --json")]
    Match {
        /// Planning workbook (one sheet per route)
        #[arg(long, short = 'p')]
        planning: PathBuf,

        /// System export (CSV with a route column, or a workbook with one sheet per route)
        #[arg(long, short = 'e')]
        export: PathBuf,

        /// Mapping file to write
        #[arg(long, short = 'o', default_value = "mapping.csv")]
        output: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Print the full result set and statistics as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Apply a mapping file to the planning workbook (backup first, then confirm)
    #[command(after_help = "\
A timestamped backup (<name>_BACKUP_YYYYMMDD_HHMMSS.xlsx) is written next to the
planning workbook before anything else. Declining the prompt exits with code 1
and leaves the workbook untouched.

Examples:
  rplan apply --planning Planningstabel.xlsx --mapping mapping.csv
  rplan apply --planning Planningstabel.xlsx --mapping mapping.csv --include-review
  rplan apply --planning Planningstabel.xlsx --mapping mapping.csv -o updated.xlsx --yes")]
    Apply {
        /// Planning workbook to update
        #[arg(long, short = 'p')]
        planning: PathBuf,

        /// Mapping file written by `rplan match`
        #[arg(long, short = 'm')]
        mapping: PathBuf,

        /// Write the updated workbook here instead of replacing the input
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Also apply REVIEW (medium confidence) renames
        #[arg(long)]
        include_review: bool,

        /// Apply without asking for confirmation
        #[arg(long, short = 'y')]
        yes: bool,

        #[command(flatten)]
        config: ConfigArgs,

        /// Print the update report as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Compare customer lists and order counts per route (exact names)
    #[command(after_help = "\
Examples:
  rplan diff --planning Planningstabel.xlsx --export export.csv
  rplan diff --planning Planningstabel.xlsx --export export.csv -o diff.xlsx --json")]
    Diff {
        /// Planning workbook
        #[arg(long, short = 'p')]
        planning: PathBuf,

        /// System export
        #[arg(long, short = 'e')]
        export: PathBuf,

        /// Report workbook to write
        #[arg(long, short = 'o', default_value = "route_diff.xlsx")]
        output: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Print the per-route summary as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Measure how many export customers two planning versions contain
    #[command(after_help = "\
Examples:
  rplan compare --export export.csv --before Planningstabel_BACKUP_20260209_170503.xlsx --after Planningstabel.xlsx
  rplan compare --export export.csv --before old.xlsx --after new.xlsx -o comparison.xlsx --json")]
    Compare {
        /// System export (ground truth)
        #[arg(long, short = 'e')]
        export: PathBuf,

        /// Planning workbook before the update
        #[arg(long)]
        before: PathBuf,

        /// Planning workbook after the update
        #[arg(long)]
        after: PathBuf,

        /// Report workbook to write
        #[arg(long, short = 'o', default_value = "comparison.xlsx")]
        output: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,

        /// Print the comparison as JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Match { planning, export, output, config, json } => {
            matching::cmd_match(&planning, &export, &output, &config, json)
        }
        Commands::Apply { planning, mapping, output, include_review, yes, config, json } => {
            apply::cmd_apply(&planning, &mapping, output, include_review, yes, &config, json)
        }
        Commands::Diff { planning, export, output, config, json } => {
            reports::cmd_diff(&planning, &export, &output, &config, json)
        }
        Commands::Compare { export, before, after, output, config, json } => {
            reports::cmd_compare(&export, &before, &after, &output, &config, json)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
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

// ============================================================================
// Errors
// ============================================================================

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

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(e: ReconError) -> Self {
        match e {
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => CliError::usage(e.to_string()),
            _ => CliError::runtime(e.to_string()),
        }
    }
}

impl From<IoError> for CliError {
    fn from(e: IoError) -> Self {
        match e {
            IoError::Recon(inner) => inner.into(),
            IoError::NotFound { .. } => CliError::runtime(e.to_string()).with_hint("check the path and try again"),
            IoError::MissingColumn { .. } => CliError::runtime(e.to_string())
                .with_hint("set the column names in the [export] section of the config"),
            IoError::MissingSheet { .. } => CliError::runtime(e.to_string())
                .with_hint("set the sheet names in the [export.sheets] section of the config"),
            IoError::Mapping { .. } => {
                CliError::runtime(e.to_string()).with_hint("regenerate the mapping file with `rplan match`")
            }
            other => CliError::runtime(other.to_string()),
        }
    }
}

/// Read the config file (if any) and apply the threshold flags.
pub fn load_config(args: &ConfigArgs) -> Result<ReconConfig, CliError> {
    let config = match &args.config {
        Some(path) => read_config(path)?,
        None => ReconConfig::default(),
    };
    let config = config.with_overrides(args.threshold_high, args.threshold_medium, args.min_score)?;
    log::debug!(
        "thresholds: high {} medium {} cutoff {}; scorer {}",
        config.thresholds.high,
        config.thresholds.medium,
        config.thresholds.cutoff(),
        config.scorer.kind
    );
    Ok(config)
}

fn read_config(path: &Path) -> Result<ReconConfig, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::runtime(format!("cannot read config {}: {e}", path.display()))
            .with_hint("pass an existing file with --config")
    })?;
    ReconConfig::from_toml(&text).map_err(|e| CliError::usage(format!("{}: {e}", path.display())))
}

/// Pretty JSON to stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;
    println!("{json}");
    Ok(())
}
