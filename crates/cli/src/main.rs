// mapas - delivery map triage from ERP CSV exports

mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use mapas_recon::{Category, ReconError};

use exit_codes::{EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_IO, EXIT_NO_SOURCES, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "mapas")]
#[command(about = "Reconcile delivery map exports and triage them by status")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that runs a pass.
#[derive(Args, Debug, Clone)]
pub struct PassArgs {
    /// Folder holding the CSV exports (searched recursively)
    pub dir: PathBuf,

    /// TOML config overriding file patterns, columns and labels
    #[arg(long, short = 'c', env = "MAPAS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Anchor date as dd/mm/yyyy (default: today's local date)
    #[arg(long, value_parser = parse_anchor_date)]
    pub today: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one pass and print the triage counts
    #[command(after_help = "\
Examples:
  mapas run ./exports
  mapas run ./exports --today 10/03/2026 --json
  mapas run ./exports --config mapas.toml --output result.json")]
    Run {
        #[command(flatten)]
        pass: PassArgs,

        /// Print the full result as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write the full result as JSON to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List maps in one category, optionally narrowed by a search term
    #[command(after_help = "\
Examples:
  mapas list ./exports --filter Reabertos
  mapas list ./exports --filter en_route --search ABC1D23
  mapas list ./exports --search padaria --json")]
    List {
        #[command(flatten)]
        pass: PassArgs,

        /// Category key (Todos, Aberto, EmRota, ...) or English name (all, open, en_route, ...)
        #[arg(long, short = 'f', default_value = "Todos")]
        filter: Category,

        /// Case-insensitive text matched against map, driver, plate and invoices
        #[arg(long, short = 's', default_value = "")]
        search: String,

        /// Print the selected maps as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-run a fresh pass on an interval
    #[command(after_help = "\
Examples:
  mapas watch ./exports
  mapas watch ./exports --interval 30")]
    Watch {
        #[command(flatten)]
        pass: PassArgs,

        /// Seconds between passes
        #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,

        /// Stop after this many passes (default: run until interrupted)
        #[arg(long)]
        count: Option<u64>,
    },

    /// Parse and validate a config file without running
    #[command(after_help = "\
Examples:
  mapas validate mapas.toml")]
    Validate {
        /// Path to the TOML config file
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  mapas-recon ", env!("CARGO_PKG_VERSION"),
    )
}

/// `dd/mm/yyyy`, the format the exports and the summary use.
fn parse_anchor_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y")
        .map_err(|_| format!("expected a date as dd/mm/yyyy, got {s:?}"))
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { pass, json, output } => recon::cmd_run(pass, json, output),
        Commands::List { pass, filter, search, json } => recon::cmd_list(pass, filter, search, json),
        Commands::Watch { pass, interval, count } => recon::cmd_watch(pass, interval, count),
        Commands::Validate { config } => recon::cmd_validate(config),
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

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_CONFIG, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ReconError> for CliError {
    fn from(err: ReconError) -> Self {
        match err {
            ReconError::NoRecognizedSources { .. } => CliError {
                code: EXIT_NO_SOURCES,
                message: "no valid CSV file found in the selected folder".into(),
                hint: Some(err.to_string()),
            },
            ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => {
                CliError::config(err.to_string())
            }
        }
    }
}

impl From<mapas_io::IoError> for CliError {
    fn from(err: mapas_io::IoError) -> Self {
        CliError::io(err.to_string())
    }
}
