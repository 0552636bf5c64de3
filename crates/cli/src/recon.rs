//! `mapas run|list|watch|validate`: one reconciliation pass over a folder of
//! exports, and the views built on its result.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, info};

use mapas_recon::model::{AggregateResult, MapRecord};
use mapas_recon::normalize::{format_currency, format_local_date};
use mapas_recon::{filter_maps, Category, ReconConfig};

use crate::exit_codes::EXIT_NO_SOURCES;
use crate::{CliError, PassArgs};

// ---------------------------------------------------------------------------
// Shared pass plumbing
// ---------------------------------------------------------------------------

fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    let Some(path) = path else {
        return Ok(ReconConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    let config = ReconConfig::from_toml(&text)?;
    debug!("loaded config from {}", path.display());
    Ok(config)
}

fn anchor_date(pass: &PassArgs) -> NaiveDate {
    pass.today.unwrap_or_else(|| chrono::Local::now().date_naive())
}

/// Discover, decode and reconcile the folder's exports.
fn run_pass(pass: &PassArgs, config: &ReconConfig) -> Result<AggregateResult, CliError> {
    let input = mapas_io::discover_sources(&pass.dir, &config.sources)?;
    let result = mapas_recon::run(config, &input, anchor_date(pass)).map_err(|e| {
        let err = CliError::from(e);
        if err.code == EXIT_NO_SOURCES {
            err.with_hint(expected_files_hint(config))
        } else {
            err
        }
    })?;
    Ok(result)
}

fn expected_files_hint(config: &ReconConfig) -> String {
    let fragments: Vec<String> = mapas_recon::SourceKind::ALL
        .iter()
        .map(|k| format!("{k} (*{}*.csv)", config.sources.pattern(*k)))
        .collect();
    format!("expected any of: {}", fragments.join(", "))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))
}

fn print_summary(result: &AggregateResult) {
    eprintln!(
        "{} maps from {} sources, anchor {}",
        result.maps.len(),
        result.meta.sources_loaded.len(),
        format_local_date(result.meta.today),
    );
    for category in Category::ALL {
        let label = if category == Category::Future {
            result.future_label.clone()
        } else {
            category.key().to_string()
        };
        eprintln!("  {:<22}{:>5}", label, result.count(category));
    }
}

fn map_line(map: &MapRecord) -> String {
    let mut line = format!(
        "{:<8} {:<20} {:<10} {:<24} {:<8} pago {} | prazo {} | pendente {}",
        map.id,
        map.status,
        map.issue_date_label,
        map.driver,
        map.plate,
        format_currency(map.financial.paid),
        format_currency(map.financial.deferred),
        format_currency(map.financial.pending),
    );
    for badge in map.badges() {
        line.push_str(&format!(" [{badge}]"));
    }
    line
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub fn cmd_run(pass: PassArgs, json_output: bool, output_file: Option<PathBuf>) -> Result<(), CliError> {
    let config = load_config(pass.config.as_deref())?;
    let result = run_pass(&pass, &config)?;

    if json_output || output_file.is_some() {
        let json_str = to_json(&result)?;
        if let Some(ref path) = output_file {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }
        if json_output {
            println!("{json_str}");
        }
    }

    print_summary(&result);
    Ok(())
}

pub fn cmd_list(pass: PassArgs, filter: Category, search: String, json_output: bool) -> Result<(), CliError> {
    let config = load_config(pass.config.as_deref())?;
    let result = run_pass(&pass, &config)?;
    let selected = filter_maps(&result.maps, filter, &search, result.meta.today);

    if json_output {
        println!("{}", to_json(&selected)?);
    } else {
        for map in &selected {
            println!("{}", map_line(map));
        }
    }

    let label = if filter == Category::Future {
        result.future_label.as_str()
    } else {
        filter.key()
    };
    eprintln!("{}: {} of {} maps", label, selected.len(), result.maps.len());
    Ok(())
}

/// Each pass is independent: a folder that is briefly empty or missing while
/// exports are being replaced is reported and retried on the next tick.
pub fn cmd_watch(pass: PassArgs, interval: u64, count: Option<u64>) -> Result<(), CliError> {
    if count == Some(0) {
        return Err(CliError::usage("--count must be at least 1"));
    }
    let config = load_config(pass.config.as_deref())?;

    let mut completed = 0u64;
    loop {
        match run_pass(&pass, &config) {
            Ok(result) => print_summary(&result),
            Err(err) if err.code == EXIT_NO_SOURCES || err.code == crate::exit_codes::EXIT_IO => {
                eprintln!("warning: {}", err.message);
            }
            Err(err) => return Err(err),
        }

        completed += 1;
        if count.is_some_and(|n| completed >= n) {
            return Ok(());
        }
        info!("next pass in {interval}s");
        std::thread::sleep(Duration::from_secs(interval));
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(config_path.as_path()))?;
    let patterns: Vec<String> = mapas_recon::SourceKind::ALL
        .iter()
        .map(|k| format!("{}={}", k.config_key(), config.sources.pattern(*k)))
        .collect();
    eprintln!("config OK: {}", config_path.display());
    eprintln!("  sources: {}", patterns.join(", "));
    eprintln!(
        "  auto-reopen columns: {:?}",
        config.timing_log.auto_reopen_columns
    );
    Ok(())
}
