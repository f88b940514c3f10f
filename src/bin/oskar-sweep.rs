// src/bin/oskar-sweep.rs

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use oskar_sweep::{core::sweep, models::MasterConfig};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Parameter-sweep driver for OSKAR simulation pipelines.
///
/// Reads a master sweep document, generates one INI config per enabled stage
/// and sweep combination, and invokes the simulator/calibration executables
/// with per-run logging.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to the master sweep document (YAML).
    config: PathBuf,

    /// Log and validate every command without launching anything,
    /// regardless of the document's `dry_run` setting.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "ERROR:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let contents = fs::read_to_string(&cli.config)
        .with_context(|| format!("Could not read sweep document '{}'", cli.config.display()))?;
    let mut master: MasterConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("Could not parse sweep document '{}'", cli.config.display()))?;

    if cli.dry_run {
        master.run_settings.dry_run = true;
    }

    // Input paths in the document are relative to the directory holding it,
    // which doubles as the project root.
    let project_root = dunce::canonicalize(&cli.config)
        .with_context(|| format!("Could not resolve '{}'", cli.config.display()))?
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    sweep::run_sweep(&master, &project_root);
    // Individual run failures are intentionally not reflected in the exit
    // status; the per-run logs carry them.
    Ok(())
}
