//! # Process Runner
//!
//! Invokes one external executable for one sweep stage and appends a
//! structured trace to the run directory's `run.log` on every control-flow
//! exit: success, missing input, dry run, launch failure, non-zero exit, or
//! anything unexpected. The log is append-only, so the beam, interferometer
//! and calibration stages sharing one run directory accumulate a single
//! ordered trace.
//!
//! The preamble (timestamp, working directory, config path, exact command
//! line) is written before any execution attempt, and a timestamped closing
//! line is appended by a scope guard on every path. Writes of that closing
//! line are best-effort: a failing log must never take the sweep down with
//! it.

use chrono::Local;
use colored::Colorize;
use scopeguard::defer;
use std::borrow::Cow;
use std::fs::OpenOptions;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::constants;

/// One stage invocation: which program to run, from where, against what.
#[derive(Debug, Clone)]
pub struct StageRequest<'a> {
    /// Operator-facing name, e.g. "OSKAR beam pattern simulation".
    pub label: &'a str,
    pub executable: &'a str,
    /// Arguments after the executable itself.
    pub args: Vec<String>,
    /// Working directory for the process; also holds `run.log`.
    pub run_dir: &'a Path,
    /// When set, the file must exist before anything is launched. The
    /// calibration stage passes `None`: it has no generated config to check.
    pub config_file: Option<&'a Path>,
    pub dry_run: bool,
}

/// The closed set of ways a stage invocation can end.
#[derive(Debug)]
pub enum StageOutcome {
    /// The declared config file was missing; nothing was launched.
    InputMissing,
    /// Dry-run mode: validated and logged, nothing launched.
    DryRun,
    /// The process ran to completion (successfully or not).
    Executed {
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The executable could not be found or started.
    LaunchFailed(io::Error),
    /// Any other failure during launch or logging.
    UnexpectedError(io::Error),
}

impl StageOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            Self::DryRun => true,
            Self::Executed { exit_code, .. } => *exit_code == Some(0),
            _ => false,
        }
    }
}

/// Seam for process launching, so tests can count launches without spawning.
pub trait Launcher {
    fn launch(&self, executable: &str, args: &[String], cwd: &Path) -> io::Result<Output>;
}

/// The real launcher: blocking, stdio fully captured rather than inherited.
#[derive(Debug, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&self, executable: &str, args: &[String], cwd: &Path) -> io::Result<Output> {
        Command::new(executable)
            .args(args)
            .current_dir(dunce::simplified(cwd))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
    }
}

/// Append-only handle on a run directory's `run.log`.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(run_dir: &Path) -> Self {
        Self {
            path: run_dir.join(constants::RUN_LOG_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `text`, creating the file on first use.
    pub fn append(&self, text: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())
    }

    /// Appends `text` and discards any failure. Used where logging is
    /// secondary to an outcome already being reported, and must not be
    /// allowed to escalate.
    pub fn append_or_discard(&self, text: &str) {
        if let Err(e) = self.append(text) {
            log::debug!("Discarding run-log write failure for {}: {e}", self.path.display());
        }
    }
}

/// Runs one stage with the real system launcher.
pub fn run_stage(request: &StageRequest<'_>) -> bool {
    run_stage_with(request, &SystemLauncher)
}

/// Runs one stage, reporting to console and run log. Returns the stage's
/// boolean result; no failure here ever propagates as an error, so the
/// surrounding sweep always continues.
pub fn run_stage_with(request: &StageRequest<'_>, launcher: &dyn Launcher) -> bool {
    let run_log = RunLog::new(request.run_dir);
    defer! {
        run_log.append_or_discard(&format!(
            "--- Logging for this attempt concluded at {} ---\n\n",
            timestamp()
        ));
    }
    let outcome = execute(request, launcher, &run_log);
    report(request, &run_log, &outcome)
}

fn execute(
    request: &StageRequest<'_>,
    launcher: &dyn Launcher,
    run_log: &RunLog,
) -> StageOutcome {
    // The preamble goes in on every branch, so a post-mortem always sees
    // what was (or would have been) attempted.
    if let Err(e) = run_log.append(&preamble(request)) {
        return StageOutcome::UnexpectedError(e);
    }

    if let Some(config_file) = request.config_file {
        if !config_file.exists() {
            run_log.append_or_discard(&format!(
                "ERROR: {} config file not found at {}\n--- Not Started ---\n\n",
                request.label,
                config_file.display()
            ));
            return StageOutcome::InputMissing;
        }
    }

    if request.dry_run {
        run_log.append_or_discard("[DRY RUN] Command not executed.\n--- Dry Run Concluded ---\n\n");
        return StageOutcome::DryRun;
    }

    match launcher.launch(request.executable, &request.args, request.run_dir) {
        Ok(output) => {
            let exit_code = output.status.code();
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

            let mut entry = String::new();
            match exit_code {
                Some(code) => entry.push_str(&format!("Exit Code: {code}\n\n")),
                None => entry.push_str("Exit Code: <terminated by signal>\n\n"),
            }
            entry.push_str("--- Stdout ---\n");
            entry.push_str(if stdout.trim().is_empty() { "<No stdout>\n" } else { &stdout });
            entry.push_str("\n--- Stderr ---\n");
            entry.push_str(if stderr.trim().is_empty() { "<No stderr>\n" } else { &stderr });
            if output.status.success() {
                entry.push_str(&format!("\n--- {} Successful ---\n", request.label));
            } else {
                entry.push_str(&format!(
                    "\n!!! ERROR: {} Failed (Exit Code: {}) !!!\n",
                    request.label,
                    exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string())
                ));
            }
            run_log.append_or_discard(&entry);

            StageOutcome::Executed {
                exit_code,
                stdout,
                stderr,
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            run_log.append_or_discard(&format!(
                "!!! FATAL ERROR: Executable '{}' not found !!!\n--- Not Started ---\n\n",
                request.executable
            ));
            StageOutcome::LaunchFailed(e)
        }
        Err(e) => {
            run_log.append_or_discard(&format!(
                "!!! UNEXPECTED FATAL ERROR: {e} !!!\n--- State Unknown ---\n\n"
            ));
            StageOutcome::UnexpectedError(e)
        }
    }
}

/// Console reporting for each terminal state. Full captured output is
/// surfaced directly on a failed execution; on success it stays in the log.
fn report(request: &StageRequest<'_>, run_log: &RunLog, outcome: &StageOutcome) -> bool {
    match outcome {
        StageOutcome::InputMissing => {
            let path = request
                .config_file
                .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());
            println!(
                "    {} {} config file not found at {}",
                "ERROR:".red().bold(),
                request.label,
                path
            );
        }
        StageOutcome::DryRun => {
            println!(
                "    {} Would execute: {} (from CWD: {})",
                "[DRY RUN]".cyan().bold(),
                command_display(request),
                request.run_dir.display()
            );
        }
        StageOutcome::Executed {
            exit_code,
            stdout,
            stderr,
        } => {
            if outcome.is_success() {
                println!("    {} finished successfully.", request.label.green());
                if !stdout.trim().is_empty() || !stderr.trim().is_empty() {
                    println!("      (output logged to {})", run_log.path().display());
                }
            } else {
                println!(
                    "    {} {} failed with exit code {}.",
                    "ERROR:".red().bold(),
                    request.label,
                    exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string())
                );
                if !stdout.trim().is_empty() {
                    println!("    Stdout from error:\n{stdout}");
                }
                if !stderr.trim().is_empty() {
                    println!("    Stderr from error:\n{stderr}");
                }
            }
        }
        StageOutcome::LaunchFailed(_) => {
            println!(
                "    {} Executable '{}' not found. Please check your PATH or configuration.",
                "ERROR:".red().bold(),
                request.executable
            );
        }
        StageOutcome::UnexpectedError(e) => {
            println!(
                "    {} An unexpected error occurred while running {}: {e}",
                "ERROR:".red().bold(),
                request.label
            );
        }
    }
    outcome.is_success()
}

fn preamble(request: &StageRequest<'_>) -> String {
    let cwd = dunce::canonicalize(request.run_dir)
        .unwrap_or_else(|_| request.run_dir.to_path_buf());
    let mut out = format!(
        "--- Attempting {} at {} ---\nRun Directory (CWD): {}\n",
        request.label,
        timestamp(),
        cwd.display()
    );
    if let Some(config_file) = request.config_file {
        out.push_str(&format!("Config File: {}\n", config_file.display()));
    }
    out.push_str(&format!(
        "Command to be executed in CWD: {}\n\n",
        command_display(request)
    ));
    out
}

/// Shell-quoted display form of the full command line.
fn command_display(request: &StageRequest<'_>) -> String {
    std::iter::once(request.executable)
        .chain(request.args.iter().map(String::as_str))
        .map(|token| {
            shlex::try_quote(token)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| token.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn timestamp() -> String {
    Local::now().format(constants::LOG_TIME_FORMAT).to_string()
}
