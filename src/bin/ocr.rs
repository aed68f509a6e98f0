//! OCR - Live progress for Open Code Review sessions
//!
//! Watches `.ocr/sessions/` in the current project and keeps the terminal
//! updated with the progress of the running review or map workflow.
//!
//! # Usage
//!
//! ```text
//! ocr progress                      # Follow the newest active session
//! ocr progress --session <name>     # Pin one session
//! ocr progress --workflow map       # Force the map view
//! ```

use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use ocr_core::strategy::now_ms;
use ocr_core::{StrategyRegistry, WorkflowKind};
use ocr_progress::{FrameRenderer, Monitor, OcrPaths, ProgressConfig, ProgressError};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// CLI Arguments
// ============================================================================

/// Open Code Review command line
#[derive(Parser, Debug)]
#[command(name = "ocr")]
#[command(about = "Open Code Review tools")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch real-time progress of a code review or map session
    Progress {
        /// Specify session name
        #[arg(long, short = 's')]
        session: Option<String>,

        /// Specify workflow type (review or map)
        #[arg(long, short = 'w')]
        workflow: Option<WorkflowKind>,
    },
}

// ============================================================================
// Logging
// ============================================================================

fn log_dir() -> PathBuf {
    dirs::state_dir().unwrap_or_else(env::temp_dir).join("ocr")
}

fn create_log_file() -> Option<fs::File> {
    let log_dir = log_dir();
    if fs::create_dir_all(&log_dir).is_err() {
        return None;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("progress.log"))
        .ok()
}

/// Logs go to a file: anything on stderr would tear the live region.
fn init_logging() -> Result<()> {
    match create_log_file() {
        Some(file) => {
            let filter = EnvFilter::from_default_env()
                .add_directive("ocr=info".parse()?)
                .add_directive("ocr_core=info".parse()?)
                .add_directive("ocr_progress=info".parse()?);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("off"))
                .init();
        }
    }
    Ok(())
}

// ============================================================================
// Error Output
// ============================================================================

fn print_setup_missing(err: &ProgressError) {
    println!();
    println!("{}", format!("  ✗ {err}").red().bold());
    println!();
    if let Some(hint) = err.hint() {
        println!("{}", format!("  {hint}").dim());
    }
    println!();
    println!("{}", "  To set up OCR, run:".dim());
    println!();
    println!("{}", "    ocr init".white());
    println!();
    println!("{}", "  Or with npx:".dim());
    println!();
    println!("{}", "    npx @open-code-review/cli init".white());
    println!();
}

fn print_error(err: &ProgressError) {
    println!("{}", err.to_string().red());
    if let Some(hint) = err.hint() {
        println!("{}", hint.dim());
    }
}

// ============================================================================
// Progress Command
// ============================================================================

/// Creates the sessions directory and loads `.ocr/progress.toml`.
fn prepare(paths: &OcrPaths) -> ocr_progress::Result<(PathBuf, ProgressConfig)> {
    let sessions_dir = paths.ensure_sessions_dir()?.to_path_buf();
    let config = ProgressConfig::load(&paths.config_file())?;
    Ok((sessions_dir, config))
}

fn progress(session: Option<String>, workflow: Option<WorkflowKind>) -> Result<ExitCode> {
    let root = env::current_dir().context("Failed to resolve the current directory")?;
    let paths = OcrPaths::new(root);

    if let Err(e) = paths.require_setup() {
        warn!(root = %paths.root.display(), "OCR not set up");
        print_setup_missing(&e);
        return Ok(ExitCode::FAILURE);
    }

    let (sessions_dir, config) = match prepare(&paths) {
        Ok(prepared) => prepared,
        Err(e) => {
            error!(error = %e, "Failed to prepare progress viewer");
            print_error(&e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let registry = StrategyRegistry::with_defaults();
    let monitor = match session {
        Some(name) => match Monitor::pinned(sessions_dir, &name, workflow, registry, now_ms()) {
            Ok(monitor) => monitor,
            Err(e) => {
                info!(session = %name, error = %e, "Cannot track session");
                print_error(&e);
                return Ok(ExitCode::FAILURE);
            }
        },
        None => Monitor::auto(sessions_dir, workflow, registry),
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;
    runtime.block_on(watch(monitor, config))?;

    Ok(ExitCode::SUCCESS)
}

async fn watch(monitor: Monitor, config: ProgressConfig) -> Result<()> {
    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let mut renderer = FrameRenderer::stdout();
    ocr_progress::run(monitor, &mut renderer, config, cancel_token)
        .await
        .context("Progress display failed")?;

    info!("OCR progress stopped");
    Ok(())
}

async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_logging()?;

    info!(version = env!("CARGO_PKG_VERSION"), "OCR starting");

    match args.command {
        Command::Progress { session, workflow } => progress(session, workflow),
    }
}
