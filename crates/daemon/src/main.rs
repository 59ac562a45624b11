// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terraform GitOps Daemon (tfgd)
//!
//! Accepts new-commit notifications and plan reviews over HTTP and drives
//! one deploy orchestrator per repository branch.
//!
//! Architecture:
//! - HTTP server: axum router translating requests into dispatcher signals
//! - Orchestrator instances: one tokio task per workflow, journaled to the WAL
//! - Background tasks: WAL group commit and periodic checkpoints

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use parking_lot::Mutex;
use tfg_daemon::lifecycle::{self, Config, LifecycleError};
use tfg_daemon::{http, DEFAULT_LISTEN};
use tfg_storage::{MaterializedState, Wal, FLUSH_INTERVAL};
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "tfgd",
    version,
    about = "Terraform GitOps daemon - plans and applies terraform for every new commit"
)]
struct Args {
    /// Address the HTTP server listens on
    #[arg(long, env = "TFG_LISTEN", default_value = DEFAULT_LISTEN)]
    listen: SocketAddr,

    /// Directory for repository working copies (default: <state>/repos)
    #[arg(long, env = "TFG_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Number of execution units sessions are pinned to
    #[arg(long, env = "TFG_SESSION_UNITS", default_value_t = 1)]
    session_units: usize,

    /// Sessions a single execution unit admits at once
    #[arg(long, env = "TFG_MAX_SESSIONS", default_value_t = 10)]
    max_sessions: usize,
}

impl Args {
    fn apply(self, config: &mut Config) {
        config.listen = self.listen;
        if let Some(data_dir) = self.data_dir {
            config.orchestrator.data_dir = data_dir;
        }
        config.orchestrator.sessions.units = self.session_units.max(1);
        config.orchestrator.sessions.max_concurrent_sessions = self.max_sessions.max(1);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = Config::load()?;
    args.apply(&mut config);

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    info!("Starting daemon");

    let mut daemon = match lifecycle::startup(&config) {
        Ok(daemon) => daemon,
        Err(LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path)
                .unwrap_or_default()
                .trim()
                .to_string();
            eprintln!("tfgd is already running");
            if !pid.is_empty() {
                eprintln!("  pid: {pid}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    spawn_flush_task(Arc::clone(&daemon.wal));
    spawn_checkpoint(
        Arc::clone(&daemon.wal),
        Arc::clone(&daemon.state),
        config.snapshot_path.clone(),
    );

    let listener = match TcpListener::bind(config.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            let e = LifecycleError::BindFailed(config.listen, e);
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            daemon.shutdown()?;
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
            _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
        }
    };

    info!("Daemon ready, listening on {}", config.listen);
    println!("READY");

    let app = http::router(daemon.dispatcher.clone());
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!("HTTP server error: {}", e);
    }

    daemon.shutdown()?;
    info!("Daemon stopped");
    Ok(())
}

/// Spawn a task that flushes buffered WAL entries (group commit).
fn spawn_flush_task(wal: Arc<Mutex<Wal>>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(FLUSH_INTERVAL);

        loop {
            interval.tick().await;

            let mut wal = wal.lock();
            if wal.needs_flush() {
                if let Err(e) = wal.flush() {
                    error!("Failed to flush WAL: {}", e);
                }
            }
        }
    });
}

/// Checkpoint interval (60 seconds)
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

/// Spawn a task that periodically saves snapshots and truncates the WAL.
fn spawn_checkpoint(
    wal: Arc<Mutex<Wal>>,
    state: Arc<Mutex<MaterializedState>>,
    snapshot_path: PathBuf,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CHECKPOINT_INTERVAL);
        // The first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            if let Err(e) = lifecycle::checkpoint(&wal, &state, &snapshot_path) {
                tracing::warn!(error = %e, "failed to checkpoint");
            }
        }
    });
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- tfgd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- tfgd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = config.log_path.parent().ok_or(LifecycleError::NoStateDir)?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(
        dir,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
