// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, checkpoint, shutdown, recovery.

use std::fs::File;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use parking_lot::Mutex;
use tfg_adapters::{
    Activities, GithubClient, GithubCredentials, ProviderRegistry, RegistryError, ShellActivities,
    TracedActivities, VcsError,
};
use tfg_core::{IdGen, UuidIdGen};
use tfg_engine::{Dispatcher, Journal, OrchestratorConfig};
use tfg_storage::{MaterializedState, Snapshot, Wal};
use thiserror::Error;
use tracing::{info, warn};

use crate::env;

/// Name the GitHub client is registered under
pub const GITHUB_PROVIDER: &str = "github";

pub const DEFAULT_LISTEN: &str = "127.0.0.1:4141";

/// Activities used by the real daemon (wrapped with tracing)
pub type DaemonActivities = TracedActivities<ShellActivities>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/tfg)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to WAL file
    pub wal_path: PathBuf,
    /// Path to snapshot file
    pub snapshot_path: PathBuf,
    /// Address the HTTP front door binds
    pub listen: SocketAddr,
    pub github_api: String,
    pub github: GithubCredentials,
    /// Working copies, timeouts and session pool sizing
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Uses fixed paths under `~/.local/state/tfg/` (or `$XDG_STATE_HOME/tfg/`).
    pub fn load() -> Result<Self, LifecycleError> {
        let mut config = Self::under(env::state_dir()?);
        config.github_api = env::github_api();
        config.github = env::github_credentials();
        Ok(config)
    }

    /// Default layout rooted at `state_dir`, without reading the environment.
    pub fn under(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            wal_path: state_dir.join("wal").join("events.wal"),
            snapshot_path: state_dir.join("snapshot.json"),
            listen: SocketAddr::from(([127, 0, 0, 1], 4141)),
            github_api: tfg_adapters::DEFAULT_GITHUB_API.to_string(),
            github: GithubCredentials::default(),
            orchestrator: OrchestratorConfig::new(state_dir.join("repos")),
            state_dir,
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind {0}: {1}")]
    BindFailed(SocketAddr, std::io::Error),

    #[error("WAL error: {0}")]
    Wal(#[from] tfg_storage::WalError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] tfg_storage::SnapshotError),

    #[error("VCS provider error: {0}")]
    Vcs(#[from] VcsError),

    #[error("VCS registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state during operation.
pub struct DaemonState<A, I = UuidIdGen> {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub state: Arc<Mutex<MaterializedState>>,
    pub wal: Arc<Mutex<Wal>>,
    pub dispatcher: Dispatcher<A, I>,
    pub start_time: Instant,
}

/// Build the production activity stack: GitHub resolution, git, terraform.
pub fn activities(config: &Config) -> Result<DaemonActivities, LifecycleError> {
    let github = GithubClient::new(config.github_api.clone(), config.github.clone())?;
    let mut providers = ProviderRegistry::new();
    providers.register(GITHUB_PROVIDER, Arc::new(github))?;
    Ok(TracedActivities::new(ShellActivities::new(
        providers,
        GITHUB_PROVIDER,
    )))
}

/// Start the daemon with the production activities.
///
/// Must be called inside a tokio runtime.
pub fn startup(config: &Config) -> Result<DaemonState<DaemonActivities>, LifecycleError> {
    let activities = activities(config)?;
    startup_with(config, activities, UuidIdGen)
}

/// Acquire the lock, rebuild state from snapshot + WAL, and resume every
/// workflow the journal still shows as running.
pub fn startup_with<A: Activities, I: IdGen>(
    config: &Config,
    activities: A,
    ids: I,
) -> Result<DaemonState<A, I>, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents two daemons sharing one WAL.
    // Open without truncating so a running daemon's PID survives a failed attempt.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // 3. Create directories
    if let Some(parent) = config.wal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::create_dir_all(&config.orchestrator.data_dir)?;

    // 4. Load state from snapshot (if exists) and replay WAL
    let (mut state, processed_seq) = match Snapshot::load(&config.snapshot_path)? {
        Some(snapshot) => {
            info!(
                "Loaded snapshot at seq {}: {} workflows",
                snapshot.seq,
                snapshot.state.workflows.len()
            );
            (snapshot.state, snapshot.seq)
        }
        None => {
            info!("No snapshot found, starting with empty state");
            (MaterializedState::default(), 0)
        }
    };

    let mut wal = Wal::open(&config.wal_path, processed_seq)?;
    let entries = wal.entries_after(processed_seq)?;
    let replay_count = entries.len();
    for entry in entries {
        state.apply_event(&entry.event);
        wal.mark_processed(entry.seq);
    }
    if replay_count > 0 {
        info!(
            "Replayed {} events from WAL after seq {}",
            replay_count, processed_seq
        );
    }
    info!(
        "Recovered state: {} workflows, {} running",
        state.workflows.len(),
        state.running().count()
    );

    // 5. Wire the journal and dispatcher, then resume interrupted workflows
    let state = Arc::new(Mutex::new(state));
    let wal = Arc::new(Mutex::new(wal));
    let journal = Journal::new(Arc::clone(&wal), Arc::clone(&state));
    let dispatcher = Dispatcher::new(activities, journal, config.orchestrator.clone(), ids);
    let resumed = dispatcher.recover();
    if resumed > 0 {
        info!("Resumed {} running workflows", resumed);
    }

    Ok(DaemonState {
        config: config.clone(),
        lock_file,
        state,
        wal,
        dispatcher,
        start_time: Instant::now(),
    })
}

impl<A: Activities, I: IdGen> DaemonState<A, I> {
    /// Save a snapshot of the current state and drop the WAL entries it covers.
    ///
    /// Returns the snapshot sequence number, or `None` when nothing has been
    /// journaled yet.
    pub fn checkpoint(&self) -> Result<Option<u64>, LifecycleError> {
        checkpoint(&self.wal, &self.state, &self.config.snapshot_path)
    }

    /// Shutdown the daemon gracefully.
    ///
    /// Running workflows are stopped without an outcome; the next startup
    /// resumes them from the journal.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // 0. Stop instances so nothing journals after the final snapshot
        self.dispatcher.shutdown();

        // 1. Flush buffered WAL events and save final snapshot
        if let Err(e) = self.wal.lock().flush() {
            warn!("Failed to flush WAL on shutdown: {}", e);
        }
        match self.checkpoint() {
            Ok(Some(seq)) => info!(seq, "saved final shutdown snapshot"),
            Ok(None) => {}
            Err(e) => warn!("Failed to save shutdown snapshot: {}", e),
        }

        // 2. Remove PID file; the lock itself is released when lock_file drops
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Snapshot `state` at the WAL's processed sequence and truncate the WAL.
///
/// Takes the WAL lock before the state lock, matching the journal.
pub fn checkpoint(
    wal: &Mutex<Wal>,
    state: &Mutex<MaterializedState>,
    snapshot_path: &std::path::Path,
) -> Result<Option<u64>, LifecycleError> {
    let (state_clone, processed_seq) = {
        let mut wal = wal.lock();
        wal.flush()?;
        let state = state.lock();
        (state.clone(), wal.processed_seq())
    };

    if processed_seq == 0 {
        return Ok(None);
    }

    Snapshot::new(processed_seq, state_clone).save(snapshot_path)?;
    tracing::debug!(seq = processed_seq, "saved checkpoint snapshot");
    wal.lock().truncate_before(processed_seq)?;
    Ok(Some(processed_seq))
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
