// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkpoints of the orchestrator state
//!
//! Each checkpoint writes the full `MaterializedState` with the WAL
//! sequence it covers, after which the WAL is truncated up to that point.
//! Startup loads the checkpoint and replays only the entries after it.

use crate::corrupt::quarantine;
use crate::MaterializedState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Layout of the snapshot file this build writes and reads.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] io::Error),
    #[error("snapshot encoding: {0}")]
    Json(#[from] serde_json::Error),
    /// The WAL behind a snapshot is truncated, so one this build cannot
    /// read is never skipped.
    #[error("snapshot {} has version {found}, expected {}", .path.display(), SNAPSHOT_VERSION)]
    Version { path: PathBuf, found: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Highest WAL sequence number reflected in `state`
    pub seq: u64,
    pub state: MaterializedState,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(seq: u64, state: MaterializedState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            seq,
            state,
            created_at: Utc::now(),
        }
    }

    /// Write to `<path>.tmp`, fsync, rename over `path`, then fsync the
    /// directory so the rename survives a crash.
    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = dir {
            fs::create_dir_all(dir)?;
        }

        let tmp_path = path.with_extension("tmp");
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        fs::rename(&tmp_path, path)?;

        if let Some(dir) = dir {
            File::open(dir)?.sync_all()?;
        }
        Ok(())
    }

    /// The snapshot at `path`, or `None` when there is none.
    ///
    /// A file that does not parse is quarantined and `None` returned, so
    /// startup replays the whole WAL instead.
    pub fn load(path: &Path) -> Result<Option<Self>, SnapshotError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot: Snapshot = match serde_json::from_reader(BufReader::new(file)) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let moved = quarantine(path)?;
                warn!(
                    error = %e,
                    moved_to = %moved.display(),
                    "unreadable snapshot, replaying the whole WAL",
                );
                return Ok(None);
            }
        };
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version {
                path: path.to_owned(),
                found: snapshot.version,
            });
        }

        info!(
            seq = snapshot.seq,
            workflows = snapshot.state.workflows.len(),
            "loaded snapshot"
        );
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
