// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSONL journal write-ahead log with group commit.
//!
//! Orchestrator transitions are durably stored before the orchestrator
//! moves past them, so a restart can rebuild every instance via snapshot +
//! replay. Group commit batches writes (~10ms) to keep fsyncs cheap.
//!
//! Each entry is a single line of JSON: `{"seq":N,"event":{...}}\n`

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tfg_core::Event;
use thiserror::Error;
use tracing::warn;

/// Flush interval for group commit
pub const FLUSH_INTERVAL: Duration = Duration::from_millis(10);

/// Maximum entries to buffer before forcing flush
const FLUSH_THRESHOLD: usize = 100;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct WalRecordRef<'a> {
    seq: u64,
    event: &'a Event,
}

#[derive(Deserialize)]
struct WalRecord {
    seq: u64,
    event: Event,
}

/// A single WAL entry with sequence number
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// One parsed line of the file, kept as raw text so rewrites never
/// re-serialize.
struct RawLine {
    seq: u64,
    text: String,
    event: Event,
}

/// Result of reading the file front to back.
struct Scan {
    lines: Vec<RawLine>,
    /// Byte offset just past the last valid line
    end_offset: u64,
    /// A line failed to parse before EOF
    corrupt: bool,
}

/// JSONL WAL for durable journal storage with group commit.
///
/// Entries are buffered in memory and become durable on `flush()`; the
/// daemon calls it from a ~10ms ticker when `needs_flush()` says so.
pub struct Wal {
    file: File,
    path: PathBuf,
    /// Highest sequence number assigned
    write_seq: u64,
    /// Highest sequence number reflected in the last snapshot
    processed_seq: u64,
    write_buffer: Vec<Vec<u8>>,
    last_flush: Instant,
}

impl Wal {
    /// Open or create a WAL at the given path.
    ///
    /// `processed_seq` comes from the snapshot (or 0 without one). A file
    /// with a corrupt tail is quarantined and rewritten with only the
    /// entries before the corruption.
    pub fn open(path: &Path, processed_seq: u64) -> Result<Self, WalError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = Self::open_append(path)?;
        let scan = Self::scan(&file)?;

        if scan.corrupt {
            drop(file);
            let moved = crate::corrupt::quarantine(path)?;
            warn!(
                moved_to = %moved.display(),
                valid_entries = scan.lines.len(),
                "corrupt WAL tail, keeping the entries before it",
            );
            Self::write_lines(path, scan.lines.iter().map(|l| l.text.as_str()))?;
            file = Self::open_append(path)?;
        }

        let write_seq = scan.lines.iter().map(|l| l.seq).max().unwrap_or(0);

        Ok(Self {
            file,
            path: path.to_owned(),
            write_seq: write_seq.max(processed_seq),
            processed_seq,
            write_buffer: Vec::new(),
            last_flush: Instant::now(),
        })
    }

    fn open_append(path: &Path) -> Result<File, WalError> {
        Ok(OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?)
    }

    /// Write `lines` to `path` through a temp file and atomic rename.
    fn write_lines<'a>(path: &Path, lines: impl Iterator<Item = &'a str>) -> Result<(), WalError> {
        let tmp_path = path.with_extension("tmp");
        {
            let mut tmp = File::create(&tmp_path)?;
            for line in lines {
                tmp.write_all(line.as_bytes())?;
                tmp.write_all(b"\n")?;
            }
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Read every valid line, stopping at the first unparseable one.
    fn scan(file: &File) -> Result<Scan, WalError> {
        let mut reader = BufReader::new(file.try_clone()?);
        reader.seek(SeekFrom::Start(0))?;

        let mut lines = Vec::new();
        let mut offset = 0u64;
        let mut corrupt = false;
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(n) => n as u64,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    corrupt = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                offset += bytes_read;
                continue;
            }

            match serde_json::from_str::<WalRecord>(trimmed) {
                Ok(record) => lines.push(RawLine {
                    seq: record.seq,
                    text: trimmed.to_string(),
                    event: record.event,
                }),
                Err(e) => {
                    warn!(offset, error = %e, "Corrupt WAL entry, stopping at corruption point");
                    corrupt = true;
                    break;
                }
            }
            offset += bytes_read;
        }

        Ok(Scan {
            lines,
            end_offset: offset,
            corrupt,
        })
    }

    /// Append an event to the write buffer.
    ///
    /// Returns the assigned sequence number. The event is NOT durable until
    /// `flush()` is called.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        let seq = self.write_seq + 1;
        let json_bytes = serde_json::to_vec(&WalRecordRef { seq, event })?;
        self.write_seq = seq;
        self.write_buffer.push(json_bytes);
        Ok(seq)
    }

    /// Check if flush is needed (interval elapsed or buffer full).
    pub fn needs_flush(&self) -> bool {
        !self.write_buffer.is_empty()
            && (self.last_flush.elapsed() >= FLUSH_INTERVAL
                || self.write_buffer.len() >= FLUSH_THRESHOLD)
    }

    /// Flush all buffered entries to disk with a single fsync.
    pub fn flush(&mut self) -> Result<(), WalError> {
        if self.write_buffer.is_empty() {
            return Ok(());
        }

        let mut batch = Vec::new();
        for json_bytes in self.write_buffer.drain(..) {
            batch.extend_from_slice(&json_bytes);
            batch.push(b'\n');
        }
        self.file.write_all(&batch)?;
        self.file.sync_all()?;
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Record that everything up to `seq` is covered by a snapshot.
    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = self.processed_seq.max(seq);
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Drop entries with sequence numbers below `seq`.
    ///
    /// Called after a snapshot covering those entries is durable.
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), WalError> {
        self.flush()?;

        let scan = Self::scan(&self.file)?;
        Self::write_lines(
            &self.path,
            scan.lines
                .iter()
                .filter(|l| l.seq >= seq)
                .map(|l| l.text.as_str()),
        )?;
        self.file = Self::open_append(&self.path)?;
        Ok(())
    }

    /// All durable entries after the given sequence number.
    ///
    /// Used for recovery (replaying from snapshot). Buffered entries that
    /// were never flushed are not included.
    pub fn entries_after(&self, seq: u64) -> Result<Vec<WalEntry>, WalError> {
        let scan = Self::scan(&self.file)?;
        if scan.corrupt {
            warn!(
                end_offset = scan.end_offset,
                "Corrupt WAL entry during replay, stopping at corruption point",
            );
        }
        Ok(scan
            .lines
            .into_iter()
            .filter(|l| l.seq > seq)
            .map(|l| WalEntry {
                seq: l.seq,
                event: l.event,
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
