// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Setting aside journal files that no longer parse

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Corrupt copies kept per file; older ones are deleted.
pub(crate) const KEEP_CORRUPT: usize = 3;

/// Move `path` to `<file>.corrupt.<n>` next to it, `n` one past the highest
/// existing copy, then prune all but the newest [`KEEP_CORRUPT`] copies.
///
/// Returns where the file went.
pub(crate) fn quarantine(path: &Path) -> io::Result<PathBuf> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let prefix = format!("{name}.corrupt.");

    let mut numbers: Vec<u64> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| entry.file_name().to_str()?.strip_prefix(&prefix)?.parse().ok())
        .collect();
    numbers.sort_unstable();

    let next = numbers.last().map_or(1, |n| n + 1);
    let target = dir.join(format!("{prefix}{next}"));
    fs::rename(path, &target)?;
    numbers.push(next);

    let excess = numbers.len().saturating_sub(KEEP_CORRUPT);
    for n in &numbers[..excess] {
        let old = dir.join(format!("{prefix}{n}"));
        if let Err(e) = fs::remove_file(&old) {
            warn!(path = %old.display(), error = %e, "failed to prune corrupt copy");
        }
    }
    Ok(target)
}

#[cfg(test)]
#[path = "corrupt_tests.rs"]
mod tests;
