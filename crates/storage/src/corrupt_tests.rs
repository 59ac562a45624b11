// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn numbers_copies_upward() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("events.wal");

    std::fs::write(&path, "first").unwrap();
    let first = quarantine(&path).unwrap();
    std::fs::write(&path, "second").unwrap();
    let second = quarantine(&path).unwrap();

    assert_eq!(first, dir.path().join("events.wal.corrupt.1"));
    assert_eq!(second, dir.path().join("events.wal.corrupt.2"));
    assert!(!path.exists());
    assert_eq!(std::fs::read_to_string(second).unwrap(), "second");
}

#[test]
fn keeps_only_the_newest_copies() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snapshot.json");
    for i in 1..=5 {
        std::fs::write(&path, format!("corrupt {i}")).unwrap();
        quarantine(&path).unwrap();
    }

    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    names.sort();

    assert_eq!(names.len(), KEEP_CORRUPT);
    assert_eq!(
        names,
        vec![
            "snapshot.json.corrupt.3",
            "snapshot.json.corrupt.4",
            "snapshot.json.corrupt.5",
        ]
    );
}

#[test]
fn other_files_copies_are_left_alone() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("events.wal.corrupt.7"), "wal").unwrap();
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, "bad").unwrap();

    let moved = quarantine(&path).unwrap();

    assert_eq!(moved, dir.path().join("snapshot.json.corrupt.1"));
    assert!(dir.path().join("events.wal.corrupt.7").exists());
}
