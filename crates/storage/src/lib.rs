// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable journal storage for orchestrator instances

mod corrupt;
mod snapshot;
mod state;
mod wal;

pub use snapshot::{Snapshot, SnapshotError, SNAPSHOT_VERSION};
pub use state::{AttemptRecord, MaterializedState, WorkflowRecord};
pub use wal::{Wal, WalEntry, WalError, FLUSH_INTERVAL};
