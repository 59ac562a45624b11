// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable record of orchestrator transitions

use crate::error::JournalError;
use parking_lot::Mutex;
use std::sync::Arc;
use tfg_core::Event;
use tfg_storage::{MaterializedState, Wal};

/// Appends events to the WAL and applies them to the materialized state.
///
/// Both happen under the WAL lock, so the state never reflects an event
/// the WAL has not accepted and WAL order equals apply order.
#[derive(Clone)]
pub struct Journal {
    wal: Option<Arc<Mutex<Wal>>>,
    state: Arc<Mutex<MaterializedState>>,
}

impl Journal {
    pub fn new(wal: Arc<Mutex<Wal>>, state: Arc<Mutex<MaterializedState>>) -> Self {
        Self {
            wal: Some(wal),
            state,
        }
    }

    /// A journal that only keeps the materialized state.
    pub fn in_memory() -> Self {
        Self {
            wal: None,
            state: Arc::new(Mutex::new(MaterializedState::default())),
        }
    }

    pub fn record(&self, event: Event) -> Result<(), JournalError> {
        tracing::debug!(event = %event.log_summary(), "journal");
        match &self.wal {
            Some(wal) => {
                let mut wal = wal.lock();
                let seq = wal.append(&event)?;
                self.state.lock().apply_event(&event);
                wal.mark_processed(seq);
            }
            None => self.state.lock().apply_event(&event),
        }
        Ok(())
    }

    pub fn state(&self) -> Arc<Mutex<MaterializedState>> {
        Arc::clone(&self.state)
    }

    /// Run `f` against the current state.
    pub fn read<R>(&self, f: impl FnOnce(&MaterializedState) -> R) -> R {
        f(&self.state.lock())
    }
}

#[cfg(test)]
#[path = "journal_tests.rs"]
mod tests;
