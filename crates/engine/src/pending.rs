// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Last-write-wins revision mailbox

use parking_lot::Mutex;
use tfg_core::Revision;

/// Result of offering a revision to a mailbox
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Offer {
    /// Stored; `replaced` is the unconsumed revision it overwrote.
    Accepted { replaced: Option<Revision> },
    /// The owning instance has stopped taking revisions.
    Closed,
}

#[derive(Default)]
struct Slot {
    revision: Option<Revision>,
    closed: bool,
}

/// Holds at most one revision for an orchestrator instance.
///
/// The journal callbacks run while the slot is locked, so the journal sees
/// offers and takes in the same order the slot does. Once closed, a slot
/// never reopens.
#[derive(Default)]
pub(crate) struct PendingRevision {
    slot: Mutex<Slot>,
}

impl PendingRevision {
    pub(crate) fn new(revision: Option<Revision>) -> Self {
        Self {
            slot: Mutex::new(Slot {
                revision,
                closed: false,
            }),
        }
    }

    pub(crate) fn offer<E>(
        &self,
        revision: Revision,
        record: impl FnOnce(&Revision) -> Result<(), E>,
    ) -> Result<Offer, E> {
        let mut slot = self.slot.lock();
        if slot.closed {
            return Ok(Offer::Closed);
        }
        record(&revision)?;
        Ok(Offer::Accepted {
            replaced: slot.revision.replace(revision),
        })
    }

    /// Take the pending revision, or close the slot if there is none.
    pub(crate) fn take_or_close<E>(
        &self,
        on_take: impl FnOnce(&Revision) -> Result<(), E>,
        on_close: impl FnOnce() -> Result<(), E>,
    ) -> Result<Option<Revision>, E> {
        let mut slot = self.slot.lock();
        match slot.revision.take() {
            Some(revision) => {
                if let Err(e) = on_take(&revision) {
                    slot.revision = Some(revision);
                    return Err(e);
                }
                Ok(Some(revision))
            }
            None => {
                slot.closed = true;
                on_close()?;
                Ok(None)
            }
        }
    }

    /// Close the slot, dropping any pending revision. `on_close` runs only
    /// the first time.
    pub(crate) fn close<E>(&self, on_close: impl FnOnce() -> Result<(), E>) -> Result<(), E> {
        let mut slot = self.slot.lock();
        if slot.closed {
            return Ok(());
        }
        slot.closed = true;
        if let Some(dropped) = slot.revision.take() {
            tracing::warn!(revision = %dropped, "dropping pending revision");
        }
        on_close()
    }

    #[cfg(test)]
    pub(crate) fn peek(&self) -> Option<Revision> {
        self.slot.lock().revision.clone()
    }
}

#[cfg(test)]
#[path = "pending_tests.rs"]
mod tests;
