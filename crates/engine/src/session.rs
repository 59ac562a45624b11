// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pinned execution sessions
//!
//! Activities run on execution units: long-lived tasks that each own an
//! activity executor. A session pins one deploy attempt to one unit, so
//! clone, init, plan and apply all run where the working directory lives.

use crate::error::SessionError;
use crate::executor::ActivityExecutor;
use parking_lot::Mutex;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tfg_adapters::{Activities, ActivityError};
use tfg_core::{
    ActivityKind, ApplyRequest, CloneRequest, InitRequest, PlanArtifact, PlanRequest, SessionId,
};
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Number of execution units
    pub units: usize,
    /// Sessions a single unit admits at once
    pub max_concurrent_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            units: 1,
            max_concurrent_sessions: 10,
        }
    }
}

/// Counters of session lifecycle calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub acquired: u64,
    pub released: u64,
}

#[derive(Default)]
struct Counters {
    acquired: AtomicU64,
    released: AtomicU64,
    next_id: AtomicU64,
}

type Reply<T> = oneshot::Sender<Result<T, ActivityError>>;

enum UnitCall {
    Clone(CloneRequest, Reply<PathBuf>),
    Init(InitRequest, Reply<String>),
    Plan(PlanRequest, Reply<PlanArtifact>),
    Apply(ApplyRequest, Reply<String>),
}

struct Unit {
    index: usize,
    tx: mpsc::UnboundedSender<UnitCall>,
    capacity: Arc<Semaphore>,
    calls: Arc<AtomicU64>,
}

/// Hands out sessions over a fixed pool of execution units.
#[derive(Clone)]
pub struct SessionManager {
    units: Arc<Vec<Unit>>,
    counters: Arc<Counters>,
}

impl SessionManager {
    /// Start the execution units. Must be called inside a tokio runtime.
    pub fn new<A: Activities>(executor: ActivityExecutor<A>, config: SessionConfig) -> Self {
        let units = (0..config.units.max(1))
            .map(|index| {
                let (tx, rx) = mpsc::unbounded_channel();
                let calls = Arc::new(AtomicU64::new(0));
                tokio::spawn(unit_loop(index, executor.clone(), rx, Arc::clone(&calls)));
                Unit {
                    index,
                    tx,
                    capacity: Arc::new(Semaphore::new(config.max_concurrent_sessions.max(1))),
                    calls,
                }
            })
            .collect();
        Self {
            units: Arc::new(units),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Pin a new session to the unit with the most free capacity.
    ///
    /// Waits at most `creation_timeout` for that unit to admit it.
    /// `execution_timeout` bounds the total time spent inside activity
    /// calls made through the session.
    pub async fn acquire(
        &self,
        creation_timeout: Duration,
        execution_timeout: Duration,
    ) -> Result<Session, SessionError> {
        let unit = self
            .units
            .iter()
            .max_by_key(|u| (u.capacity.available_permits(), std::cmp::Reverse(u.index)))
            .ok_or(SessionError::UnitStopped(0))?;

        let permit =
            match tokio::time::timeout(creation_timeout, Arc::clone(&unit.capacity).acquire_owned())
                .await
            {
                Ok(Ok(permit)) => permit,
                Ok(Err(_closed)) => return Err(SessionError::UnitStopped(unit.index)),
                Err(_elapsed) => return Err(SessionError::CreationTimeout(creation_timeout)),
            };

        let n = self.counters.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        let id = SessionId::new(format!("session-{}", n));
        tracing::debug!(session = %id, unit = unit.index, "session acquired");

        Ok(Session {
            id,
            unit: unit.index,
            tx: unit.tx.clone(),
            execution_timeout,
            spent: Mutex::new(Duration::ZERO),
            permit: Some(permit),
            counters: Arc::clone(&self.counters),
        })
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            acquired: self.counters.acquired.load(Ordering::SeqCst),
            released: self.counters.released.load(Ordering::SeqCst),
        }
    }

    /// Activity calls received by each unit, by unit index
    pub fn unit_calls(&self) -> Vec<u64> {
        self.units
            .iter()
            .map(|u| u.calls.load(Ordering::SeqCst))
            .collect()
    }
}

async fn unit_loop<A: Activities>(
    index: usize,
    executor: ActivityExecutor<A>,
    mut rx: mpsc::UnboundedReceiver<UnitCall>,
    calls: Arc<AtomicU64>,
) {
    while let Some(call) = rx.recv().await {
        calls.fetch_add(1, Ordering::SeqCst);
        let executor = executor.clone();
        tokio::spawn(async move {
            match call {
                UnitCall::Clone(req, reply) => answer(reply, executor.clone_repository(req)).await,
                UnitCall::Init(req, reply) => answer(reply, executor.terraform_init(req)).await,
                UnitCall::Plan(req, reply) => answer(reply, executor.terraform_plan(req)).await,
                UnitCall::Apply(req, reply) => answer(reply, executor.terraform_apply(req)).await,
            }
        });
    }
    tracing::debug!(unit = index, "execution unit stopped");
}

/// Run `work` unless the caller stops waiting for it first.
async fn answer<T>(mut reply: Reply<T>, work: impl Future<Output = Result<T, ActivityError>>) {
    let result = tokio::select! {
        result = work => result,
        _ = reply.closed() => return,
    };
    let _ = reply.send(result);
}

/// One pinned session. Released explicitly or on drop.
pub struct Session {
    id: SessionId,
    unit: usize,
    tx: mpsc::UnboundedSender<UnitCall>,
    execution_timeout: Duration,
    spent: Mutex<Duration>,
    permit: Option<OwnedSemaphorePermit>,
    counters: Arc<Counters>,
}

impl Session {
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Index of the execution unit this session is pinned to
    pub fn unit(&self) -> usize {
        self.unit
    }

    pub fn is_released(&self) -> bool {
        self.permit.is_none()
    }

    pub async fn clone_repository(&self, req: CloneRequest) -> Result<PathBuf, SessionError> {
        self.call(ActivityKind::Clone, |reply| UnitCall::Clone(req, reply))
            .await
    }

    pub async fn terraform_init(&self, req: InitRequest) -> Result<String, SessionError> {
        self.call(ActivityKind::Init, |reply| UnitCall::Init(req, reply))
            .await
    }

    pub async fn terraform_plan(&self, req: PlanRequest) -> Result<PlanArtifact, SessionError> {
        self.call(ActivityKind::Plan, |reply| UnitCall::Plan(req, reply))
            .await
    }

    pub async fn terraform_apply(&self, req: ApplyRequest) -> Result<String, SessionError> {
        self.call(ActivityKind::Apply, |reply| UnitCall::Apply(req, reply))
            .await
    }

    async fn call<T>(
        &self,
        kind: ActivityKind,
        make: impl FnOnce(Reply<T>) -> UnitCall,
    ) -> Result<T, SessionError> {
        if self.is_released() {
            return Err(SessionError::Released);
        }
        let remaining = self.execution_timeout.saturating_sub(*self.spent.lock());
        if remaining.is_zero() {
            return Err(SessionError::ExecutionTimeout(self.execution_timeout));
        }

        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| SessionError::UnitStopped(self.unit))?;

        let start = Instant::now();
        let result = tokio::time::timeout(remaining, rx).await;
        *self.spent.lock() += start.elapsed();

        match result {
            Err(_elapsed) => {
                tracing::error!(session = %self.id, activity = %kind, "session execution timeout");
                Err(SessionError::ExecutionTimeout(self.execution_timeout))
            }
            Ok(Err(_dropped)) => Err(SessionError::UnitStopped(self.unit)),
            Ok(Ok(result)) => result.map_err(|source| SessionError::Activity { kind, source }),
        }
    }

    /// Return the session's capacity to its unit. Idempotent.
    pub fn release(&mut self) {
        if let Some(permit) = self.permit.take() {
            drop(permit);
            self.counters.released.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(session = %self.id, unit = self.unit, "session released");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
