//! # Managed thread record and its state machine.
//!
//! [`ManagedThread`] wraps one concurrently-executing unit of work with
//! identity, status, priority, and cooperative pause/terminate control.
//! The record is owned by the engine registry; the running work only ever
//! sees the [`Checkpoint`] derived from it.
//!
//! ## Rules
//! - Control calls mutate status synchronously under the record's lock, so
//!   the new status is visible to snapshots before the call returns, even
//!   though the work itself reacts at its next checkpoint.
//! - Terminate always wins: it overrides a pending pause by cancelling the
//!   token the paused checkpoint is waiting on.
//! - Terminal states absorb; a late work result never overwrites them.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{RuntimeError, TaskError};
use crate::thread::{GroupId, Priority, ThreadStatus};
use crate::work::Checkpoint;

/// Process-lifetime unique identifier of a managed thread. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ThreadId(pub(crate) u64);

impl ThreadId {
    /// Returns the raw id value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable lifecycle state, guarded by the record's lock.
struct LifeState {
    status: ThreadStatus,
    created_at: SystemTime,
    started_at: Option<SystemTime>,
    ended_at: Option<SystemTime>,
    error: Option<String>,
    group: Option<GroupId>,
}

/// Copy of a record's lifecycle state taken under its lock.
pub(crate) struct LifeView {
    pub status: ThreadStatus,
    pub created_at: SystemTime,
    pub started_at: Option<SystemTime>,
    pub ended_at: Option<SystemTime>,
    pub error: Option<String>,
    pub group: Option<GroupId>,
}

/// One lifecycle-tracked concurrent unit of work.
pub(crate) struct ManagedThread {
    id: ThreadId,
    name: Arc<str>,
    priority: Priority,
    cancel: CancellationToken,
    pause: watch::Sender<bool>,
    state: Mutex<LifeState>,
}

impl ManagedThread {
    pub(crate) fn new(id: ThreadId, name: Arc<str>, priority: Priority) -> Arc<Self> {
        let (pause, _rx) = watch::channel(false);
        Arc::new(Self {
            id,
            name,
            priority,
            cancel: CancellationToken::new(),
            pause,
            state: Mutex::new(LifeState {
                status: ThreadStatus::Pending,
                created_at: SystemTime::now(),
                started_at: None,
                ended_at: None,
                error: None,
                group: None,
            }),
        })
    }

    pub(crate) fn id(&self) -> ThreadId {
        self.id
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub(crate) fn priority(&self) -> Priority {
        self.priority
    }

    pub(crate) fn status(&self) -> ThreadStatus {
        self.state.lock().status
    }

    pub(crate) fn group(&self) -> Option<GroupId> {
        self.state.lock().group
    }

    pub(crate) fn set_group(&self, group: Option<GroupId>) {
        self.state.lock().group = group;
    }

    /// Builds the control token handed to the running work.
    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(self.cancel.clone(), self.pause.subscribe())
    }

    /// Pending → Running. Returns false when the thread was terminated
    /// before its execution context picked it up.
    pub(crate) fn mark_running(&self) -> bool {
        let mut state = self.state.lock();
        if state.status != ThreadStatus::Pending {
            return false;
        }
        state.status = ThreadStatus::Running;
        state.started_at = Some(SystemTime::now());
        true
    }

    /// Records the work's outcome and returns the final status.
    ///
    /// A record already in a terminal state (terminated while the work was
    /// unwinding) keeps that state; the outcome is discarded.
    pub(crate) fn finish(&self, outcome: Result<(), TaskError>) -> ThreadStatus {
        let mut state = self.state.lock();
        if !state.status.is_terminal() {
            state.status = match outcome {
                Ok(()) => ThreadStatus::Completed,
                Err(TaskError::Canceled) => ThreadStatus::Terminated,
                Err(err) => {
                    state.error = Some(err.to_string());
                    ThreadStatus::Failed
                }
            };
        }
        if state.ended_at.is_none() {
            state.ended_at = Some(SystemTime::now());
        }
        state.status
    }

    /// Requests a pause.
    ///
    /// Returns `Ok(true)` when the request was accepted (Running → Waiting),
    /// `Ok(false)` for the idempotent no-ops (already Waiting, or terminal),
    /// and `InvalidTransition` for a thread that has not started yet.
    pub(crate) fn pause(&self) -> Result<bool, RuntimeError> {
        let mut state = self.state.lock();
        match state.status {
            ThreadStatus::Running => {
                state.status = ThreadStatus::Waiting;
                self.pause.send_replace(true);
                Ok(true)
            }
            ThreadStatus::Waiting => Ok(false),
            ThreadStatus::Pending => Err(RuntimeError::InvalidTransition {
                id: self.id.0,
                from: state.status,
                op: "pause",
            }),
            _ => Ok(false),
        }
    }

    /// Requests a resume. Legal only from Waiting.
    pub(crate) fn resume(&self) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        match state.status {
            ThreadStatus::Waiting => {
                state.status = ThreadStatus::Running;
                self.pause.send_replace(false);
                Ok(())
            }
            other => Err(RuntimeError::InvalidTransition {
                id: self.id.0,
                from: other,
                op: "resume",
            }),
        }
    }

    /// Requests termination.
    ///
    /// Returns true when the record transitioned; false for the idempotent
    /// no-op on an already-terminal thread. The cancel flag is set and the
    /// pause gate released, so a paused checkpoint wakes and observes the
    /// cancellation (terminate overrides a pending pause).
    pub(crate) fn terminate(&self) -> bool {
        let mut state = self.state.lock();
        if state.status.is_terminal() {
            return false;
        }
        state.status = ThreadStatus::Terminated;
        state.ended_at = Some(SystemTime::now());
        self.cancel.cancel();
        self.pause.send_replace(false);
        true
    }

    pub(crate) fn view(&self) -> LifeView {
        let state = self.state.lock();
        LifeView {
            status: state.status,
            created_at: state.created_at,
            started_at: state.started_at,
            ended_at: state.ended_at,
            error: state.error.clone(),
            group: state.group,
        }
    }
}
