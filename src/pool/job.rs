//! # Pool jobs and their result handles.
//!
//! A submitted unit of work is paired with a [`JobHandle`]: a one-shot
//! future slot resolved exactly once — with the work's outcome after a
//! worker runs it, or with `Canceled` when a no-drain shutdown discards it
//! before any worker picked it up.

use std::fmt;

use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::TaskError;
use crate::work::WorkRef;

/// Pool-lifetime unique identifier of a submitted job. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct JobId(pub(crate) u64);

impl JobId {
    /// Returns the raw id value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Queue entry owned by exactly one worker once dequeued.
pub(crate) struct QueuedJob {
    pub(crate) work: WorkRef,
    pub(crate) done: oneshot::Sender<Result<(), TaskError>>,
}

/// Future handle for a submitted job.
///
/// Resolves `Ok(())` on success, `Err(TaskError::Fail)` when the work
/// errored (or panicked), and `Err(TaskError::Canceled)` when the job was
/// discarded from the queue by a no-drain shutdown.
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    rx: oneshot::Receiver<Result<(), TaskError>>,
}

impl JobHandle {
    /// Builds the queue entry and its paired handle.
    pub(crate) fn pair(id: JobId, work: WorkRef) -> (QueuedJob, JobHandle) {
        let (done, rx) = oneshot::channel();
        (QueuedJob { work, done }, JobHandle { id, rx })
    }

    /// Returns the job's id.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Waits for the job's outcome.
    pub async fn wait(self) -> Result<(), TaskError> {
        match self.rx.await {
            Ok(outcome) => outcome,
            // Resolver dropped without resolving; treat as cancellation.
            Err(_) => Err(TaskError::Canceled),
        }
    }
}
