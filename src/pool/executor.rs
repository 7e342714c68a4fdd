//! # Fixed-size worker pool draining a bounded FIFO queue.
//!
//! [`PoolExecutor`] spawns `worker_count` workers at creation; the set
//! never grows or shrinks. Submissions enqueue on a bounded MPMC channel;
//! every queued job is received by exactly one worker, in submission
//! order, and once dequeued runs to completion with its outcome (success,
//! captured failure, or captured panic) resolved into the job's handle.
//!
//! ## Overflow
//! [`OverflowPolicy::Reject`] fails a submission to a full queue with
//! `QueueFull` immediately, without blocking or enqueuing.
//! [`OverflowPolicy::Block`] suspends the submitter until space frees.
//!
//! ## Shutdown
//! `shutdown(drain)` stops further submissions (`PoolClosed`). With
//! `drain`, workers finish everything queued; without it, still-queued
//! jobs resolve `Canceled` and only in-flight jobs finish. Idempotent.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{panic_message, RuntimeError, TaskError};
use crate::pool::job::{JobHandle, JobId, QueuedJob};
use crate::pool::{OverflowPolicy, PoolId};
use crate::work::{Checkpoint, WorkRef};

/// Fixed worker set over a bounded FIFO task queue.
pub(crate) struct PoolExecutor {
    id: PoolId,
    worker_count: usize,
    queue_capacity: usize,
    policy: OverflowPolicy,
    tx: async_channel::Sender<QueuedJob>,
    rx: async_channel::Receiver<QueuedJob>,
    closed: AtomicBool,
    submitted: AtomicU64,
    completed: Arc<AtomicU64>,
    next_job: AtomicU64,
    // Fires on no-drain shutdown: workers stop pulling queued jobs.
    stop: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl PoolExecutor {
    /// Creates the pool and spawns its workers.
    ///
    /// Must be called within a tokio runtime. `worker_count` and
    /// `queue_capacity` are clamped to a minimum of 1.
    pub(crate) fn new(
        id: PoolId,
        worker_count: usize,
        queue_capacity: usize,
        policy: OverflowPolicy,
    ) -> Arc<Self> {
        let worker_count = worker_count.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (tx, rx) = async_channel::bounded::<QueuedJob>(queue_capacity);
        let completed = Arc::new(AtomicU64::new(0));
        let stop = CancellationToken::new();

        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            workers.push(tokio::spawn(worker_loop(
                rx.clone(),
                Arc::clone(&completed),
                stop.clone(),
            )));
        }

        Arc::new(Self {
            id,
            worker_count,
            queue_capacity,
            policy,
            tx,
            rx,
            closed: AtomicBool::new(false),
            submitted: AtomicU64::new(0),
            completed,
            next_job: AtomicU64::new(0),
            stop,
            workers: Mutex::new(workers),
        })
    }

    /// Enqueues work according to the pool's overflow policy.
    pub(crate) async fn submit(&self, work: WorkRef) -> Result<JobHandle, RuntimeError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RuntimeError::PoolClosed);
        }
        let id = JobId(self.next_job.fetch_add(1, Ordering::Relaxed));
        let (job, handle) = JobHandle::pair(id, work);

        match self.policy {
            OverflowPolicy::Reject => self.tx.try_send(job).map_err(|err| match err {
                async_channel::TrySendError::Full(_) => RuntimeError::QueueFull,
                async_channel::TrySendError::Closed(_) => RuntimeError::PoolClosed,
            })?,
            OverflowPolicy::Block => self
                .tx
                .send(job)
                .await
                .map_err(|_| RuntimeError::PoolClosed)?,
        }

        self.submitted.fetch_add(1, Ordering::Relaxed);
        Ok(handle)
    }

    /// Shuts the pool down. Idempotent; returns false on repeat calls.
    ///
    /// With `drain`, queued jobs are finished before workers stop. Without
    /// it, workers stop pulling from the queue and still-queued jobs
    /// resolve `Canceled`; in-flight jobs finish either way — cancellation
    /// of started work is never forced.
    pub(crate) async fn shutdown(&self, drain: bool) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.tx.close();

        if !drain {
            // Stop the workers first so a freed worker cannot race the
            // drain below for a job that must resolve Canceled.
            self.stop.cancel();
            // Every job drained here was never picked up by a worker.
            while let Ok(job) = self.rx.try_recv() {
                let _ = job.done.send(Err(TaskError::Canceled));
            }
        }

        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        true
    }

    pub(crate) fn id(&self) -> PoolId {
        self.id
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub(crate) fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub(crate) fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Number of jobs currently queued (not yet picked up).
    pub(crate) fn queued(&self) -> usize {
        self.rx.len()
    }

    pub(crate) fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub(crate) fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// One worker: dequeue in FIFO order, run to completion, resolve, repeat.
///
/// `stop` fires on no-drain shutdown. A closed non-empty channel still
/// yields its buffered jobs, so the worker must not keep receiving past
/// that point — it finishes the job it already holds and exits; whatever
/// is left in the queue is drain-cancelled by `shutdown`.
async fn worker_loop(
    rx: async_channel::Receiver<QueuedJob>,
    completed: Arc<AtomicU64>,
    stop: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            recv = rx.recv() => match recv {
                Ok(job) => job,
                Err(_) => break,
            },
        };
        let ctx = Checkpoint::unpaused(CancellationToken::new());
        let outcome = match std::panic::AssertUnwindSafe(job.work.run(ctx))
            .catch_unwind()
            .await
        {
            Ok(res) => res,
            Err(payload) => Err(TaskError::fail(panic_message(payload))),
        };
        completed.fetch_add(1, Ordering::Relaxed);
        let _ = job.done.send(outcome);
    }
}
