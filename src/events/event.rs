//! # Lifecycle events emitted by the engine.
//!
//! [`EventKind`] classifies events across three categories:
//! - **Thread lifecycle**: creation, start, pause/resume, terminal states
//! - **Structure**: group and pool creation, pool shutdown, removals
//! - **Engine**: shutdown progress, isolated callback failures, observer
//!   delivery problems
//!
//! The [`Event`] struct carries metadata such as timestamps, the ids
//! involved, and a human-readable reason where applicable.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore order when events are consumed from
//! independent observer queues.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::pool::PoolId;
use crate::thread::{GroupId, ThreadId, ThreadStatus};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Thread lifecycle ===
    /// A managed thread was registered (status Pending).
    ThreadCreated,
    /// A managed thread transitioned Pending → Running.
    ThreadStarted,
    /// A pause request was accepted (Running → Waiting).
    ThreadPaused,
    /// A resume request was accepted (Waiting → Running).
    ThreadResumed,
    /// The work returned normally (→ Completed).
    ThreadCompleted,
    /// The work produced an error; `reason` carries it (→ Failed).
    ThreadFailed,
    /// A terminate request took effect (→ Terminated).
    ThreadTerminated,
    /// A terminal thread was dropped from the registry.
    ThreadRemoved,

    // === Structure ===
    /// A thread group was created.
    GroupCreated,
    /// A worker pool was created.
    PoolCreated,
    /// A worker pool finished shutting down.
    PoolShutdown,

    // === Engine ===
    /// Engine shutdown started.
    ShutdownRequested,
    /// Engine shutdown finished; the engine accepts no further work.
    EngineClosed,
    /// A topic event-bus callback failed; `reason` carries the details.
    CallbackFailed,
    /// An observer's queue was full or closed; the event was dropped
    /// for that observer only.
    ObserverOverflow,
    /// An observer panicked while handling an event.
    ObserverPanicked,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - the id and reason fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Thread the event concerns, if any.
    pub thread: Option<ThreadId>,
    /// Group the event concerns, if any.
    pub group: Option<GroupId>,
    /// Pool the event concerns, if any.
    pub pool: Option<PoolId>,
    /// Status recorded at emission time (thread lifecycle events).
    pub status: Option<ThreadStatus>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Observer name (observer delivery events).
    pub observer: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// the next global sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            thread: None,
            group: None,
            pool: None,
            status: None,
            reason: None,
            observer: None,
        }
    }

    /// Attaches a thread id.
    #[inline]
    pub fn with_thread(mut self, id: ThreadId) -> Self {
        self.thread = Some(id);
        self
    }

    /// Attaches a group id.
    #[inline]
    pub fn with_group(mut self, id: GroupId) -> Self {
        self.group = Some(id);
        self
    }

    /// Attaches a pool id.
    #[inline]
    pub fn with_pool(mut self, id: PoolId) -> Self {
        self.pool = Some(id);
        self
    }

    /// Attaches the thread status observed at emission time.
    #[inline]
    pub fn with_status(mut self, status: ThreadStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates an observer overflow event.
    #[inline]
    pub(crate) fn observer_overflow(observer: &'static str, detail: &'static str) -> Self {
        let mut ev = Event::new(EventKind::ObserverOverflow).with_reason(detail);
        ev.observer = Some(observer);
        ev
    }

    /// Creates an observer panic event.
    #[inline]
    pub(crate) fn observer_panicked(observer: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::ObserverPanicked).with_reason(info);
        ev.observer = Some(observer);
        ev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let a = Event::new(EventKind::ThreadCreated);
        let b = Event::new(EventKind::ThreadStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_attach_metadata() {
        let ev = Event::new(EventKind::ThreadFailed)
            .with_thread(ThreadId(4))
            .with_status(ThreadStatus::Failed)
            .with_reason("boom");
        assert_eq!(ev.thread, Some(ThreadId(4)));
        assert_eq!(ev.status, Some(ThreadStatus::Failed));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
    }
}
