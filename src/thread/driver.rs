//! # Drives one unit of work on its own execution context.
//!
//! Spawns the record's work onto the runtime, applies the
//! Pending → Running transition, and reports the terminal outcome back
//! into the record and onto the event stream.
//!
//! ## Rules
//! - A record terminated before pickup never runs its work.
//! - Panics are caught and captured as failures; nothing unwinds into the
//!   runtime.
//! - Exactly one terminal event is published per driven thread.

use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;

use crate::error::{panic_message, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::thread::{ManagedThread, ThreadStatus};
use crate::work::WorkRef;

/// Spawns the driver for `thread` and returns its join handle.
///
/// Must be called within a tokio runtime.
pub(crate) fn spawn(thread: Arc<ManagedThread>, work: WorkRef, bus: Bus) -> JoinHandle<()> {
    tokio::spawn(async move {
        if !thread.mark_running() {
            // Terminated between registration and pickup; the terminate
            // call already published the event.
            return;
        }
        bus.publish(
            Event::new(EventKind::ThreadStarted)
                .with_thread(thread.id())
                .with_status(ThreadStatus::Running),
        );

        let ctx = thread.checkpoint();
        let outcome = match std::panic::AssertUnwindSafe(work.run(ctx)).catch_unwind().await {
            Ok(res) => res,
            Err(payload) => Err(TaskError::fail(panic_message(payload))),
        };

        let error = match &outcome {
            Err(err @ TaskError::Fail { .. }) => Some(err.to_string()),
            _ => None,
        };
        let status = thread.finish(outcome);
        let kind = match status {
            ThreadStatus::Completed => EventKind::ThreadCompleted,
            ThreadStatus::Failed => EventKind::ThreadFailed,
            ThreadStatus::Terminated => EventKind::ThreadTerminated,
            // finish() only returns terminal states
            _ => return,
        };

        let mut ev = Event::new(kind).with_thread(thread.id()).with_status(status);
        if let Some(error) = error {
            ev = ev.with_reason(error);
        }
        bus.publish(ev);
    })
}
