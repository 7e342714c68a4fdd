//! # Simple logging observer for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [created] thread=0 name=crunch
//! [started] thread=0
//! [paused] thread=0
//! [terminated] thread=0
//! [failed] thread=1 err="execution failed: boom"
//! [pool-created] pool=0
//! [engine-closed]
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::observers::Observe;

/// Simple stdout logging observer.
///
/// Enabled via the `logging` feature. Not intended for production use —
/// implement a custom [`Observe`] for structured logging or metrics.
pub struct LogWriter;

#[async_trait]
impl Observe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ThreadCreated => {
                println!("[created] thread={:?} name={:?}", e.thread, e.reason);
            }
            EventKind::ThreadStarted => println!("[started] thread={:?}", e.thread),
            EventKind::ThreadPaused => println!("[paused] thread={:?}", e.thread),
            EventKind::ThreadResumed => println!("[resumed] thread={:?}", e.thread),
            EventKind::ThreadCompleted => println!("[completed] thread={:?}", e.thread),
            EventKind::ThreadFailed => {
                println!("[failed] thread={:?} err={:?}", e.thread, e.reason);
            }
            EventKind::ThreadTerminated => println!("[terminated] thread={:?}", e.thread),
            EventKind::ThreadRemoved => println!("[removed] thread={:?}", e.thread),
            EventKind::GroupCreated => println!("[group-created] group={:?}", e.group),
            EventKind::PoolCreated => println!("[pool-created] pool={:?}", e.pool),
            EventKind::PoolShutdown => println!("[pool-shutdown] pool={:?}", e.pool),
            EventKind::ShutdownRequested => println!("[shutdown-requested]"),
            EventKind::EngineClosed => println!("[engine-closed]"),
            EventKind::CallbackFailed => println!("[callback-failed] {:?}", e.reason),
            EventKind::ObserverOverflow => {
                println!("[observer-overflow] observer={:?}", e.observer);
            }
            EventKind::ObserverPanicked => {
                println!("[observer-panicked] observer={:?} info={:?}", e.observer, e.reason);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
