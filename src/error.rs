//! Error types used by the threadvisor engine and units of work.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`] — structural errors returned synchronously by the
//!   control API (unknown ids, illegal lifecycle moves, full queues).
//! - [`TaskError`] — errors produced by the work itself; captured on the
//!   thread record or job handle, never unwound through control calls.
//!
//! Both types provide `as_label()` for logs/metrics. [`CallbackError`] is
//! the error type surfaced by topic event-bus callbacks; failed callbacks
//! are reported through the engine's event stream, not raised.

use thiserror::Error;

use crate::thread::ThreadStatus;

/// # Structural errors returned by the control API.
///
/// These represent misuse of the engine surface, not failures of the work
/// being coordinated. They are always returned synchronously to the caller.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// No registered resource with the given id.
    #[error("no {resource} with id {id}")]
    NotFound {
        /// Resource kind, e.g. `"thread"`, `"group"`, `"pool"`.
        resource: &'static str,
        /// The id that failed to resolve.
        id: u64,
    },

    /// The requested lifecycle move is illegal from the current status.
    #[error("cannot {op} thread {id} while {from}")]
    InvalidTransition {
        /// Thread the operation targeted.
        id: u64,
        /// Status the thread was in when the operation was rejected.
        from: ThreadStatus,
        /// The rejected operation, e.g. `"resume"`.
        op: &'static str,
    },

    /// Bounded task queue rejected a submission under the `Reject` policy.
    #[error("task queue is at capacity")]
    QueueFull,

    /// Submission after the pool was shut down.
    #[error("pool is shut down")]
    PoolClosed,

    /// The engine (or an engine-owned primitive) was shut down.
    #[error("engine is shut down")]
    EngineClosed,
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::NotFound { .. } => "not_found",
            RuntimeError::InvalidTransition { .. } => "invalid_transition",
            RuntimeError::QueueFull => "queue_full",
            RuntimeError::PoolClosed => "pool_closed",
            RuntimeError::EngineClosed => "engine_closed",
        }
    }
}

/// # Errors produced by executing a unit of work.
///
/// Captured into the owning thread record or resolved through the pool's
/// [`JobHandle`](crate::pool::JobHandle); control calls never observe them
/// as propagated errors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The work produced an error (or panicked; the panic text is captured).
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The work was cancelled cooperatively before completing.
    #[error("cancelled before completion")]
    Canceled,
}

impl TaskError {
    /// Convenience constructor for [`TaskError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        TaskError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Fail { .. } => "task_failed",
            TaskError::Canceled => "task_canceled",
        }
    }
}

/// Error returned by a topic event-bus callback.
///
/// A failing callback is isolated: it never prevents delivery to remaining
/// subscribers. The failure is collected into a
/// [`CallbackFailure`](crate::sync::CallbackFailure) record instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct CallbackError(pub String);

impl CallbackError {
    /// Creates a callback error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        CallbackError(message.into())
    }
}

/// Extracts a human-readable message from a caught panic payload.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable() {
        let err = RuntimeError::NotFound {
            resource: "thread",
            id: 7,
        };
        assert_eq!(err.as_label(), "not_found");
        assert_eq!(err.to_string(), "no thread with id 7");

        assert_eq!(RuntimeError::QueueFull.as_label(), "queue_full");
        assert_eq!(TaskError::Canceled.as_label(), "task_canceled");
        assert_eq!(TaskError::fail("boom").as_label(), "task_failed");
    }

    #[test]
    fn invalid_transition_names_the_operation() {
        let err = RuntimeError::InvalidTransition {
            id: 3,
            from: ThreadStatus::Running,
            op: "resume",
        };
        assert_eq!(err.to_string(), "cannot resume thread 3 while running");
    }
}
