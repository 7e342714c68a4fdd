//! # Thread lifecycle states and priorities.
//!
//! [`ThreadStatus`] is the authoritative lifecycle state of a managed
//! thread. The legal moves are:
//!
//! ```text
//! Pending ──► Running ◄──► Waiting
//!               │  │
//!               │  └────► Completed | Failed
//!               ▼
//! (any non-terminal) ───► Terminated
//! ```
//!
//! Terminal states (Completed, Failed, Terminated) absorb: pause and
//! terminate on a terminal thread are no-ops, resume is rejected.

use std::fmt;

use serde::Serialize;

/// Lifecycle state of a managed thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadStatus {
    /// Registered but not yet picked up by its execution context.
    Pending,
    /// The work is executing.
    Running,
    /// A pause request is in effect; the work holds at its next checkpoint.
    Waiting,
    /// The work returned normally. Terminal.
    Completed,
    /// The work produced an error; the error is captured on the record.
    /// Terminal.
    Failed,
    /// A terminate request took effect. Terminal.
    Terminated,
}

impl ThreadStatus {
    /// Returns true for the absorbing states.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ThreadStatus::Completed | ThreadStatus::Failed | ThreadStatus::Terminated
        )
    }

    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            ThreadStatus::Pending => "pending",
            ThreadStatus::Running => "running",
            ThreadStatus::Waiting => "waiting",
            ThreadStatus::Completed => "completed",
            ThreadStatus::Failed => "failed",
            ThreadStatus::Terminated => "terminated",
        }
    }
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Scheduling priority recorded on a managed thread.
///
/// Priority is bookkeeping surfaced through snapshots; the engine does not
/// reorder execution contexts by it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Background work.
    Low,
    /// The default.
    #[default]
    Normal,
    /// Latency-sensitive work.
    High,
    /// Work that must be visibly flagged in dashboards.
    Critical,
}

impl Priority {
    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!ThreadStatus::Pending.is_terminal());
        assert!(!ThreadStatus::Running.is_terminal());
        assert!(!ThreadStatus::Waiting.is_terminal());
        assert!(ThreadStatus::Completed.is_terminal());
        assert!(ThreadStatus::Failed.is_terminal());
        assert!(ThreadStatus::Terminated.is_terminal());
    }

    #[test]
    fn priorities_order() {
        assert!(Priority::Low < Priority::Normal);
        assert!(Priority::High < Priority::Critical);
        assert_eq!(Priority::default(), Priority::Normal);
    }
}
