//! Worker pools: a fixed worker set draining a bounded FIFO task queue.

mod executor;
mod job;

use std::fmt;

use serde::Serialize;

pub(crate) use executor::PoolExecutor;

pub use job::{JobHandle, JobId};

/// Process-lifetime unique identifier of a worker pool. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PoolId(pub(crate) u64);

impl PoolId {
    /// Returns the raw id value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What `submit` does when the task queue is at capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Fail immediately with `QueueFull`; nothing is enqueued.
    #[default]
    Reject,
    /// Suspend the submitter until queue space frees.
    Block,
}
