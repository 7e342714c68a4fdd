//! # Point-in-time views of the engine's registries.
//!
//! [`Snapshot`] is the structured record consumed by dashboards and other
//! external layers. It is assembled under the registry's shared lock and
//! contains only copies — holding a snapshot never blocks the engine.
//!
//! All types serialize with serde; [`Snapshot::to_json`] and the engine's
//! session-log dump build on that. Timestamps are epoch milliseconds for
//! straightforward charting.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::pool::{OverflowPolicy, PoolExecutor, PoolId};
use crate::thread::{GroupId, ManagedThread, Priority, ThreadId, ThreadStatus};

pub(crate) fn epoch_ms(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Consistent point-in-time view of threads, groups, pools, and metrics.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// When the snapshot was taken (epoch ms).
    pub taken_at_ms: u64,
    /// All registered threads, ordered by id.
    pub threads: Vec<ThreadInfo>,
    /// All groups, ordered by id.
    pub groups: Vec<GroupInfo>,
    /// All pools, ordered by id.
    pub pools: Vec<PoolInfo>,
    /// Aggregated counters and the sampler-fed resource history.
    pub metrics: EngineMetrics,
}

impl Snapshot {
    /// Serializes the snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// One thread's registry record, copied at snapshot time.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadInfo {
    pub id: ThreadId,
    pub name: String,
    pub priority: Priority,
    pub status: ThreadStatus,
    pub group: Option<GroupId>,
    pub created_at_ms: u64,
    pub started_at_ms: Option<u64>,
    pub ended_at_ms: Option<u64>,
    /// Wall-clock runtime: start → end, or start → now while running.
    pub runtime_ms: u64,
    /// Captured work error, for Failed threads.
    pub error: Option<String>,
}

pub(crate) fn thread_info(record: &ManagedThread) -> ThreadInfo {
    let view = record.view();
    let runtime_ms = match view.started_at {
        Some(started) => {
            let end = view.ended_at.unwrap_or_else(SystemTime::now);
            end.duration_since(started).unwrap_or_default().as_millis() as u64
        }
        None => 0,
    };
    ThreadInfo {
        id: record.id(),
        name: record.name().to_string(),
        priority: record.priority(),
        status: view.status,
        group: view.group,
        created_at_ms: epoch_ms(view.created_at),
        started_at_ms: view.started_at.map(epoch_ms),
        ended_at_ms: view.ended_at.map(epoch_ms),
        runtime_ms,
        error: view.error,
    }
}

/// One group's membership, copied at snapshot time.
#[derive(Debug, Clone, Serialize)]
pub struct GroupInfo {
    pub id: GroupId,
    pub name: String,
    /// Member ids, sorted.
    pub members: Vec<ThreadId>,
}

/// One pool's counters, copied at snapshot time.
#[derive(Debug, Clone, Serialize)]
pub struct PoolInfo {
    pub id: PoolId,
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub policy: OverflowPolicy,
    /// Jobs queued but not yet picked up.
    pub queued: usize,
    pub submitted: u64,
    pub completed: u64,
    pub closed: bool,
}

pub(crate) fn pool_info(pool: &PoolExecutor) -> PoolInfo {
    PoolInfo {
        id: pool.id(),
        worker_count: pool.worker_count(),
        queue_capacity: pool.queue_capacity(),
        policy: pool.policy(),
        queued: pool.queued(),
        submitted: pool.submitted(),
        completed: pool.completed(),
        closed: pool.is_closed(),
    }
}

/// Thread totals broken down by lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub running: usize,
    pub waiting: usize,
    pub completed: usize,
    pub failed: usize,
    pub terminated: usize,
}

impl StatusCounts {
    pub(crate) fn bump(&mut self, status: ThreadStatus) {
        match status {
            ThreadStatus::Pending => self.pending += 1,
            ThreadStatus::Running => self.running += 1,
            ThreadStatus::Waiting => self.waiting += 1,
            ThreadStatus::Completed => self.completed += 1,
            ThreadStatus::Failed => self.failed += 1,
            ThreadStatus::Terminated => self.terminated += 1,
        }
    }

    /// Total across all states.
    pub fn total(&self) -> usize {
        self.pending + self.running + self.waiting + self.completed + self.failed + self.terminated
    }
}

/// Aggregated engine counters plus the resource-sample history.
#[derive(Debug, Clone, Serialize)]
pub struct EngineMetrics {
    pub threads: StatusCounts,
    pub groups: usize,
    pub pools: usize,
    pub semaphores: usize,
    pub barriers: usize,
    pub event_buses: usize,
    /// Most recent sampler-fed CPU/memory samples, oldest first.
    pub samples: Vec<ResourceSample>,
}

/// One CPU/memory sample pushed by the external resource sampler.
///
/// The engine never reads hardware state itself; samples arrive through
/// [`Engine::record_sample`](crate::Engine::record_sample).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceSample {
    /// When the sample was taken (epoch ms).
    pub at_ms: u64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

impl ResourceSample {
    /// Builds a sample stamped with the current wall-clock time.
    pub fn now(cpu_percent: f64, memory_percent: f64) -> Self {
        Self {
            at_ms: epoch_ms(SystemTime::now()),
            cpu_percent,
            memory_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_counts_total() {
        let mut counts = StatusCounts::default();
        counts.bump(ThreadStatus::Running);
        counts.bump(ThreadStatus::Running);
        counts.bump(ThreadStatus::Failed);
        assert_eq!(counts.running, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let snapshot = Snapshot {
            taken_at_ms: 1,
            threads: Vec::new(),
            groups: Vec::new(),
            pools: Vec::new(),
            metrics: EngineMetrics {
                threads: StatusCounts::default(),
                groups: 0,
                pools: 0,
                semaphores: 0,
                barriers: 0,
                event_buses: 0,
                samples: vec![ResourceSample {
                    at_ms: 1,
                    cpu_percent: 12.5,
                    memory_percent: 40.0,
                }],
            },
        };
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"cpu_percent\": 12.5"));
        assert!(json.contains("\"taken_at_ms\": 1"));
    }
}
