//! # Thread groups and bulk-operation reports.
//!
//! A group is pure bookkeeping over thread ids: a named set supporting
//! bulk pause/resume/terminate. Bulk operations never fail as a whole —
//! each member's outcome is collected into a [`GroupReport`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::RuntimeError;
use crate::thread::ThreadId;

/// Process-lifetime unique identifier of a thread group. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupId(pub(crate) u64);

impl GroupId {
    /// Returns the raw id value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named set of thread ids. Guarded by the engine's registry lock.
pub(crate) struct ThreadGroup {
    pub(crate) id: GroupId,
    pub(crate) name: Arc<str>,
    pub(crate) members: HashSet<ThreadId>,
}

impl ThreadGroup {
    pub(crate) fn new(id: GroupId, name: Arc<str>) -> Self {
        Self {
            id,
            name,
            members: HashSet::new(),
        }
    }
}

/// Outcome of a bulk operation for one group member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberOutcome {
    /// The member the operation was applied to.
    pub thread: ThreadId,
    /// `Ok` when the operation was accepted or was an idempotent no-op;
    /// otherwise the per-member error, swallowed rather than raised.
    pub result: Result<(), RuntimeError>,
}

/// Aggregated result of a bulk group operation.
///
/// Partial failures (e.g. one member already terminated) never abort the
/// sweep; they show up here instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    /// The group the operation targeted.
    pub group: GroupId,
    /// Per-member outcomes, in membership iteration order.
    pub outcomes: Vec<MemberOutcome>,
}

impl GroupReport {
    /// Number of members for which the operation was accepted.
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of members for which the operation was rejected.
    pub fn rejected(&self) -> usize {
        self.outcomes.len() - self.applied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread::ThreadStatus;

    #[test]
    fn report_counts_split_by_outcome() {
        let report = GroupReport {
            group: GroupId(1),
            outcomes: vec![
                MemberOutcome {
                    thread: ThreadId(1),
                    result: Ok(()),
                },
                MemberOutcome {
                    thread: ThreadId(2),
                    result: Err(RuntimeError::InvalidTransition {
                        id: 2,
                        from: ThreadStatus::Pending,
                        op: "pause",
                    }),
                },
            ],
        };
        assert_eq!(report.applied(), 1);
        assert_eq!(report.rejected(), 1);
    }

    #[test]
    fn membership_is_a_set() {
        let mut group = ThreadGroup::new(GroupId(1), Arc::from("workers"));
        assert!(group.members.insert(ThreadId(1)));
        assert!(!group.members.insert(ThreadId(1)));
        assert_eq!(group.members.len(), 1);
        assert!(!group.members.remove(&ThreadId(9)));
    }
}
