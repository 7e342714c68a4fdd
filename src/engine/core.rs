//! # Engine: the registry and sole authority for ids and teardown.
//!
//! The engine owns every managed thread, group, pool, and engine-created
//! primitive. Structural mutations (create/remove/transition bookkeeping)
//! happen under a single registry lock with O(1)-or-copy critical
//! sections; user-level work never runs under it. Each primitive carries
//! its own independent lock, never nested inside the registry lock.
//!
//! ## Control flow
//! ```text
//! clients ──► Engine ──► registries (under RwLock) ──► handles/ids
//!                │
//!                ├─► spawn_driver(thread)     (independent contexts)
//!                ├─► PoolExecutor workers     (independent contexts)
//!                └─► Bus ──► ObserverSet      (lifecycle events out)
//! ```
//!
//! Status transitions are applied to the registry record synchronously —
//! a `pause()` is visible to `snapshot()` before the call returns, even
//! though the running work reacts at its next checkpoint.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};

use crate::config::EngineConfig;
use crate::engine::builder::EngineBuilder;
use crate::engine::snapshot::{
    epoch_ms, pool_info, thread_info, EngineMetrics, GroupInfo, ResourceSample, Snapshot,
    StatusCounts,
};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::observers::ObserverSet;
use crate::pool::{JobHandle, OverflowPolicy, PoolExecutor, PoolId};
use crate::sync::{Barrier, EventBus, Semaphore};
use crate::thread::{
    spawn_driver, GroupId, GroupReport, ManagedThread, MemberOutcome, Priority, ThreadGroup,
    ThreadId, ThreadStatus,
};
use crate::work::WorkRef;

/// Registries guarded by the engine's single coarse lock.
#[derive(Default)]
struct Registry {
    threads: HashMap<ThreadId, Arc<ManagedThread>>,
    groups: HashMap<GroupId, ThreadGroup>,
    pools: HashMap<PoolId, Arc<PoolExecutor>>,
    semaphores: Vec<Arc<Semaphore>>,
    barriers: Vec<Arc<Barrier>>,
    event_buses: Vec<Arc<EventBus>>,
}

/// Bulk operations applied across a group's membership.
#[derive(Clone, Copy)]
enum GroupOp {
    Pause,
    Resume,
    Terminate,
}

/// Top-level coordinator: creation, lookup, control, and global teardown.
///
/// Construct one per process (or per test) via [`Engine::builder`] and
/// shut it down explicitly — there is no global singleton and no implicit
/// teardown. All constructors that spawn execution contexts must run
/// within a tokio runtime.
pub struct Engine {
    cfg: EngineConfig,
    bus: Bus,
    // Kept alive for the lifetime of the engine; workers drain and exit
    // when the engine (and with it the fan-out channels) drops.
    _observers: Arc<ObserverSet>,
    registry: RwLock<Registry>,
    samples: Mutex<VecDeque<ResourceSample>>,
    next_thread: AtomicU64,
    next_group: AtomicU64,
    next_pool: AtomicU64,
    closed: AtomicBool,
}

impl Engine {
    /// Starts building an engine with the given configuration.
    pub fn builder(cfg: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(cfg)
    }

    /// Builds an engine with the given configuration and no observers.
    pub fn new(cfg: EngineConfig) -> Arc<Self> {
        Engine::builder(cfg).build()
    }

    pub(crate) fn new_internal(cfg: EngineConfig, bus: Bus, observers: Arc<ObserverSet>) -> Self {
        Self {
            cfg,
            bus,
            _observers: observers,
            registry: RwLock::new(Registry::default()),
            samples: Mutex::new(VecDeque::new()),
            next_thread: AtomicU64::new(0),
            next_group: AtomicU64::new(0),
            next_pool: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// The engine's lifecycle event stream.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// True once [`Engine::shutdown`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), RuntimeError> {
        if self.is_closed() {
            Err(RuntimeError::EngineClosed)
        } else {
            Ok(())
        }
    }

    // ---------------------------
    // Threads
    // ---------------------------

    /// Registers a new managed thread and starts it immediately.
    ///
    /// The record starts Pending and transitions to Running as soon as its
    /// execution context picks it up; the id is returned without waiting.
    pub fn create_thread(
        &self,
        work: WorkRef,
        name: impl Into<Arc<str>>,
        priority: Priority,
    ) -> Result<ThreadId, RuntimeError> {
        self.ensure_open()?;
        let id = ThreadId(self.next_thread.fetch_add(1, Ordering::Relaxed));
        let record = ManagedThread::new(id, name.into(), priority);
        self.registry
            .write()
            .threads
            .insert(id, Arc::clone(&record));

        self.bus.publish(
            Event::new(EventKind::ThreadCreated)
                .with_thread(id)
                .with_status(ThreadStatus::Pending)
                .with_reason(Arc::clone(record.name())),
        );
        spawn_driver(record, work, self.bus.clone());
        Ok(id)
    }

    /// Registers a thread with the configured default priority.
    ///
    /// Shorthand for [`Engine::create_thread`] with
    /// [`EngineConfig::default_priority`](crate::EngineConfig).
    pub fn create_thread_default(
        &self,
        work: WorkRef,
        name: impl Into<Arc<str>>,
    ) -> Result<ThreadId, RuntimeError> {
        self.create_thread(work, name, self.cfg.default_priority)
    }

    /// Returns the thread's current lifecycle status.
    pub fn status(&self, id: ThreadId) -> Result<ThreadStatus, RuntimeError> {
        Ok(self.thread(id)?.status())
    }

    /// Requests a cooperative pause (Running → Waiting).
    ///
    /// The status change is visible to snapshots immediately; the work
    /// holds at its next checkpoint. Pausing a Waiting or terminal thread
    /// is a no-op; pausing a Pending thread is an `InvalidTransition`.
    pub fn pause(&self, id: ThreadId) -> Result<(), RuntimeError> {
        let record = self.thread(id)?;
        if record.pause()? {
            self.bus.publish(
                Event::new(EventKind::ThreadPaused)
                    .with_thread(id)
                    .with_status(ThreadStatus::Waiting),
            );
        }
        Ok(())
    }

    /// Resumes a Waiting thread. Any other status is an `InvalidTransition`.
    pub fn resume(&self, id: ThreadId) -> Result<(), RuntimeError> {
        let record = self.thread(id)?;
        record.resume()?;
        self.bus.publish(
            Event::new(EventKind::ThreadResumed)
                .with_thread(id)
                .with_status(ThreadStatus::Running),
        );
        Ok(())
    }

    /// Requests cooperative termination. Idempotent on terminal threads.
    ///
    /// Overrides a pending pause; the work observes its cancel flag at the
    /// next checkpoint.
    pub fn terminate(&self, id: ThreadId) -> Result<(), RuntimeError> {
        let record = self.thread(id)?;
        if record.terminate() {
            self.bus.publish(
                Event::new(EventKind::ThreadTerminated)
                    .with_thread(id)
                    .with_status(ThreadStatus::Terminated),
            );
        }
        Ok(())
    }

    /// Ids of all threads currently in `status`, sorted.
    pub fn threads_by_status(&self, status: ThreadStatus) -> Vec<ThreadId> {
        let reg = self.registry.read();
        let mut ids: Vec<ThreadId> = reg
            .threads
            .iter()
            .filter(|(_, record)| record.status() == status)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Drops terminal threads from the registry (and their groups).
    ///
    /// Returns how many records were removed. Live references held by the
    /// still-running drivers stay valid; only the registry forgets them.
    pub fn cleanup_finished(&self) -> usize {
        let removed: Vec<ThreadId> = {
            let mut reg = self.registry.write();
            let ids: Vec<ThreadId> = reg
                .threads
                .iter()
                .filter(|(_, record)| record.status().is_terminal())
                .map(|(id, _)| *id)
                .collect();
            for id in &ids {
                if let Some(record) = reg.threads.remove(id) {
                    if let Some(group) = record.group() {
                        if let Some(group) = reg.groups.get_mut(&group) {
                            group.members.remove(id);
                        }
                    }
                }
            }
            ids
        };
        for id in &removed {
            self.bus
                .publish(Event::new(EventKind::ThreadRemoved).with_thread(*id));
        }
        removed.len()
    }

    fn thread(&self, id: ThreadId) -> Result<Arc<ManagedThread>, RuntimeError> {
        self.registry
            .read()
            .threads
            .get(&id)
            .cloned()
            .ok_or(RuntimeError::NotFound {
                resource: "thread",
                id: id.0,
            })
    }

    // ---------------------------
    // Groups
    // ---------------------------

    /// Creates an empty named group.
    pub fn create_group(&self, name: impl Into<Arc<str>>) -> Result<GroupId, RuntimeError> {
        self.ensure_open()?;
        let id = GroupId(self.next_group.fetch_add(1, Ordering::Relaxed));
        self.registry
            .write()
            .groups
            .insert(id, ThreadGroup::new(id, name.into()));
        self.bus
            .publish(Event::new(EventKind::GroupCreated).with_group(id));
        Ok(id)
    }

    /// Adds a thread to a group.
    ///
    /// Membership is a set: adding an existing member is a no-op. A thread
    /// belongs to at most one group — adding it to another group moves it.
    pub fn add_to_group(&self, group: GroupId, thread: ThreadId) -> Result<(), RuntimeError> {
        let mut reg = self.registry.write();
        if !reg.groups.contains_key(&group) {
            return Err(RuntimeError::NotFound {
                resource: "group",
                id: group.0,
            });
        }
        let record = reg
            .threads
            .get(&thread)
            .cloned()
            .ok_or(RuntimeError::NotFound {
                resource: "thread",
                id: thread.0,
            })?;

        let previous = record.group();
        if previous == Some(group) {
            return Ok(());
        }
        if let Some(previous) = previous {
            if let Some(old) = reg.groups.get_mut(&previous) {
                old.members.remove(&thread);
            }
        }
        if let Some(target) = reg.groups.get_mut(&group) {
            target.members.insert(thread);
        }
        record.set_group(Some(group));
        Ok(())
    }

    /// Removes a thread from a group. Removing a non-member is a no-op.
    pub fn remove_from_group(&self, group: GroupId, thread: ThreadId) -> Result<(), RuntimeError> {
        let mut reg = self.registry.write();
        let entry = reg.groups.get_mut(&group).ok_or(RuntimeError::NotFound {
            resource: "group",
            id: group.0,
        })?;
        if !entry.members.remove(&thread) {
            return Ok(());
        }
        if let Some(record) = reg.threads.get(&thread) {
            record.set_group(None);
        }
        Ok(())
    }

    /// Member ids of a group, sorted.
    pub fn group_members(&self, group: GroupId) -> Result<Vec<ThreadId>, RuntimeError> {
        let reg = self.registry.read();
        let entry = reg.groups.get(&group).ok_or(RuntimeError::NotFound {
            resource: "group",
            id: group.0,
        })?;
        let mut members: Vec<ThreadId> = entry.members.iter().copied().collect();
        members.sort_unstable();
        Ok(members)
    }

    /// Terminates every current member, collecting per-member outcomes.
    pub fn terminate_group(&self, group: GroupId) -> Result<GroupReport, RuntimeError> {
        self.apply_group(group, GroupOp::Terminate)
    }

    /// Pauses every current member, collecting per-member outcomes.
    pub fn pause_group(&self, group: GroupId) -> Result<GroupReport, RuntimeError> {
        self.apply_group(group, GroupOp::Pause)
    }

    /// Resumes every current member, collecting per-member outcomes.
    pub fn resume_group(&self, group: GroupId) -> Result<GroupReport, RuntimeError> {
        self.apply_group(group, GroupOp::Resume)
    }

    fn apply_group(&self, group: GroupId, op: GroupOp) -> Result<GroupReport, RuntimeError> {
        // Snapshot the membership, then operate outside the registry lock.
        let members: Vec<Arc<ManagedThread>> = {
            let reg = self.registry.read();
            let entry = reg.groups.get(&group).ok_or(RuntimeError::NotFound {
                resource: "group",
                id: group.0,
            })?;
            let mut ids: Vec<ThreadId> = entry.members.iter().copied().collect();
            ids.sort_unstable();
            ids.iter()
                .filter_map(|id| reg.threads.get(id).cloned())
                .collect()
        };

        let mut outcomes = Vec::with_capacity(members.len());
        for record in members {
            let id = record.id();
            let result = match op {
                GroupOp::Pause => record.pause().map(|accepted| {
                    if accepted {
                        self.bus.publish(
                            Event::new(EventKind::ThreadPaused)
                                .with_thread(id)
                                .with_group(group)
                                .with_status(ThreadStatus::Waiting),
                        );
                    }
                }),
                GroupOp::Resume => record.resume().map(|()| {
                    self.bus.publish(
                        Event::new(EventKind::ThreadResumed)
                            .with_thread(id)
                            .with_group(group)
                            .with_status(ThreadStatus::Running),
                    );
                }),
                GroupOp::Terminate => {
                    if record.terminate() {
                        self.bus.publish(
                            Event::new(EventKind::ThreadTerminated)
                                .with_thread(id)
                                .with_group(group)
                                .with_status(ThreadStatus::Terminated),
                        );
                    }
                    Ok(())
                }
            };
            outcomes.push(MemberOutcome { thread: id, result });
        }
        Ok(GroupReport { group, outcomes })
    }

    // ---------------------------
    // Pools
    // ---------------------------

    /// Creates a fixed-size worker pool with a bounded FIFO queue.
    ///
    /// `queue_capacity = 0` uses the configured default. The worker set is
    /// fixed at creation and never grows or shrinks.
    pub fn create_pool(
        &self,
        worker_count: usize,
        queue_capacity: usize,
        policy: OverflowPolicy,
    ) -> Result<PoolId, RuntimeError> {
        self.ensure_open()?;
        let id = PoolId(self.next_pool.fetch_add(1, Ordering::Relaxed));
        let pool = PoolExecutor::new(
            id,
            worker_count,
            self.cfg.queue_capacity(queue_capacity),
            policy,
        );
        self.registry.write().pools.insert(id, pool);
        self.bus
            .publish(Event::new(EventKind::PoolCreated).with_pool(id));
        Ok(id)
    }

    /// Submits work to a pool according to its overflow policy.
    ///
    /// Under `Block` this suspends while the queue is full; under `Reject`
    /// it fails immediately with `QueueFull`.
    pub async fn submit(&self, pool: PoolId, work: WorkRef) -> Result<JobHandle, RuntimeError> {
        let pool = self.pool(pool)?;
        pool.submit(work).await
    }

    /// Shuts a pool down; see
    /// [`OverflowPolicy`](crate::pool::OverflowPolicy) and the pool rules
    /// for drain semantics. Idempotent per pool.
    pub async fn shutdown_pool(&self, id: PoolId, drain: bool) -> Result<(), RuntimeError> {
        let pool = self.pool(id)?;
        if pool.shutdown(drain).await {
            self.bus
                .publish(Event::new(EventKind::PoolShutdown).with_pool(id));
        }
        Ok(())
    }

    fn pool(&self, id: PoolId) -> Result<Arc<PoolExecutor>, RuntimeError> {
        self.registry
            .read()
            .pools
            .get(&id)
            .cloned()
            .ok_or(RuntimeError::NotFound {
                resource: "pool",
                id: id.0,
            })
    }

    // ---------------------------
    // Primitives
    // ---------------------------

    /// Creates a counting semaphore, registered for engine teardown.
    ///
    /// On a shut-down engine the semaphore comes back already closed, so
    /// acquirers fail with `EngineClosed` instead of waiting forever.
    pub fn semaphore(&self, capacity: usize) -> Arc<Semaphore> {
        let semaphore = Arc::new(Semaphore::new(capacity));
        self.registry
            .write()
            .semaphores
            .push(Arc::clone(&semaphore));
        if self.is_closed() {
            semaphore.close();
        }
        semaphore
    }

    /// Creates a generation barrier, registered for engine teardown.
    ///
    /// On a shut-down engine the barrier comes back already closed.
    pub fn barrier(&self, parties: usize) -> Arc<Barrier> {
        let barrier = Arc::new(Barrier::new(parties));
        self.registry.write().barriers.push(Arc::clone(&barrier));
        if self.is_closed() {
            barrier.close();
        }
        barrier
    }

    /// Creates a topic event bus wired to the engine's error channel:
    /// every isolated callback failure is published as a `CallbackFailed`
    /// lifecycle event.
    pub fn event_bus(&self) -> Arc<EventBus> {
        let lifecycle = self.bus.clone();
        let bus = Arc::new(EventBus::with_failure_sink(move |failure| {
            lifecycle.publish(Event::new(EventKind::CallbackFailed).with_reason(format!(
                "topic={} subscription={} error={}",
                failure.topic, failure.subscription, failure.error
            )));
        }));
        self.registry.write().event_buses.push(Arc::clone(&bus));
        bus
    }

    // ---------------------------
    // Snapshots & metrics
    // ---------------------------

    /// Records one sampler-fed CPU/memory sample.
    ///
    /// History is bounded by [`EngineConfig::sample_history`]; the oldest
    /// samples fall off.
    pub fn record_sample(&self, sample: ResourceSample) {
        let mut samples = self.samples.lock();
        samples.push_back(sample);
        while samples.len() > self.cfg.sample_history.max(1) {
            samples.pop_front();
        }
    }

    /// Takes a consistent point-in-time snapshot under the shared lock.
    ///
    /// Only registry contents are copied while the lock is held; no user
    /// work executes under it.
    pub fn snapshot(&self) -> Snapshot {
        // Sample history is copied outside the registry lock; the two locks
        // are never held together.
        let samples: Vec<ResourceSample> = self.samples.lock().iter().copied().collect();
        let reg = self.registry.read();

        let mut threads: Vec<_> = reg.threads.values().map(|r| thread_info(r)).collect();
        threads.sort_unstable_by_key(|info| info.id);

        let mut groups: Vec<_> = reg
            .groups
            .values()
            .map(|group| {
                let mut members: Vec<ThreadId> = group.members.iter().copied().collect();
                members.sort_unstable();
                GroupInfo {
                    id: group.id,
                    name: group.name.to_string(),
                    members,
                }
            })
            .collect();
        groups.sort_unstable_by_key(|info| info.id);

        let mut pools: Vec<_> = reg.pools.values().map(|p| pool_info(p)).collect();
        pools.sort_unstable_by_key(|info| info.id);

        let mut counts = StatusCounts::default();
        for info in &threads {
            counts.bump(info.status);
        }

        let metrics = EngineMetrics {
            threads: counts,
            groups: groups.len(),
            pools: pools.len(),
            semaphores: reg.semaphores.len(),
            barriers: reg.barriers.len(),
            event_buses: reg.event_buses.len(),
            samples,
        };

        Snapshot {
            taken_at_ms: epoch_ms(SystemTime::now()),
            threads,
            groups,
            pools,
            metrics,
        }
    }

    /// Serializes the current snapshot as JSON to `path`.
    ///
    /// An observability dump for offline inspection; nothing is ever read
    /// back — engine state does not persist across processes.
    pub fn write_session_log(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, &self.snapshot())?;
        Ok(())
    }

    // ---------------------------
    // Teardown
    // ---------------------------

    /// Shuts the engine down. Idempotent.
    ///
    /// Terminates all threads (cooperatively), shuts down all pools
    /// without draining, and closes registered semaphores and barriers so
    /// suspended waiters fail with `EngineClosed`. In-flight pool jobs are
    /// allowed to finish.
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.bus.publish(Event::new(EventKind::ShutdownRequested));

        let (threads, pools, semaphores, barriers) = {
            let reg = self.registry.read();
            (
                reg.threads.values().cloned().collect::<Vec<_>>(),
                reg.pools.values().cloned().collect::<Vec<_>>(),
                reg.semaphores.clone(),
                reg.barriers.clone(),
            )
        };

        for record in threads {
            if record.terminate() {
                self.bus.publish(
                    Event::new(EventKind::ThreadTerminated)
                        .with_thread(record.id())
                        .with_status(ThreadStatus::Terminated),
                );
            }
        }
        for semaphore in semaphores {
            semaphore.close();
        }
        for barrier in barriers {
            barrier.close();
        }
        for pool in pools {
            if pool.shutdown(false).await {
                self.bus
                    .publish(Event::new(EventKind::PoolShutdown).with_pool(pool.id()));
            }
        }

        self.bus.publish(Event::new(EventKind::EngineClosed));
    }
}
