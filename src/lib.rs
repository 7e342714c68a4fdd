//! # threadvisor
//!
//! **Threadvisor** is an in-process concurrency-coordination engine for
//! Rust: it creates, tracks, pauses, resumes, terminates, and pools
//! cooperating units of work, and provides the synchronization primitives
//! to coordinate them.
//!
//! ## Architecture
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   WorkRef    │   │   WorkRef    │   │   WorkRef    │
//!     │ (user work)  │   │ (user work)  │   │ (user work)  │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Engine (registry)                                            │
//! │  - threads: ManagedThread records (status, flags, timestamps) │
//! │  - groups:  ThreadGroup member sets (bulk ops → reports)      │
//! │  - pools:   PoolExecutor handles (fixed workers, FIFO queue)  │
//! │  - primitives: Semaphore / Barrier / EventBus registrations   │
//! └──────┬──────────────────┬──────────────────┬───────────┬──────┘
//!        ▼                  ▼                  ▼           │
//!   ┌──────────┐      ┌──────────┐      ┌──────────┐      │
//!   │  driver  │      │  driver  │      │ pool     │      │ publishes
//!   │ (1 task) │      │ (1 task) │      │ workers  │      │ Events
//!   └────┬─────┘      └────┬─────┘      └────┬─────┘      ▼
//!        │  status back    │                 │      ┌───────────┐
//!        └─────────────────┴─────────────────┴─────►│    Bus    │
//!                                                   └─────┬─────┘
//!                                                         ▼
//!                                                   ObserverSet
//!                                              (per-observer queues)
//! ```
//!
//! ## Lifecycle
//! ```text
//! Pending ──► Running ◄──► Waiting          pause/resume (cooperative)
//!               │  │
//!               │  └──► Completed | Failed  work outcome (error captured)
//!               ▼
//! (any non-terminal) ──► Terminated         terminate (cooperative)
//! ```
//!
//! Control is cooperative throughout: `pause` and `terminate` only set
//! flags, and running work observes them at the checkpoints where it calls
//! [`Checkpoint::check`]. There is no preemption; a unit of work that
//! never checks its flags is never interrupted.
//!
//! ## Features
//! | Area           | Description                                         | Key types                               |
//! |----------------|-----------------------------------------------------|-----------------------------------------|
//! | **Threads**    | Lifecycle-tracked units of work with bulk groups.   | [`Engine`], [`ThreadStatus`], [`GroupReport`] |
//! | **Pools**      | Fixed worker sets over bounded FIFO queues.         | [`OverflowPolicy`], [`JobHandle`]       |
//! | **Primitives** | Semaphore, generation barrier, topic event bus.     | [`Semaphore`], [`Barrier`], [`EventBus`] |
//! | **Observers**  | Hook into lifecycle events (logging, metrics).      | [`Observe`], [`Event`], [`EventKind`]   |
//! | **Snapshots**  | Point-in-time state for dashboards and samplers.    | [`Snapshot`], [`ResourceSample`]        |
//! | **Errors**     | Typed structural and work-level errors.             | [`RuntimeError`], [`TaskError`]         |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust,no_run
//! use threadvisor::{
//!     Checkpoint, Engine, EngineConfig, OverflowPolicy, Priority, TaskError, WorkFn,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::new(EngineConfig::default());
//!
//!     // A cooperative unit of work: checks its flags once per iteration.
//!     let id = engine.create_thread(
//!         WorkFn::arc(|ctx: Checkpoint| async move {
//!             for _ in 0..100 {
//!                 ctx.check().await?;
//!                 tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//!             }
//!             Ok::<_, TaskError>(())
//!         }),
//!         "crunch",
//!         Priority::Normal,
//!     )?;
//!
//!     engine.pause(id)?;
//!     engine.resume(id)?;
//!
//!     // A 4-worker pool draining a bounded queue in FIFO order.
//!     let pool = engine.create_pool(4, 16, OverflowPolicy::Reject)?;
//!     let job = engine
//!         .submit(pool, WorkFn::arc(|_ctx: Checkpoint| async { Ok::<_, TaskError>(()) }))
//!         .await?;
//!     job.wait().await?;
//!
//!     println!("{}", engine.snapshot().to_json()?);
//!     engine.shutdown().await;
//!     Ok(())
//! }
//! ```

mod config;
mod engine;
mod error;
mod events;
mod observers;
mod pool;
mod sync;
mod thread;
mod work;

// ---- Public re-exports ----

pub use config::EngineConfig;
pub use engine::{
    Engine, EngineBuilder, EngineMetrics, GroupInfo, PoolInfo, ResourceSample, Snapshot,
    StatusCounts, ThreadInfo,
};
pub use error::{CallbackError, RuntimeError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use observers::{Observe, ObserverSet};
pub use pool::{JobHandle, JobId, OverflowPolicy, PoolId};
pub use sync::{Barrier, CallbackFailure, EventBus, Payload, Semaphore, SubscriptionId};
pub use thread::{GroupId, GroupReport, MemberOutcome, Priority, ThreadId, ThreadStatus};
pub use work::{Checkpoint, Work, WorkFn, WorkRef};

// Optional: expose a simple built-in logger observer (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use observers::LogWriter;
