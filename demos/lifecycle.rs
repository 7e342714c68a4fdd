//! # Example: lifecycle
//!
//! Demonstrates the managed-thread lifecycle and group bulk control.
//!
//! Shows how to:
//! - Create cooperative units of work with [`WorkFn`] and [`Checkpoint`]
//! - Pause, resume, and terminate a running thread
//! - Collect threads into a group and terminate it as one report
//! - Read statuses back through [`Engine::snapshot`]
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► Engine::builder(cfg).build()
//!   ├─► create_thread("crunch")        Pending → Running
//!   │
//!   ├─► pause("crunch")                Running → Waiting (at checkpoint)
//!   ├─► resume("crunch")               Waiting → Running
//!   │
//!   ├─► create_group("batch") + 3 member threads
//!   ├─► terminate_group("batch")       per-member outcomes, never fails
//!   │
//!   └─► shutdown()                     idempotent teardown
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example lifecycle
//! ```

use std::{sync::Arc, time::Duration};

use threadvisor::{
    Checkpoint, Engine, EngineConfig, Observe, Priority, ThreadStatus, WorkFn, WorkRef,
};

/// A looping worker that checks its flags once per tick.
fn ticking_worker(label: &'static str) -> WorkRef {
    WorkFn::arc(move |ctx: Checkpoint| async move {
        let mut tick = 0u32;
        loop {
            ctx.check().await?;
            tick += 1;
            println!("[{label}] tick #{tick}");
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== lifecycle example ===\n");

    // 1. Configure and build the engine (optionally with the LogWriter
    //    observer when the "logging" feature is enabled).
    let cfg = EngineConfig::default();
    #[cfg(feature = "logging")]
    let observers: Vec<Arc<dyn Observe>> = vec![Arc::new(threadvisor::LogWriter)];
    #[cfg(not(feature = "logging"))]
    let observers: Vec<Arc<dyn Observe>> = Vec::new();
    let engine = Engine::builder(cfg).with_observers(observers).build();

    // 2. Start one cooperative worker.
    let id = engine.create_thread(ticking_worker("crunch"), "crunch", Priority::High)?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    println!("\n[main] status = {}", engine.status(id)?);
    assert_eq!(engine.status(id)?, ThreadStatus::Running);

    // 3. Pause it. The status flips to Waiting immediately; the worker
    //    holds at its next checkpoint.
    println!("[main] pausing...");
    engine.pause(id)?;
    assert_eq!(engine.status(id)?, ThreadStatus::Waiting);
    tokio::time::sleep(Duration::from_millis(600)).await;
    println!("[main] (no ticks while paused)");

    // 4. Resume and let it run a little more.
    println!("[main] resuming...");
    engine.resume(id)?;
    tokio::time::sleep(Duration::from_millis(500)).await;

    // 5. Terminate it. The worker observes its cancel flag at the next
    //    checkpoint and unwinds with TaskError::Canceled.
    println!("[main] terminating...");
    engine.terminate(id)?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(engine.status(id)?, ThreadStatus::Terminated);

    // 6. Groups: three workers terminated as one bulk operation.
    let group = engine.create_group("batch")?;
    for i in 0..3 {
        let worker: WorkRef = WorkFn::arc(|ctx: Checkpoint| async move {
            loop {
                ctx.check().await?;
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        });
        let member = engine.create_thread_default(worker, format!("batch-{i}"))?;
        engine.add_to_group(group, member)?;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    let report = engine.terminate_group(group)?;
    println!(
        "\n[main] group terminate: {} applied, {} rejected",
        report.applied(),
        report.rejected()
    );

    // 7. Snapshot: statuses are consistent with everything above.
    let snapshot = engine.snapshot();
    println!("[main] thread counts: {:?}", snapshot.metrics.threads);

    // 8. Tear down. A second call would be a no-op.
    engine.shutdown().await;
    println!("\n=== example completed successfully ===");
    Ok(())
}
