//! # Example: worker_pool
//!
//! Demonstrates the fixed-size worker pool and its bounded FIFO queue.
//!
//! Shows how to:
//! - Create a pool with [`Engine::create_pool`] and an [`OverflowPolicy`]
//! - Submit jobs and await their [`JobHandle`]s
//! - Observe `QueueFull` under the `Reject` policy
//! - Drain-shutdown a pool and read its counters from a snapshot
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► create_pool(4 workers, queue 8, Reject)
//!   ├─► submit 20 jobs              each runs exactly once, FIFO pickup
//!   │     └─► handles resolve as workers finish
//!   ├─► shutdown_pool(drain: true)  queued jobs finish first
//!   │
//!   ├─► create_pool(1 worker, queue 1, Reject)
//!   │     └─► third submit → QueueFull (nothing enqueued, no blocking)
//!   │
//!   └─► snapshot()                  submitted/completed counters
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example worker_pool
//! ```

use std::{
    sync::atomic::{AtomicU64, Ordering},
    sync::Arc,
    time::Duration,
};

use threadvisor::{
    Checkpoint, Engine, EngineConfig, OverflowPolicy, RuntimeError, TaskError, WorkFn, WorkRef,
};

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> anyhow::Result<()> {
    println!("=== worker_pool example ===\n");

    let engine = Engine::new(EngineConfig::default());

    // 1. A 4-worker pool over a bounded queue of 8.
    let pool = engine.create_pool(4, 8, OverflowPolicy::Reject)?;
    let done = Arc::new(AtomicU64::new(0));

    // 2. Submit 20 short jobs and keep their handles.
    let mut handles = Vec::new();
    for i in 0..20u64 {
        let done = Arc::clone(&done);
        let job: WorkRef = WorkFn::arc(move |_ctx: Checkpoint| {
            let done = Arc::clone(&done);
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                done.fetch_add(1, Ordering::Relaxed);
                println!("[job {i}] finished");
                Ok::<_, TaskError>(())
            }
        });
        handles.push(engine.submit(pool, job).await?);
    }

    // 3. Drain-shutdown: everything queued finishes before workers stop.
    engine.shutdown_pool(pool, true).await?;
    for handle in handles {
        handle.wait().await?;
    }
    println!("\n[main] all jobs done: {}", done.load(Ordering::Relaxed));

    // 4. Overflow under Reject: a held worker plus a single queue slot.
    let tiny = engine.create_pool(1, 1, OverflowPolicy::Reject)?;
    let slow: WorkRef = WorkFn::arc(|_ctx: Checkpoint| async {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok::<_, TaskError>(())
    });
    let quick: WorkRef = WorkFn::arc(|_ctx: Checkpoint| async { Ok::<_, TaskError>(()) });

    let busy = engine.submit(tiny, slow).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let queued = engine.submit(tiny, Arc::clone(&quick)).await?;
    match engine.submit(tiny, quick).await {
        Err(RuntimeError::QueueFull) => println!("[main] third submit rejected: queue full"),
        other => anyhow::bail!("expected QueueFull, got {other:?}"),
    }
    engine.shutdown_pool(tiny, true).await?;
    busy.wait().await?;
    queued.wait().await?;

    // 5. Counters come back through the snapshot.
    let snapshot = engine.snapshot();
    for info in &snapshot.pools {
        println!(
            "[main] pool {}: submitted={} completed={} closed={}",
            info.id, info.submitted, info.completed, info.closed
        );
    }

    engine.shutdown().await;
    println!("\n=== example completed successfully ===");
    Ok(())
}
