//! # Example: rendezvous
//!
//! Demonstrates the synchronization primitives: counting semaphore,
//! generation barrier, and topic event bus.
//!
//! Shows how to:
//! - Bound concurrency with [`Semaphore`] (capacity 2 across 6 tasks)
//! - Rendezvous phases of 3 workers with a reusable [`Barrier`]
//! - Publish typed payloads over the [`EventBus`] and unsubscribe
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► semaphore(2): 6 tasks acquire/release, ≤ 2 ever run at once
//!   │
//!   ├─► barrier(3): 3 workers meet twice, generation 1 then 2
//!   │
//!   └─► event_bus():
//!         ├─► subscribe("progress", a) + subscribe("progress", b)
//!         ├─► publish → both invoked in subscription order
//!         └─► unsubscribe(a), publish → only b invoked
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example rendezvous
//! ```

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    sync::Arc,
    time::Duration,
};

use threadvisor::{Engine, EngineConfig, Payload};

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() -> anyhow::Result<()> {
    println!("=== rendezvous example ===\n");

    let engine = Engine::new(EngineConfig::default());

    // 1. Semaphore: six tasks, at most two holders at any moment.
    let sem = engine.semaphore(2);
    let active = Arc::new(AtomicUsize::new(0));
    let mut tasks = Vec::new();
    for i in 0..6 {
        let sem = Arc::clone(&sem);
        let active = Arc::clone(&active);
        tasks.push(tokio::spawn(async move {
            sem.acquire().await.unwrap();
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            println!("[task {i}] acquired ({now} active)");
            assert!(now <= 2, "semaphore admitted too many holders");
            tokio::time::sleep(Duration::from_millis(100)).await;
            active.fetch_sub(1, Ordering::SeqCst);
            sem.release();
        }));
    }
    for task in tasks {
        task.await?;
    }
    println!("[main] semaphore bounded the section to 2 holders\n");

    // 2. Barrier: three workers meet at the end of each phase; nobody
    //    enters phase 2 before everyone finished phase 1.
    let barrier = engine.barrier(3);
    let mut workers = Vec::new();
    for i in 0..3u64 {
        let barrier = Arc::clone(&barrier);
        workers.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30 * (i + 1))).await;
            println!("[worker {i}] phase 1 done, waiting");
            let generation = barrier.await_arrival().await.unwrap();
            println!("[worker {i}] released by generation {generation}");

            let generation = barrier.await_arrival().await.unwrap();
            println!("[worker {i}] released by generation {generation}");
        }));
    }
    for worker in workers {
        worker.await?;
    }
    println!("[main] barrier tripped twice, generation = {}\n", barrier.generation());

    // 3. Event bus: ordered delivery, explicit unsubscribe.
    let bus = engine.event_bus();
    let first = bus.subscribe("progress", |payload: &Payload| {
        let percent = payload.downcast_ref::<u32>().copied().unwrap_or(0);
        println!("[subscriber a] progress {percent}%");
        Ok(())
    });
    bus.subscribe("progress", |payload: &Payload| {
        let percent = payload.downcast_ref::<u32>().copied().unwrap_or(0);
        println!("[subscriber b] progress {percent}%");
        Ok(())
    });

    bus.publish("progress", Arc::new(50u32));
    bus.unsubscribe(first);
    println!("[main] unsubscribed a; publishing again");
    bus.publish("progress", Arc::new(100u32));

    engine.shutdown().await;
    println!("\n=== example completed successfully ===");
    Ok(())
}
