//! End-to-end tests for the engine surface: thread lifecycle, groups,
//! pools, primitives, snapshots, and teardown.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use threadvisor::{
    Checkpoint, Engine, EngineConfig, Event, EventKind, Observe, OverflowPolicy, Priority,
    ResourceSample, RuntimeError, TaskError, ThreadId, ThreadStatus, WorkFn, WorkRef,
};

fn engine() -> Arc<Engine> {
    Engine::new(EngineConfig::default())
}

fn instant_ok() -> WorkRef {
    WorkFn::arc(|_ctx: Checkpoint| async { Ok::<_, TaskError>(()) })
}

/// Work that loops forever, checking its flags every millisecond.
fn looping() -> WorkRef {
    WorkFn::arc(|ctx: Checkpoint| async move {
        loop {
            ctx.check().await?;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
}

async fn settle(engine: &Engine, id: ThreadId, expected: ThreadStatus) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if engine.status(id).unwrap() == expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "thread {id} never reached {expected}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn ids_are_distinct_and_threads_start_unprompted() {
    let engine = engine();
    let mut ids = HashSet::new();
    for i in 0..10 {
        let id = engine
            .create_thread(looping(), format!("worker-{i}"), Priority::Normal)
            .unwrap();
        assert!(ids.insert(id), "id {id} was reused");
    }
    // Every thread reaches Running without any external trigger.
    for id in &ids {
        settle(&engine, *id, ThreadStatus::Running).await;
    }
    engine.shutdown().await;
}

#[tokio::test]
async fn terminate_twice_equals_terminate_once() {
    let engine = engine();
    let id = engine.create_thread(looping(), "victim", Priority::Low).unwrap();
    settle(&engine, id, ThreadStatus::Running).await;

    engine.terminate(id).unwrap();
    assert_eq!(engine.status(id).unwrap(), ThreadStatus::Terminated);
    engine.terminate(id).unwrap();
    assert_eq!(engine.status(id).unwrap(), ThreadStatus::Terminated);
    engine.shutdown().await;
}

#[tokio::test]
async fn resume_on_non_waiting_is_rejected_without_side_effects() {
    let engine = engine();
    let id = engine.create_thread(looping(), "steady", Priority::Normal).unwrap();
    settle(&engine, id, ThreadStatus::Running).await;

    let err = engine.resume(id).unwrap_err();
    assert_eq!(err.as_label(), "invalid_transition");
    assert_eq!(engine.status(id).unwrap(), ThreadStatus::Running);
    engine.shutdown().await;
}

#[tokio::test]
async fn pause_is_visible_before_the_checkpoint_reacts() {
    let engine = engine();
    let ticks = Arc::new(AtomicUsize::new(0));
    let work: WorkRef = {
        let ticks = Arc::clone(&ticks);
        WorkFn::arc(move |ctx: Checkpoint| {
            let ticks = Arc::clone(&ticks);
            async move {
                loop {
                    ctx.check().await?;
                    ticks.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            }
        })
    };
    let id = engine.create_thread(work, "pausable", Priority::Normal).unwrap();
    settle(&engine, id, ThreadStatus::Running).await;

    engine.pause(id).unwrap();
    // Synchronous registry update: Waiting shows up in the snapshot at once.
    let snapshot = engine.snapshot();
    let info = snapshot.threads.iter().find(|t| t.id == id).unwrap();
    assert_eq!(info.status, ThreadStatus::Waiting);

    // The worker stops ticking at its next checkpoint.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let frozen = ticks.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), frozen);

    engine.resume(id).unwrap();
    settle(&engine, id, ThreadStatus::Running).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(ticks.load(Ordering::SeqCst) > frozen, "worker never resumed");
    engine.shutdown().await;
}

#[tokio::test]
async fn failed_work_is_captured_not_propagated() {
    let engine = engine();
    let id = engine
        .create_thread(
            WorkFn::arc(|_ctx: Checkpoint| async { Err::<(), _>(TaskError::fail("exploded")) }),
            "doomed",
            Priority::Normal,
        )
        .unwrap();
    settle(&engine, id, ThreadStatus::Failed).await;

    let snapshot = engine.snapshot();
    let info = snapshot.threads.iter().find(|t| t.id == id).unwrap();
    assert_eq!(info.error.as_deref(), Some("execution failed: exploded"));
    // Control calls still behave normally on a Failed thread.
    engine.terminate(id).unwrap();
    assert_eq!(engine.status(id).unwrap(), ThreadStatus::Failed);
    engine.shutdown().await;
}

#[tokio::test]
async fn group_bulk_ops_aggregate_instead_of_failing() {
    let engine = engine();
    let group = engine.create_group("batch").unwrap();
    let mut members = Vec::new();
    for i in 0..4 {
        let id = engine
            .create_thread(looping(), format!("member-{i}"), Priority::Normal)
            .unwrap();
        engine.add_to_group(group, id).unwrap();
        members.push(id);
    }
    for id in &members {
        settle(&engine, *id, ThreadStatus::Running).await;
    }
    assert_eq!(engine.group_members(group).unwrap(), members);

    // Resuming running members is illegal per member, legal as a bulk op.
    let report = engine.resume_group(group).unwrap();
    assert_eq!(report.applied(), 0);
    assert_eq!(report.rejected(), 4);

    let report = engine.terminate_group(group).unwrap();
    assert_eq!(report.applied(), 4);
    for id in &members {
        assert_eq!(engine.status(*id).unwrap(), ThreadStatus::Terminated);
    }

    // Second sweep: all members already terminal, still no failure.
    let report = engine.terminate_group(group).unwrap();
    assert_eq!(report.applied(), 4);
    assert_eq!(report.rejected(), 0);
    engine.shutdown().await;
}

#[tokio::test]
async fn membership_moves_between_groups() {
    let engine = engine();
    let first = engine.create_group("first").unwrap();
    let second = engine.create_group("second").unwrap();
    let id = engine.create_thread(instant_ok(), "roamer", Priority::Normal).unwrap();

    engine.add_to_group(first, id).unwrap();
    engine.add_to_group(first, id).unwrap(); // set semantics: no-op
    assert_eq!(engine.group_members(first).unwrap(), vec![id]);

    // A thread belongs to at most one group: the add moves it.
    engine.add_to_group(second, id).unwrap();
    assert!(engine.group_members(first).unwrap().is_empty());
    assert_eq!(engine.group_members(second).unwrap(), vec![id]);

    engine.remove_from_group(second, id).unwrap();
    engine.remove_from_group(second, id).unwrap(); // non-member: no-op
    assert!(engine.group_members(second).unwrap().is_empty());
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_runs_twenty_jobs_exactly_once() {
    let engine = engine();
    let pool = engine.create_pool(4, 32, OverflowPolicy::Reject).unwrap();
    let runs = Arc::new(Mutex::new(vec![0u32; 20]));

    let mut handles = Vec::new();
    for i in 0..20 {
        let runs = Arc::clone(&runs);
        let work: WorkRef = WorkFn::arc(move |_ctx: Checkpoint| {
            let runs = Arc::clone(&runs);
            async move {
                tokio::time::sleep(Duration::from_millis(2)).await;
                runs.lock()[i] += 1;
                Ok::<_, TaskError>(())
            }
        });
        handles.push(engine.submit(pool, work).await.unwrap());
    }

    engine.shutdown_pool(pool, true).await.unwrap();
    for handle in handles {
        assert_eq!(handle.wait().await, Ok(()));
    }
    assert!(runs.lock().iter().all(|&count| count == 1));

    let snapshot = engine.snapshot();
    let info = snapshot.pools.iter().find(|p| p.id == pool).unwrap();
    assert_eq!(info.submitted, 20);
    assert_eq!(info.completed, 20);
    assert!(info.closed);

    let err = engine.submit(pool, instant_ok()).await.unwrap_err();
    assert_eq!(err, RuntimeError::PoolClosed);
    engine.shutdown().await;
}

#[tokio::test]
async fn snapshot_counts_primitives_and_samples() {
    let cfg = EngineConfig {
        sample_history: 3,
        ..EngineConfig::default()
    };
    let engine = Engine::new(cfg);
    let _sem = engine.semaphore(2);
    let _barrier = engine.barrier(3);
    let _bus = engine.event_bus();

    for i in 0..5 {
        engine.record_sample(ResourceSample {
            at_ms: i,
            cpu_percent: i as f64,
            memory_percent: 0.0,
        });
    }

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.metrics.semaphores, 1);
    assert_eq!(snapshot.metrics.barriers, 1);
    assert_eq!(snapshot.metrics.event_buses, 1);
    // Bounded history: only the 3 most recent samples survive.
    let retained: Vec<u64> = snapshot.metrics.samples.iter().map(|s| s.at_ms).collect();
    assert_eq!(retained, vec![2, 3, 4]);
    engine.shutdown().await;
}

#[tokio::test]
async fn session_log_is_valid_json() {
    let engine = engine();
    engine.create_thread(instant_ok(), "logged", Priority::Normal).unwrap();
    engine.record_sample(ResourceSample::now(10.0, 20.0));

    let path = std::env::temp_dir().join("threadvisor_session_test.json");
    engine.write_session_log(&path).unwrap();
    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(parsed["taken_at_ms"].as_u64().is_some());
    assert!(parsed["threads"].is_array());
    std::fs::remove_file(&path).ok();
    engine.shutdown().await;
}

#[tokio::test]
async fn callback_failures_reach_the_engine_error_channel() {
    let engine = engine();
    let mut events = engine.bus().subscribe();

    let bus = engine.event_bus();
    bus.subscribe("jobs", |_payload| {
        Err(threadvisor::CallbackError::new("subscriber broke"))
    });
    let survivors = Arc::new(AtomicUsize::new(0));
    {
        let survivors = Arc::clone(&survivors);
        bus.subscribe("jobs", move |_payload| {
            survivors.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    let failures = bus.publish("jobs", Arc::new(()));
    assert_eq!(failures.len(), 1);
    assert_eq!(survivors.load(Ordering::SeqCst), 1);

    // The isolated failure is reported as a CallbackFailed lifecycle event.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        assert!(tokio::time::Instant::now() < deadline, "no CallbackFailed event");
        let event: Event = events.recv().await.unwrap();
        if event.kind == EventKind::CallbackFailed {
            assert!(event.reason.unwrap().contains("subscriber broke"));
            break;
        }
    }
    engine.shutdown().await;
}

#[tokio::test]
async fn shutdown_is_idempotent_and_closes_everything() {
    let engine = engine();
    let id = engine.create_thread(looping(), "survivor", Priority::Normal).unwrap();
    settle(&engine, id, ThreadStatus::Running).await;
    let pool = engine.create_pool(2, 4, OverflowPolicy::Reject).unwrap();
    let sem = engine.semaphore(1);
    sem.acquire().await.unwrap();

    let blocked = {
        let sem = Arc::clone(&sem);
        tokio::spawn(async move { sem.acquire().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    engine.shutdown().await;
    engine.shutdown().await; // no-op

    assert!(engine.is_closed());
    assert_eq!(engine.status(id).unwrap(), ThreadStatus::Terminated);
    assert_eq!(blocked.await.unwrap(), Err(RuntimeError::EngineClosed));
    assert_eq!(
        engine.submit(pool, instant_ok()).await.unwrap_err(),
        RuntimeError::PoolClosed
    );
    assert!(matches!(
        engine.create_thread(instant_ok(), "late", Priority::Normal),
        Err(RuntimeError::EngineClosed)
    ));
    assert!(matches!(engine.create_group("late"), Err(RuntimeError::EngineClosed)));
}

#[tokio::test]
async fn cleanup_finished_drops_terminal_records_and_group_refs() {
    let engine = engine();
    let group = engine.create_group("done").unwrap();
    let id = engine.create_thread(instant_ok(), "ephemeral", Priority::Normal).unwrap();
    engine.add_to_group(group, id).unwrap();
    settle(&engine, id, ThreadStatus::Completed).await;

    assert_eq!(engine.cleanup_finished(), 1);
    assert!(matches!(engine.status(id), Err(RuntimeError::NotFound { .. })));
    // No dangling member reference survives the removal.
    assert!(engine.group_members(group).unwrap().is_empty());
    assert_eq!(engine.cleanup_finished(), 0);
    engine.shutdown().await;
}

/// Observer that records every event kind it sees.
struct Recorder {
    seen: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Observe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.seen.lock().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn observers_receive_lifecycle_events() {
    let recorder = Arc::new(Recorder {
        seen: Mutex::new(Vec::new()),
    });
    let engine = Engine::builder(EngineConfig::default())
        .with_observer(Arc::clone(&recorder) as Arc<dyn Observe>)
        .build();

    let id = engine.create_thread(instant_ok(), "observed", Priority::Normal).unwrap();
    settle(&engine, id, ThreadStatus::Completed).await;
    engine.shutdown().await;

    // Observer queues drain asynchronously.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        {
            let seen = recorder.seen.lock();
            if seen.contains(&EventKind::ThreadCreated)
                && seen.contains(&EventKind::ThreadStarted)
                && seen.contains(&EventKind::ThreadCompleted)
                && seen.contains(&EventKind::EngineClosed)
            {
                break;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "observer missed lifecycle events"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
