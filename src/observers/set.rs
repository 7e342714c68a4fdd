//! # Non-blocking event fan-out to multiple observers.
//!
//! [`ObserverSet`] distributes events to multiple observers concurrently
//! without blocking the publisher.
//!
//! ## Rules
//! - **No cross-observer ordering**: observer A may process event N while
//!   B is still on N-5; per-observer delivery is FIFO.
//! - **Overflow**: the event is dropped for that observer only and an
//!   `ObserverOverflow` event is published.
//! - **Isolation**: a slow or panicking observer does not affect others;
//!   panics are caught and converted to `ObserverPanicked` events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::panic_message;
use crate::events::{Bus, Event, EventKind};
use crate::observers::Observe;

/// Per-observer channel metadata.
struct ObserverChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator for lifecycle event observers.
///
/// Manages per-observer bounded queues and worker tasks. Observers keep
/// receiving queued events after [`ObserverSet::close`] until their queues
/// drain.
pub struct ObserverSet {
    channels: Mutex<Vec<ObserverChannel>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
    bus: Bus,
}

impl ObserverSet {
    /// Creates a new set and spawns one worker task per observer.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(observers: Vec<Arc<dyn Observe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(observers.len());
        let mut workers = Vec::with_capacity(observers.len());

        for obs in observers {
            let cap = obs.queue_capacity().max(1);
            let name = obs.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let bus_for_worker = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = obs.on_event(ev.as_ref());
                    if let Err(payload) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        bus_for_worker
                            .publish(Event::observer_panicked(obs.name(), panic_message(payload)));
                    }
                }
            });
            channels.push(ObserverChannel { name, sender: tx });
            workers.push(handle);
        }
        Self {
            channels: Mutex::new(channels),
            workers: Mutex::new(workers),
            closed: AtomicBool::new(false),
            bus,
        }
    }

    /// Emits an event to all observers.
    ///
    /// Uses `try_send`: on a full or closed queue the event is dropped for
    /// that observer and an `ObserverOverflow` event is published (overflow
    /// events themselves are not re-reported, preventing feedback loops).
    pub fn emit(&self, event: &Event) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let is_delivery_evt = matches!(
            event.kind,
            EventKind::ObserverOverflow | EventKind::ObserverPanicked
        );
        let event = Arc::new(event.clone());

        let channels = self.channels.lock();
        for channel in channels.iter() {
            match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    if !is_delivery_evt {
                        self.bus
                            .publish(Event::observer_overflow(channel.name, "full"));
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    if !is_delivery_evt {
                        self.bus
                            .publish(Event::observer_overflow(channel.name, "closed"));
                    }
                }
            }
        }
    }

    /// Stops accepting events and lets workers drain their queues.
    ///
    /// Idempotent. Queued events are still delivered; the worker tasks exit
    /// once their queues are empty.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.channels.lock().clear();
        self.workers.lock().clear();
    }
}
