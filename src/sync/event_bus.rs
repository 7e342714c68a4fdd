//! # Topic-keyed event bus with explicit subscription handles.
//!
//! [`EventBus`] maps topics to ordered callback lists. `publish` delivers
//! to the subscribers registered at the moment of publish, in subscription
//! order; a callback added during a publish does not receive that publish.
//! Callback errors and panics are isolated — remaining subscribers still
//! receive the event — and are returned as [`CallbackFailure`] records
//! (and forwarded to the failure sink when one is installed, which is how
//! engine-created buses report into the engine's error channel).
//!
//! ## Rules
//! - Unsubscribing requires the handle returned at subscribe time; stale
//!   callbacks are never cleaned up implicitly.
//! - Callbacks run outside the bus lock; subscribing or publishing from
//!   inside a callback is allowed and cannot deadlock.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::CallbackError;

/// Payload delivered to topic subscribers.
pub type Payload = Arc<dyn Any + Send + Sync>;

type Callback = Arc<dyn Fn(&Payload) -> Result<(), CallbackError> + Send + Sync>;
type FailureSink = Arc<dyn Fn(&CallbackFailure) + Send + Sync>;

/// Handle identifying one subscription; required for unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Isolated failure of one callback during a publish.
#[derive(Debug, Clone)]
pub struct CallbackFailure {
    /// Topic the publish targeted.
    pub topic: Arc<str>,
    /// The failing subscription.
    pub subscription: SubscriptionId,
    /// The callback's error (panics are captured as errors).
    pub error: CallbackError,
}

struct TopicEntry {
    id: SubscriptionId,
    callback: Callback,
}

#[derive(Default)]
struct BusState {
    topics: HashMap<Arc<str>, Vec<TopicEntry>>,
    // subscription id → topic, for unsubscribe by handle
    index: HashMap<SubscriptionId, Arc<str>>,
}

/// Topic-keyed callback bus for coordinating units of work.
///
/// Standalone and engine-independent; [`Engine::event_bus`](crate::Engine::event_bus)
/// creates instances wired to the engine's error channel.
pub struct EventBus {
    state: Mutex<BusState>,
    next_id: AtomicU64,
    failure_sink: Option<FailureSink>,
}

impl EventBus {
    /// Creates a standalone bus; failures are only returned from `publish`.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BusState::default()),
            next_id: AtomicU64::new(0),
            failure_sink: None,
        }
    }

    /// Creates a bus that additionally reports every [`CallbackFailure`]
    /// to `sink`.
    pub fn with_failure_sink<S>(sink: S) -> Self
    where
        S: Fn(&CallbackFailure) + Send + Sync + 'static,
    {
        Self {
            state: Mutex::new(BusState::default()),
            next_id: AtomicU64::new(0),
            failure_sink: Some(Arc::new(sink)),
        }
    }

    /// Registers `callback` for `topic` and returns its handle.
    pub fn subscribe<F>(&self, topic: impl Into<Arc<str>>, callback: F) -> SubscriptionId
    where
        F: Fn(&Payload) -> Result<(), CallbackError> + Send + Sync + 'static,
    {
        let topic = topic.into();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut state = self.state.lock();
        state.index.insert(id, Arc::clone(&topic));
        state.topics.entry(topic).or_default().push(TopicEntry {
            id,
            callback: Arc::new(callback),
        });
        id
    }

    /// Removes the subscription behind `id`.
    ///
    /// Returns false when the handle is unknown (already unsubscribed).
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        let Some(topic) = state.index.remove(&id) else {
            return false;
        };
        if let Some(entries) = state.topics.get_mut(&topic) {
            entries.retain(|entry| entry.id != id);
            if entries.is_empty() {
                state.topics.remove(&topic);
            }
        }
        true
    }

    /// Delivers `payload` to every callback subscribed to `topic` at this
    /// moment, in subscription order.
    ///
    /// Failures (errors and captured panics) are isolated per callback and
    /// returned; delivery to the remaining subscribers continues.
    pub fn publish(&self, topic: &str, payload: Payload) -> Vec<CallbackFailure> {
        // Snapshot under the lock; invoke outside it. Subscribers added by
        // a callback therefore miss this publish by construction.
        let delivery: Option<(Arc<str>, Vec<(SubscriptionId, Callback)>)> = {
            let state = self.state.lock();
            state.topics.get_key_value(topic).map(|(key, entries)| {
                (
                    Arc::clone(key),
                    entries
                        .iter()
                        .map(|e| (e.id, Arc::clone(&e.callback)))
                        .collect(),
                )
            })
        };
        let Some((topic, entries)) = delivery else {
            return Vec::new();
        };

        let mut failures = Vec::new();
        for (id, callback) in entries {
            let result =
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(&payload)));
            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err,
                Err(payload) => CallbackError::new(crate::error::panic_message(payload)),
            };
            let failure = CallbackFailure {
                topic: Arc::clone(&topic),
                subscription: id,
                error,
            };
            if let Some(sink) = &self.failure_sink {
                sink(&failure);
            }
            failures.push(failure);
        }
        failures
    }

    /// Number of callbacks currently subscribed to `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.state
            .lock()
            .topics
            .get(topic)
            .map_or(0, |entries| entries.len())
    }

    /// Total live subscriptions across all topics.
    pub fn subscription_count(&self) -> usize {
        self.state.lock().index.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> impl Fn(&Payload) -> Result<(), CallbackError> + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |_payload| {
            log.lock().push(tag);
            Ok(())
        }
    }

    #[test]
    fn delivers_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe("x", recorder(&log, "a"));
        bus.subscribe("x", recorder(&log, "b"));
        bus.subscribe("y", recorder(&log, "other-topic"));

        let failures = bus.publish("x", Arc::new(()));
        assert!(failures.is_empty());
        assert_eq!(*log.lock(), vec!["a", "b"]);
    }

    #[test]
    fn unsubscribed_callbacks_are_skipped() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = bus.subscribe("x", recorder(&log, "a"));
        bus.subscribe("x", recorder(&log, "b"));

        assert!(bus.unsubscribe(a));
        assert!(!bus.unsubscribe(a));
        bus.publish("x", Arc::new(()));
        assert_eq!(*log.lock(), vec!["b"]);
        assert_eq!(bus.subscriber_count("x"), 1);
    }

    #[test]
    fn mid_publish_subscriber_misses_the_inflight_publish() {
        let bus = Arc::new(EventBus::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let bus_inner = Arc::clone(&bus);
        let log_inner = Arc::clone(&log);
        bus.subscribe("x", move |_payload| {
            let log = Arc::clone(&log_inner);
            bus_inner.subscribe("x", move |_payload| {
                log.lock().push("late");
                Ok(())
            });
            Ok(())
        });

        bus.publish("x", Arc::new(()));
        assert!(log.lock().is_empty());

        bus.publish("x", Arc::new(()));
        assert_eq!(*log.lock(), vec!["late"]);
    }

    #[test]
    fn failing_callback_does_not_block_the_rest() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let bad = bus.subscribe("x", |_payload| Err(CallbackError::new("nope")));
        bus.subscribe("x", recorder(&log, "survivor"));

        let failures = bus.publish("x", Arc::new(()));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].subscription, bad);
        assert_eq!(failures[0].error, CallbackError::new("nope"));
        assert_eq!(*log.lock(), vec!["survivor"]);
    }

    #[test]
    fn panicking_callback_is_captured_as_failure() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe("x", |_payload| panic!("callback blew up"));
        bus.subscribe("x", recorder(&log, "survivor"));

        let failures = bus.publish("x", Arc::new(()));
        assert_eq!(failures.len(), 1);
        assert!(failures[0].error.0.contains("callback blew up"));
        assert_eq!(*log.lock(), vec!["survivor"]);
    }

    #[test]
    fn payloads_downcast_to_their_concrete_type() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(0u32));
        let seen_cb = Arc::clone(&seen);
        bus.subscribe("metrics", move |payload| {
            let value = payload
                .downcast_ref::<u32>()
                .ok_or_else(|| CallbackError::new("wrong payload type"))?;
            *seen_cb.lock() = *value;
            Ok(())
        });

        let failures = bus.publish("metrics", Arc::new(42u32));
        assert!(failures.is_empty());
        assert_eq!(*seen.lock(), 42);
    }

    #[test]
    fn failure_sink_observes_every_failure() {
        let sink_log = Arc::new(Mutex::new(Vec::new()));
        let sink_inner = Arc::clone(&sink_log);
        let bus = EventBus::with_failure_sink(move |failure: &CallbackFailure| {
            sink_inner.lock().push(failure.error.clone());
        });
        bus.subscribe("x", |_payload| Err(CallbackError::new("reported")));

        bus.publish("x", Arc::new(()));
        assert_eq!(*sink_log.lock(), vec![CallbackError::new("reported")]);
    }
}
