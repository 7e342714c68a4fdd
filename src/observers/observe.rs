//! # Core observer trait.
//!
//! `Observe` is the extension point for plugging custom event handlers into
//! the engine. Each observer is driven by a dedicated worker loop fed by a
//! bounded queue owned by the [`ObserverSet`](crate::observers::ObserverSet).
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching) — they do not block the
//!   publisher nor other observers.
//! - Each observer declares its preferred queue capacity via
//!   [`Observe::queue_capacity`]. If the queue overflows, events for that
//!   observer are dropped and an `ObserverOverflow` event is published.

use async_trait::async_trait;

use crate::events::Event;

/// Contract for lifecycle event observers.
///
/// Called from an observer-dedicated worker task. Implementations should
/// avoid blocking the async runtime (prefer async I/O and cooperative
/// waits).
#[async_trait]
pub trait Observe: Send + Sync + 'static {
    /// Handles a single event for this observer.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this observer's queue.
    fn queue_capacity(&self) -> usize {
        256
    }
}
