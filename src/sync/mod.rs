//! Synchronization primitives: counting semaphore, generation barrier,
//! and topic event bus.
//!
//! Each primitive owns its own lock/notification state, independent of the
//! engine registry — nothing here is ever held while registry bookkeeping
//! runs, so primitives cannot deadlock against the engine or each other.

mod barrier;
mod event_bus;
mod semaphore;

pub use barrier::Barrier;
pub use event_bus::{CallbackFailure, EventBus, Payload, SubscriptionId};
pub use semaphore::Semaphore;
