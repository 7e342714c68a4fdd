//! # Global engine configuration.
//!
//! Provides [`EngineConfig`], centralized settings for the engine runtime.
//!
//! ## Sentinel values
//! - `create_pool` with `queue_capacity = 0` → use
//!   [`EngineConfig::default_queue_capacity`]
//! - `bus_capacity` is clamped to a minimum of 1 by the event bus

use crate::thread::Priority;

/// Global configuration for the engine.
///
/// ## Field semantics
/// - `bus_capacity`: lifecycle event ring buffer size (min 1; clamped)
/// - `sample_history`: how many sampler-fed resource samples to retain
/// - `default_queue_capacity`: pool queue bound used when a caller passes 0
/// - `default_priority`: priority assigned by convenience constructors
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Capacity of the internal lifecycle event broadcast channel.
    ///
    /// Slow observers that lag behind more than `bus_capacity` events skip
    /// the oldest items. Minimum value is 1 (enforced by the bus).
    pub bus_capacity: usize,

    /// Number of resource samples kept for snapshots.
    ///
    /// The external sampler pushes CPU/memory samples via
    /// [`Engine::record_sample`](crate::Engine::record_sample); the engine
    /// retains the most recent `sample_history` of them.
    pub sample_history: usize,

    /// Queue bound applied when `create_pool` is called with capacity 0.
    pub default_queue_capacity: usize,

    /// Priority used by
    /// [`Engine::create_thread_default`](crate::Engine::create_thread_default).
    pub default_priority: Priority,
}

impl EngineConfig {
    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Resolves a requested pool queue capacity, treating 0 as "default".
    #[inline]
    pub fn queue_capacity(&self, requested: usize) -> usize {
        if requested == 0 {
            self.default_queue_capacity.max(1)
        } else {
            requested
        }
    }
}

impl Default for EngineConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `sample_history = 60` (one minute at a 1s sampling interval)
    /// - `default_queue_capacity = 64`
    /// - `default_priority = Priority::Normal`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            sample_history: 60,
            default_queue_capacity: 64,
            default_priority: Priority::Normal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_queue_capacity_falls_back_to_default() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.queue_capacity(0), cfg.default_queue_capacity);
        assert_eq!(cfg.queue_capacity(8), 8);
    }

    #[test]
    fn bus_capacity_is_clamped() {
        let cfg = EngineConfig {
            bus_capacity: 0,
            ..EngineConfig::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
