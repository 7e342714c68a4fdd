//! # Builder for constructing an engine with optional observers.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;

use crate::config::EngineConfig;
use crate::engine::core::Engine;
use crate::events::Bus;
use crate::observers::{Observe, ObserverSet};

/// Builder returned by [`Engine::builder`].
pub struct EngineBuilder {
    cfg: EngineConfig,
    observers: Vec<Arc<dyn Observe>>,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            cfg,
            observers: Vec::new(),
        }
    }

    /// Adds one lifecycle event observer.
    pub fn with_observer(mut self, observer: Arc<dyn Observe>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Sets the full observer list, replacing any added so far.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observe>>) -> Self {
        self.observers = observers;
        self
    }

    /// Builds the engine and starts the event fan-out listener.
    ///
    /// Must be called within a tokio runtime.
    pub fn build(self) -> Arc<Engine> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let observers = Arc::new(ObserverSet::new(self.observers, bus.clone()));

        // Single listener: Bus → ObserverSet fan-out. Ends when the engine
        // (the last bus sender) drops.
        let mut rx = bus.subscribe();
        let set = Arc::clone(&observers);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(_)) => continue,
                }
            }
        });

        Arc::new(Engine::new_internal(self.cfg, bus, observers))
    }
}
