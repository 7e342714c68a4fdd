//! # Reusable barrier with generation tracking.
//!
//! All parties of one cycle release together when the last one arrives;
//! the arrival count resets and the generation increments. A waiter that
//! arrived in generation G is only ever released by the trip that ends G —
//! later arrivals start a fresh cycle and cannot leak into an older one.

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::error::RuntimeError;

#[derive(Debug, Clone, Copy)]
struct TripSignal {
    generation: u64,
    closed: bool,
}

#[derive(Debug)]
struct BarrierState {
    arrived: usize,
    generation: u64,
    closed: bool,
}

/// Reusable rendezvous point for a fixed number of parties.
#[derive(Debug)]
pub struct Barrier {
    parties: usize,
    state: Mutex<BarrierState>,
    trip: watch::Sender<TripSignal>,
}

impl Barrier {
    /// Creates a barrier for `parties` participants (minimum 1).
    pub fn new(parties: usize) -> Self {
        let (trip, _rx) = watch::channel(TripSignal {
            generation: 0,
            closed: false,
        });
        Self {
            parties: parties.max(1),
            state: Mutex::new(BarrierState {
                arrived: 0,
                generation: 0,
                closed: false,
            }),
            trip,
        }
    }

    /// Arrives at the barrier and suspends until the cycle trips.
    ///
    /// Returns the generation number the trip completed (the first trip of
    /// a fresh barrier returns 1). The caller whose arrival completes the
    /// cycle releases everyone and returns without suspending.
    ///
    /// Fails with [`RuntimeError::EngineClosed`] once the barrier has been
    /// closed, including for already-suspended waiters.
    pub async fn await_arrival(&self) -> Result<u64, RuntimeError> {
        let waited_generation = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(RuntimeError::EngineClosed);
            }
            state.arrived += 1;
            if state.arrived == self.parties {
                state.arrived = 0;
                state.generation += 1;
                let _ = self.trip.send(TripSignal {
                    generation: state.generation,
                    closed: false,
                });
                return Ok(state.generation);
            }
            state.generation
        };

        let mut rx = self.trip.subscribe();
        loop {
            let signal = *rx.borrow_and_update();
            if signal.closed {
                return Err(RuntimeError::EngineClosed);
            }
            if signal.generation > waited_generation {
                return Ok(waited_generation + 1);
            }
            if rx.changed().await.is_err() {
                // Barrier dropped while waiting; nothing can trip it now.
                return Err(RuntimeError::EngineClosed);
            }
        }
    }

    /// Number of parties required to trip the barrier.
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Parties currently arrived and waiting in the open cycle.
    pub fn waiting(&self) -> usize {
        self.state.lock().arrived
    }

    /// Completed trip count; also the generation the next trip will end.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    /// Closes the barrier: pending and future arrivals fail with
    /// `EngineClosed`. Used by engine shutdown.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let _ = self.trip.send(TripSignal {
            generation: state.generation,
            closed: true,
        });
    }
}
