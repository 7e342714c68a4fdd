//! # Counting semaphore with explicit acquire/release.
//!
//! Wraps [`tokio::sync::Semaphore`] (which queues waiters fairly, so no
//! acquirer starves under finitely many releases) and tracks the holder
//! count so `available()` is observable and the capacity invariant is
//! enforced.
//!
//! ## Rules
//! - `available ∈ [0, capacity]` always.
//! - `acquire()` suspends while no permit is available.
//! - `release()` without a matching `acquire()` is a bug in the caller and
//!   panics: the invariant cannot be recovered.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::RuntimeError;

/// Counting semaphore bounding concurrent holders to `capacity`.
///
/// Callers pair each successful [`Semaphore::acquire`] with exactly one
/// [`Semaphore::release`]; the permit is not tied to a guard object.
#[derive(Debug)]
pub struct Semaphore {
    capacity: usize,
    holders: AtomicUsize,
    inner: tokio::sync::Semaphore,
}

impl Semaphore {
    /// Creates a semaphore admitting up to `capacity` concurrent holders.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            holders: AtomicUsize::new(0),
            inner: tokio::sync::Semaphore::new(capacity),
        }
    }

    /// Acquires one permit, suspending while none is available.
    ///
    /// Fails with [`RuntimeError::EngineClosed`] once the semaphore has
    /// been closed (engine shutdown releases all primitives).
    pub async fn acquire(&self) -> Result<(), RuntimeError> {
        match self.inner.acquire().await {
            Ok(permit) => {
                permit.forget();
                self.holders.fetch_add(1, Ordering::AcqRel);
                Ok(())
            }
            Err(_closed) => Err(RuntimeError::EngineClosed),
        }
    }

    /// Releases one permit, waking a suspended acquirer if any.
    ///
    /// # Panics
    /// Panics when called without a matching `acquire()` — the count would
    /// exceed capacity, which is a fatal invariant violation.
    pub fn release(&self) {
        let prev = self.holders.fetch_sub(1, Ordering::AcqRel);
        assert!(prev != 0, "semaphore released more times than acquired");
        self.inner.add_permits(1);
    }

    /// Number of permits currently available.
    pub fn available(&self) -> usize {
        self.capacity
            .saturating_sub(self.holders.load(Ordering::Acquire))
    }

    /// The fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Closes the semaphore: pending and future acquires fail with
    /// `EngineClosed`. Used by engine shutdown.
    pub fn close(&self) {
        self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn tracks_available_permits() {
        let sem = Semaphore::new(2);
        assert_eq!(sem.available(), 2);
        sem.acquire().await.unwrap();
        assert_eq!(sem.available(), 1);
        sem.acquire().await.unwrap();
        assert_eq!(sem.available(), 0);
        sem.release();
        assert_eq!(sem.available(), 1);
        sem.release();
        assert_eq!(sem.available(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn never_admits_more_holders_than_capacity() {
        let sem = Arc::new(Semaphore::new(3));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let sem = Arc::clone(&sem);
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            tasks.push(tokio::spawn(async move {
                sem.acquire().await.unwrap();
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                sem.release();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        assert!(peak.load(Ordering::SeqCst) <= 3, "holders exceeded capacity");
        assert_eq!(sem.available(), 3);
    }

    #[tokio::test]
    async fn close_fails_pending_and_future_acquires() {
        let sem = Arc::new(Semaphore::new(1));
        sem.acquire().await.unwrap();

        let waiter = {
            let sem = Arc::clone(&sem);
            tokio::spawn(async move { sem.acquire().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        sem.close();
        assert_eq!(waiter.await.unwrap(), Err(RuntimeError::EngineClosed));
        assert_eq!(sem.acquire().await, Err(RuntimeError::EngineClosed));
    }

    #[test]
    #[should_panic(expected = "released more times than acquired")]
    fn over_release_is_fatal() {
        let sem = Semaphore::new(1);
        sem.release();
    }
}
