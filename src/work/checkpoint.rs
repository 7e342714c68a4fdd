//! # Cooperative control token handed to running work.
//!
//! [`Checkpoint`] is the contract between the engine and a unit of work:
//! the engine only sets flags (pause, cancel), and the work consults them
//! at points of its own choosing by calling [`Checkpoint::check`]. There is
//! no preemption — a pause or terminate request takes effect at the next
//! checkpoint, not instantaneously.
//!
//! ## Rules
//! - `check()` returns `Err(TaskError::Canceled)` once the cancel flag is set.
//! - `check()` suspends while the pause flag is set, resuming on unpause.
//! - Terminate always wins: cancellation interrupts a paused wait.

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Pause/cancel token consulted by running work at its checkpoints.
///
/// Cloneable; clones observe the same flags. Work that loops should call
/// [`Checkpoint::check`] once per iteration and propagate the error with `?`:
///
/// ```rust,no_run
/// use threadvisor::{Checkpoint, TaskError};
///
/// async fn crunch(ctx: Checkpoint) -> Result<(), TaskError> {
///     for _chunk in 0..1024 {
///         ctx.check().await?;
///         // process one chunk...
///     }
///     Ok(())
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Checkpoint {
    cancel: CancellationToken,
    gate: watch::Receiver<bool>,
}

impl Checkpoint {
    pub(crate) fn new(cancel: CancellationToken, gate: watch::Receiver<bool>) -> Self {
        Self { cancel, gate }
    }

    /// Builds a checkpoint that can be cancelled but never pauses.
    ///
    /// Used for pool jobs: queued work supports cancellation before start,
    /// but there is no pause control once a worker picks it up.
    pub(crate) fn unpaused(cancel: CancellationToken) -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { cancel, gate: rx }
    }

    /// Returns true once termination has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Returns true while a pause request is pending or in effect.
    pub fn is_paused(&self) -> bool {
        *self.gate.borrow()
    }

    /// Observes the control flags; the checkpoint proper.
    ///
    /// Returns immediately when neither flag is set. Suspends while paused.
    /// Returns `Err(TaskError::Canceled)` when termination was requested,
    /// including while suspended in a pause — terminate overrides pause.
    pub async fn check(&self) -> Result<(), TaskError> {
        if self.cancel.is_cancelled() {
            return Err(TaskError::Canceled);
        }
        if !*self.gate.borrow() {
            return Ok(());
        }

        let mut gate = self.gate.clone();
        loop {
            if self.cancel.is_cancelled() {
                return Err(TaskError::Canceled);
            }
            if !*gate.borrow_and_update() {
                return Ok(());
            }
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(TaskError::Canceled),
                changed = gate.changed() => {
                    // Sender dropped: the owning record is gone, stop gating.
                    if changed.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn check_passes_when_unflagged() {
        let (_tx, rx) = watch::channel(false);
        let ctx = Checkpoint::new(CancellationToken::new(), rx);
        assert!(ctx.check().await.is_ok());
    }

    #[tokio::test]
    async fn check_fails_once_cancelled() {
        let (_tx, rx) = watch::channel(false);
        let token = CancellationToken::new();
        let ctx = Checkpoint::new(token.clone(), rx);
        token.cancel();
        assert_eq!(ctx.check().await, Err(TaskError::Canceled));
    }

    #[tokio::test]
    async fn check_suspends_while_paused_and_resumes() {
        let (tx, rx) = watch::channel(true);
        let ctx = Checkpoint::new(CancellationToken::new(), rx);

        let waiter = tokio::spawn(async move { ctx.check().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        tx.send_replace(false);
        assert_eq!(waiter.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn cancel_interrupts_a_paused_wait() {
        let (_tx, rx) = watch::channel(true);
        let token = CancellationToken::new();
        let ctx = Checkpoint::new(token.clone(), rx);

        let waiter = tokio::spawn(async move { ctx.check().await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
        assert_eq!(waiter.await.unwrap(), Err(TaskError::Canceled));
    }
}
