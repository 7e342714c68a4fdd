//! # Work abstraction.
//!
//! This module defines the [`Work`] trait: an async, cancelable unit of
//! work with a single `run` method. The common handle type is [`WorkRef`],
//! an `Arc<dyn Work>` suitable for sharing across the engine.
//!
//! Work receives a [`Checkpoint`] and should consult it periodically so
//! that pause and terminate requests take effect.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::work::Checkpoint;

/// # Asynchronous, cooperatively controllable unit of work.
///
/// Arbitrary callables with arbitrary arguments are represented as a
/// closed-over unit behind this single execution method; see
/// [`WorkFn`](crate::work::WorkFn) for the closure-backed adapter.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use threadvisor::{Checkpoint, TaskError, Work};
///
/// struct Demo;
///
/// #[async_trait]
/// impl Work for Demo {
///     async fn run(&self, ctx: Checkpoint) -> Result<(), TaskError> {
///         ctx.check().await?;
///         // do work...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Work: Send + Sync + 'static {
    /// Executes the work until completion or cancellation.
    ///
    /// Implementations should call `ctx.check().await?` at their own
    /// checkpoints so pause/terminate requests are honored promptly.
    async fn run(&self, ctx: Checkpoint) -> Result<(), TaskError>;
}

/// Shared handle to a unit of work.
pub type WorkRef = Arc<dyn Work>;
