//! # Function-backed work (`WorkFn`).
//!
//! [`WorkFn`] wraps a closure `F: Fn(Checkpoint) -> Fut`, producing a fresh
//! future per run. Arguments are closed over at construction; there is no
//! hidden shared state between runs — if shared state is needed, move an
//! `Arc<...>` into the closure explicitly.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::work::{Checkpoint, Work};

/// Function-backed [`Work`] implementation.
///
/// ## Example
/// ```
/// use threadvisor::{Checkpoint, TaskError, WorkFn, WorkRef};
///
/// let w: WorkRef = WorkFn::arc(|ctx: Checkpoint| async move {
///     ctx.check().await?;
///     Ok::<_, TaskError>(())
/// });
/// ```
pub struct WorkFn<F> {
    f: F,
}

impl<F> WorkFn<F> {
    /// Creates new function-backed work.
    ///
    /// Prefer [`WorkFn::arc`] when you immediately need a [`WorkRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the work and returns it as a shared handle (`Arc<Self>`).
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> Work for WorkFn<F>
where
    F: Fn(Checkpoint) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    async fn run(&self, ctx: Checkpoint) -> Result<(), TaskError> {
        (self.f)(ctx).await
    }
}
