//! Units of work and the cooperative control contract.
//!
//! - [`Work`]: async trait with a single `run` method;
//! - [`WorkFn`]: closure-backed implementation;
//! - [`Checkpoint`]: the pause/cancel token work consults at checkpoints.

mod checkpoint;
#[allow(clippy::module_inception)]
mod work;
mod work_fn;

pub use checkpoint::Checkpoint;
pub use work::{Work, WorkRef};
pub use work_fn::WorkFn;
