//! Engine core: registries, control API, snapshots, and teardown.

mod builder;
mod core;
mod snapshot;

pub use builder::EngineBuilder;
pub use core::Engine;
pub use snapshot::{
    EngineMetrics, GroupInfo, PoolInfo, ResourceSample, Snapshot, StatusCounts, ThreadInfo,
};
