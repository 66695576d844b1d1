//! Work scheduling for pipeline stages.
//!
//! This crate provides:
//! - [`Scheduler`] trait: fire-and-forget submission of a callback plus its state
//! - [`PoolScheduler`]: unordered, delegates straight to a rayon [`WorkerPool`]
//! - [`OrderedScheduler`]: FIFO lane over the same pool with at most one active worker
//! - [`ErrorSink`] for failures raised inside scheduled callbacks

pub mod kind;
pub mod ordered;
pub mod pool;
pub mod sink;
pub mod stats;
pub mod traits;

pub use kind::SchedulerKind;
pub use ordered::OrderedScheduler;
pub use pool::{PoolScheduler, WorkerPool};
pub use sink::{ErrorSink, LogSink};
pub use stats::SchedulerStats;
pub use traits::{Job, JobResult, Scheduler, SchedulerExt};
