//! Construction-time scheduler selection.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::ordered::OrderedScheduler;
use crate::pool::{PoolScheduler, WorkerPool};
use crate::sink::ErrorSink;
use crate::traits::Scheduler;

/// Which scheduler variant a stage runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SchedulerKind {
    /// Unordered; callbacks may run concurrently.
    Pool,
    /// FIFO lane; one callback at a time.
    Ordered,
}

impl SchedulerKind {
    /// `concurrent = true` selects [`SchedulerKind::Pool`], otherwise
    /// [`SchedulerKind::Ordered`].
    pub fn from_concurrency(concurrent: bool) -> Self {
        if concurrent {
            SchedulerKind::Pool
        } else {
            SchedulerKind::Ordered
        }
    }

    pub fn build(self, pool: WorkerPool, sink: Arc<dyn ErrorSink>) -> Arc<dyn Scheduler> {
        match self {
            SchedulerKind::Pool => Arc::new(PoolScheduler::with_sink(pool, sink)),
            SchedulerKind::Ordered => Arc::new(OrderedScheduler::with_sink(pool, sink)),
        }
    }
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerKind::Pool => write!(f, "pool"),
            SchedulerKind::Ordered => write!(f, "ordered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::LogSink;

    #[test]
    fn concurrency_flag_selects_variant() {
        assert_eq!(SchedulerKind::from_concurrency(true), SchedulerKind::Pool);
        assert_eq!(SchedulerKind::from_concurrency(false), SchedulerKind::Ordered);
    }

    #[test]
    fn built_scheduler_reports_its_kind() {
        for kind in [SchedulerKind::Pool, SchedulerKind::Ordered] {
            let scheduler = kind.build(WorkerPool::global(), Arc::new(LogSink));
            assert_eq!(scheduler.name(), kind.to_string());
        }
    }
}
