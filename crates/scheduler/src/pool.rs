//! The ambient worker pool and the unordered [`PoolScheduler`].

use std::sync::Arc;

use lane_core::config::PoolConfig;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::info;

use crate::sink::{ErrorSink, LogSink};
use crate::stats::{SchedulerStats, StatsCounters};
use crate::traits::{Job, Scheduler};

/// Where scheduled work physically runs.
///
/// Either rayon's process-wide pool or a dedicated pool owned by the caller.
/// Panics escaping a job follow rayon's policy for the pool (the default
/// handler aborts the process).
#[derive(Debug, Clone)]
pub enum WorkerPool {
    Global,
    Dedicated(Arc<ThreadPool>),
}

impl WorkerPool {
    pub fn global() -> Self {
        WorkerPool::Global
    }

    /// Build a dedicated pool with `threads` named workers.
    pub fn dedicated(threads: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("lane-worker-{}", i))
            .build()?;
        info!(threads = pool.current_num_threads(), "built dedicated worker pool");
        Ok(WorkerPool::Dedicated(Arc::new(pool)))
    }

    /// Resolve the pool described by config (0 threads = global pool).
    pub fn from_config(config: &PoolConfig) -> Result<Self, ThreadPoolBuildError> {
        if config.uses_global_pool() {
            Ok(WorkerPool::Global)
        } else {
            WorkerPool::dedicated(config.worker_threads)
        }
    }

    /// Submit a closure; returns immediately.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            WorkerPool::Global => rayon::spawn(f),
            WorkerPool::Dedicated(pool) => pool.spawn(f),
        }
    }

    pub fn current_num_threads(&self) -> usize {
        match self {
            WorkerPool::Global => rayon::current_num_threads(),
            WorkerPool::Dedicated(pool) => pool.current_num_threads(),
        }
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        WorkerPool::Global
    }
}

/// Unordered scheduler: every callback goes straight to the pool.
///
/// No ordering across submissions and no concurrency limit. Callback errors
/// go to the error sink; panics are left to the pool.
pub struct PoolScheduler {
    pool: WorkerPool,
    sink: Arc<dyn ErrorSink>,
    counters: Arc<StatsCounters>,
}

impl PoolScheduler {
    pub fn new(pool: WorkerPool) -> Self {
        Self::with_sink(pool, Arc::new(LogSink))
    }

    pub fn with_sink(pool: WorkerPool, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            pool,
            sink,
            counters: Arc::new(StatsCounters::default()),
        }
    }
}

impl Default for PoolScheduler {
    fn default() -> Self {
        Self::new(WorkerPool::Global)
    }
}

impl Scheduler for PoolScheduler {
    fn name(&self) -> &'static str {
        "pool"
    }

    fn schedule(&self, job: Job) {
        self.counters.record_submitted();
        let sink = Arc::clone(&self.sink);
        let counters = Arc::clone(&self.counters);
        self.pool.spawn(move || match job() {
            Ok(()) => counters.record_completed(),
            Err(e) => {
                counters.record_failed();
                sink.report("pool", &e);
            }
        });
    }

    fn stats(&self) -> SchedulerStats {
        self.counters.snapshot()
    }
}
