//! [`OrderedScheduler`] and its drain loop.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::anyhow;
use tracing::debug;

use crate::pool::WorkerPool;
use crate::sink::{ErrorSink, LogSink};
use crate::stats::{SchedulerStats, StatsCounters};
use crate::traits::{Job, Scheduler};

/// A queued callback.
struct WorkItem {
    callback: Job,
    seq: u64,
}

struct LaneState {
    queue: VecDeque<WorkItem>,
    /// Set while a drain task owns the lane.
    draining: bool,
    next_seq: u64,
}

struct Lane {
    pool: WorkerPool,
    sink: Arc<dyn ErrorSink>,
    state: Mutex<LaneState>,
    counters: StatsCounters,
}

/// FIFO scheduler: callbacks run in submission order, never two at once.
///
/// Cloning is cheap and clones share the same lane.
#[derive(Clone)]
pub struct OrderedScheduler {
    lane: Arc<Lane>,
}

impl OrderedScheduler {
    pub fn new(pool: WorkerPool) -> Self {
        Self::with_sink(pool, Arc::new(LogSink))
    }

    pub fn with_sink(pool: WorkerPool, sink: Arc<dyn ErrorSink>) -> Self {
        Self {
            lane: Arc::new(Lane {
                pool,
                sink,
                state: Mutex::new(LaneState {
                    queue: VecDeque::new(),
                    draining: false,
                    next_seq: 0,
                }),
                counters: StatsCounters::default(),
            }),
        }
    }

    /// Callbacks queued but not yet started.
    pub fn pending(&self) -> usize {
        self.lane.lock_state().queue.len()
    }

    /// Whether a drain task currently owns the lane.
    pub fn is_draining(&self) -> bool {
        self.lane.lock_state().draining
    }
}

impl Default for OrderedScheduler {
    fn default() -> Self {
        Self::new(WorkerPool::Global)
    }
}

impl Scheduler for OrderedScheduler {
    fn name(&self) -> &'static str {
        "ordered"
    }

    fn schedule(&self, job: Job) {
        self.lane.counters.record_submitted();

        let claimed = {
            let mut state = self.lane.lock_state();
            let seq = state.next_seq;
            state.next_seq += 1;
            state.queue.push_back(WorkItem { callback: job, seq });
            if state.draining {
                false
            } else {
                state.draining = true;
                true
            }
        };

        // Ownership was claimed under the lock, so exactly one drain task is
        // spawned per idle-to-busy transition.
        if claimed {
            let lane = Arc::clone(&self.lane);
            self.lane.pool.spawn(move || lane.drain());
        }
    }

    fn stats(&self) -> SchedulerStats {
        self.lane.counters.snapshot()
    }
}

impl Lane {
    fn lock_state(&self) -> MutexGuard<'_, LaneState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn drain(&self) {
        let mut ran = 0u64;
        loop {
            let item = {
                let mut state = self.lock_state();
                match state.queue.pop_front() {
                    Some(item) => item,
                    None => {
                        // Empty observed under the enqueue lock: release ownership.
                        state.draining = false;
                        break;
                    }
                }
            };
            self.run(item);
            ran += 1;
        }
        debug!(ran, "ordered lane drained");
    }

    /// Run one callback; failures and panics are reported, never propagated.
    fn run(&self, item: WorkItem) {
        let WorkItem { callback, seq } = item;
        let outcome = panic::catch_unwind(AssertUnwindSafe(callback));
        let error = match outcome {
            Ok(Ok(())) => {
                self.counters.record_completed();
                return;
            }
            Ok(Err(e)) => e.context(format!("ordered job #{} failed", seq)),
            Err(payload) => anyhow!("ordered job #{} panicked: {}", seq, panic_message(&*payload)),
        };
        self.counters.record_failed();
        self.sink.report("ordered", &error);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
