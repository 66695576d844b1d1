//! The [`Scheduler`] submission contract.

use crate::stats::SchedulerStats;

/// Outcome of a scheduled callback.
pub type JobResult = anyhow::Result<()>;

/// A scheduled callback with its state already bound.
pub type Job = Box<dyn FnOnce() -> JobResult + Send + 'static>;

/// Accepts callbacks for later execution on some worker.
///
/// `schedule` never waits for the callback to start or finish. Errors
/// returned by the callback are routed to the scheduler's
/// [`ErrorSink`](crate::ErrorSink); they never reach the submitter.
pub trait Scheduler: Send + Sync {
    /// Short label used in logs and error reports.
    fn name(&self) -> &'static str;

    /// Submit a callback for execution.
    fn schedule(&self, job: Job);

    /// Snapshot of submission/completion counters.
    fn stats(&self) -> SchedulerStats;
}

/// Convenience submission with explicit state, mirroring the
/// `schedule(callback, state)` shape callers tend to think in.
pub trait SchedulerExt: Scheduler {
    fn schedule_with<S, F>(&self, callback: F, state: S)
    where
        S: Send + 'static,
        F: FnOnce(S) -> JobResult + Send + 'static,
    {
        self.schedule(Box::new(move || callback(state)));
    }
}

impl<T: Scheduler + ?Sized> SchedulerExt for T {}
