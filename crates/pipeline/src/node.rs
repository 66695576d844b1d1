//! The [`PipelineNode`] contract and the shared [`NodeBase`].

use std::sync::Arc;

use lane_core::Message;
use lane_scheduler::{ErrorSink, Job, LogSink, Scheduler, SchedulerKind, WorkerPool};
use tracing::debug;

use crate::error::NodeError;

/// A named pipeline stage. Name and scheduler are fixed at construction.
pub trait PipelineNode: Send + Sync {
    fn name(&self) -> &str;

    fn scheduler(&self) -> &Arc<dyn Scheduler>;

    /// Start the stage's background production, if it has any.
    fn run(self: Arc<Self>) -> Result<(), NodeError>;

    /// Enqueue one item for processing; returns without waiting for it.
    fn post_item(&self, item: Message) -> Result<(), NodeError>;

    fn post_items(&self, items: Vec<Message>) -> Result<(), NodeError> {
        for item in items {
            self.post_item(item)?;
        }
        Ok(())
    }
}

/// Where a stage forwards items after processing them.
pub trait NextStage: Send + Sync {
    fn post_item(&self, item: Message) -> Result<(), NodeError>;
}

impl<N: PipelineNode + ?Sized> NextStage for N {
    fn post_item(&self, item: Message) -> Result<(), NodeError> {
        PipelineNode::post_item(self, item)
    }
}

/// Name plus scheduler: the part every stage has.
#[derive(Clone)]
pub struct NodeBase {
    name: String,
    kind: SchedulerKind,
    scheduler: Arc<dyn Scheduler>,
}

impl NodeBase {
    pub fn new(name: impl Into<String>, kind: SchedulerKind, pool: WorkerPool, sink: Arc<dyn ErrorSink>) -> Self {
        let name = name.into();
        debug!(node = %name, scheduler = %kind, threads = pool.current_num_threads(), "creating node");
        Self {
            name,
            kind,
            scheduler: kind.build(pool, sink),
        }
    }

    /// `concurrent = true` runs on the unordered pool, otherwise on an ordered lane.
    pub fn from_concurrency(name: impl Into<String>, concurrent: bool, pool: WorkerPool) -> Self {
        Self::new(name, SchedulerKind::from_concurrency(concurrent), pool, Arc::new(LogSink))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SchedulerKind {
        self.kind
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }

    pub fn schedule(&self, job: Job) {
        self.scheduler.schedule(job);
    }
}

impl std::fmt::Debug for NodeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeBase")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("stats", &self.scheduler.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_flag_picks_scheduler() {
        let ordered = NodeBase::from_concurrency("a", false, WorkerPool::global());
        assert_eq!(ordered.kind(), SchedulerKind::Ordered);
        assert_eq!(ordered.scheduler().name(), "ordered");

        let pooled = NodeBase::from_concurrency("b", true, WorkerPool::global());
        assert_eq!(pooled.kind(), SchedulerKind::Pool);
        assert_eq!(pooled.scheduler().name(), "pool");
        assert_eq!(pooled.name(), "b");
    }
}
