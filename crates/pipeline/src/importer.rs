//! [`QueueImporter`]: a periodic producer stage.
//!
//! Construction runs the configuration hooks. Once running, the producer
//! thread synthesizes one [`Message`] right away and then one every
//! `interval`, scheduling each dispatch on the node's scheduler. Dispatch runs
//! `on_dispatch`, forwards to the next stage (if any), then `on_dispatched`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use lane_behavior::HookSink;
use lane_core::{Config, Message};
use lane_scheduler::{ErrorSink, Scheduler, SchedulerExt};
use tracing::{debug, info};

use crate::dynamic::DynamicBehaviorNode;
use crate::error::NodeError;
use crate::node::{NextStage, PipelineNode};

struct Producer {
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct QueueImporter {
    node: DynamicBehaviorNode,
    interval: Duration,
    next: Option<Arc<dyn NextStage>>,
    next_seq: AtomicU64,
    producer: Mutex<Option<Producer>>,
}

impl QueueImporter {
    /// Build the stage and run its configuration hooks.
    ///
    /// Fails when `interval` is zero or a configuration hook fails.
    pub fn new(node: DynamicBehaviorNode, interval: Duration) -> Result<Self, NodeError> {
        if interval.is_zero() {
            return Err(NodeError::InvalidInterval {
                stage: node.name().to_string(),
            });
        }
        let importer = Self {
            node,
            interval,
            next: None,
            next_seq: AtomicU64::new(0),
            producer: Mutex::new(None),
        };
        importer.load_config()?;
        Ok(importer)
    }

    /// Forward every dispatched item to `next`.
    pub fn with_next(mut self, next: Arc<dyn NextStage>) -> Self {
        self.next = Some(next);
        self
    }

    pub fn from_config(config: &Config, hooks: Arc<dyn HookSink>, errors: Arc<dyn ErrorSink>) -> Result<Self, NodeError> {
        let node = DynamicBehaviorNode::from_config(config, hooks, errors)?;
        Self::new(node, config.node.interval())
    }

    pub fn node(&self) -> &DynamicBehaviorNode {
        &self.node
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run the configuration hooks around the stage's (empty) config load.
    /// Called by [`QueueImporter::new`]; calling it again reruns the hooks.
    pub fn load_config(&self) -> Result<(), NodeError> {
        self.node.on_config_load()?;
        info!(node = %self.node.name(), interval_ms = self.interval.as_millis() as u64, "stage config loaded");
        self.node.on_config_loaded()
    }

    /// Process one item on the calling thread.
    pub fn dispatch(&self, item: &Message) -> Result<(), NodeError> {
        self.node.on_dispatch(item)?;
        if let Some(next) = &self.next {
            next.post_item(item.clone())?;
        }
        self.node.on_dispatched(item)
    }

    /// Hand `item` to the scheduler; its dispatch runs later on a worker.
    pub fn schedule_dispatch(self: &Arc<Self>, item: Message) {
        self.node.scheduler().schedule_with(
            |(stage, item): (Arc<Self>, Message)| {
                stage.dispatch(&item)?;
                Ok(())
            },
            (Arc::clone(self), item),
        );
    }

    /// Synthesize the next item and schedule it. Returns its sequence number.
    pub fn produce_one(self: &Arc<Self>) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        debug!(node = %self.node.name(), seq, "produced item");
        self.schedule_dispatch(Message::empty(seq));
        seq
    }

    /// Items produced so far.
    pub fn produced(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Stop the producer thread. Already scheduled dispatches still run.
    pub fn stop(&self) {
        let producer = self
            .producer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(Producer { stop, handle }) = producer {
            let _ = stop.send(());
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
            info!(node = %self.node.name(), produced = self.produced(), "producer stopped");
        }
    }

    fn unsupported(&self, operation: &'static str) -> NodeError {
        NodeError::Unsupported {
            stage: self.node.name().to_string(),
            operation,
        }
    }
}

impl PipelineNode for QueueImporter {
    fn name(&self) -> &str {
        self.node.name()
    }

    fn scheduler(&self) -> &Arc<dyn Scheduler> {
        self.node.scheduler()
    }

    /// Start the producer thread. Calling `run` on a running stage is a no-op.
    fn run(self: Arc<Self>) -> Result<(), NodeError> {
        let mut slot = self.producer.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Ok(());
        }

        let (stop, ticks) = mpsc::channel::<()>();
        let interval = self.interval;
        let stage = Arc::downgrade(&self);
        let handle = thread::Builder::new()
            .name(format!("produce-{}", self.node.name()))
            .spawn(move || loop {
                match stage.upgrade() {
                    Some(stage) => {
                        stage.produce_one();
                    }
                    None => break,
                }
                match ticks.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(NodeError::Spawn)?;

        *slot = Some(Producer { stop, handle });
        info!(
            node = %self.node.name(),
            scheduler = %self.node.scheduler().name(),
            interval_ms = interval.as_millis() as u64,
            "producer started"
        );
        Ok(())
    }

    /// Items are synthesized internally; external submission is not implemented.
    fn post_item(&self, _item: Message) -> Result<(), NodeError> {
        Err(self.unsupported("post_item"))
    }

    fn post_items(&self, _items: Vec<Message>) -> Result<(), NodeError> {
        Err(self.unsupported("post_items"))
    }
}

impl Drop for QueueImporter {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for QueueImporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueImporter")
            .field("node", &self.node)
            .field("interval", &self.interval)
            .field("produced", &self.produced())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use lane_behavior::{Hook, MemoryHookSink, ScriptSource};
    use lane_scheduler::WorkerPool;
    use tempfile::TempDir;

    use super::*;
    use crate::node::NodeBase;

    const SCRIPT: &str = "apiVersion: v1\nkind: Behavior\nmetadata:\n  id: importer-test\nhooks:\n  on_config_load: load\n  on_config_loaded: loaded\n  on_dispatch: \"in {{ item.seq }}\"\n  on_dispatched: \"out {{ item.seq }}\"\n";

    #[derive(Default)]
    struct Collector {
        items: Mutex<Vec<u64>>,
    }

    impl NextStage for Collector {
        fn post_item(&self, item: Message) -> Result<(), NodeError> {
            self.items.lock().unwrap().push(item.seq);
            Ok(())
        }
    }

    fn node_in(dir: &TempDir, sink: Arc<MemoryHookSink>) -> DynamicBehaviorNode {
        fs::write(dir.path().join("stage.yml"), SCRIPT).unwrap();
        let source = ScriptSource::with_sink(dir.path(), "importer/test", sink);
        let base = NodeBase::from_concurrency("test", false, WorkerPool::global());
        DynamicBehaviorNode::new(base, Box::new(source), None).unwrap()
    }

    fn importer(dir: &TempDir) -> (Arc<MemoryHookSink>, QueueImporter) {
        let sink = Arc::new(MemoryHookSink::new());
        let node = node_in(dir, sink.clone());
        (sink, QueueImporter::new(node, Duration::from_millis(20)).unwrap())
    }

    #[test]
    fn construction_runs_config_hooks() {
        let dir = TempDir::new().expect("create tempdir");
        let (sink, importer) = importer(&dir);
        let texts: Vec<_> = sink.snapshot().into_iter().map(|o| o.text).collect();
        assert_eq!(texts, vec!["load", "loaded"]);
        assert_eq!(importer.produced(), 0);

        importer.load_config().unwrap();
        assert_eq!(sink.len(), 4);
    }

    #[test]
    fn failing_config_hook_fails_construction() {
        let dir = TempDir::new().expect("create tempdir");
        let sink = Arc::new(MemoryHookSink::new());
        let node = node_in(&dir, sink.clone());
        fs::write(
            dir.path().join("stage.yml"),
            SCRIPT.replace("on_config_loaded: loaded", "on_config_loaded: \"{{ fail('no config') }}\""),
        )
        .unwrap();
        node.update_behavior().unwrap();

        let err = QueueImporter::new(node, Duration::from_millis(20)).unwrap_err();
        assert!(matches!(err, NodeError::Behavior(_)), "error: {:?}", err);
        assert_eq!(sink.texts(Hook::OnConfigLoad), vec!["load".to_string()]);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let dir = TempDir::new().expect("create tempdir");
        let sink = Arc::new(MemoryHookSink::new());
        let node = node_in(&dir, sink.clone());

        let err = QueueImporter::new(node, Duration::ZERO).unwrap_err();
        assert!(matches!(err, NodeError::InvalidInterval { .. }), "error: {:?}", err);
        assert!(sink.is_empty());
    }

    #[test]
    fn first_item_is_produced_without_waiting() {
        let dir = TempDir::new().expect("create tempdir");
        let sink = Arc::new(MemoryHookSink::new());
        let node = node_in(&dir, sink.clone());
        let importer = Arc::new(QueueImporter::new(node, Duration::from_secs(3600)).unwrap());

        importer.clone().run().unwrap();
        let start = std::time::Instant::now();
        while sink.texts(Hook::OnDispatched).is_empty() && start.elapsed() < Duration::from_secs(10) {
            thread::sleep(Duration::from_millis(10));
        }
        importer.stop();

        assert_eq!(importer.produced(), 1);
        assert_eq!(sink.texts(Hook::OnDispatched), vec!["out 0".to_string()]);
    }

    #[test]
    fn dispatch_forwards_between_hooks() {
        let dir = TempDir::new().expect("create tempdir");
        let (sink, importer) = importer(&dir);
        let collector = Arc::new(Collector::default());
        let importer = importer.with_next(collector.clone());

        importer.dispatch(&Message::empty(3)).unwrap();
        assert_eq!(*collector.items.lock().unwrap(), vec![3]);
        assert_eq!(sink.texts(Hook::OnDispatch), vec!["in 3".to_string()]);
        assert_eq!(sink.texts(Hook::OnDispatched), vec!["out 3".to_string()]);
    }

    #[test]
    fn external_submission_is_unsupported() {
        let dir = TempDir::new().expect("create tempdir");
        let (_sink, importer) = importer(&dir);

        let err = PipelineNode::post_item(&importer, Message::empty(0)).unwrap_err();
        assert!(matches!(err, NodeError::Unsupported { operation: "post_item", .. }));
        let err = importer.post_items(vec![Message::empty(1)]).unwrap_err();
        assert!(matches!(err, NodeError::Unsupported { operation: "post_items", .. }));
    }

    #[test]
    fn run_produces_until_stopped() {
        let dir = TempDir::new().expect("create tempdir");
        let (sink, importer) = importer(&dir);
        let importer = Arc::new(importer);

        importer.clone().run().unwrap();
        importer.clone().run().unwrap();
        assert!(importer.is_running());

        let start = std::time::Instant::now();
        while sink.texts(Hook::OnDispatched).len() < 3 && start.elapsed() < Duration::from_secs(10) {
            thread::sleep(Duration::from_millis(10));
        }
        importer.stop();
        assert!(!importer.is_running());

        let produced = importer.produced();
        assert!(produced >= 3);
        thread::sleep(Duration::from_millis(100));
        assert_eq!(importer.produced(), produced);
    }
}
