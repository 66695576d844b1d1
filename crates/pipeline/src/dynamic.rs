//! [`DynamicBehaviorNode`]: a stage whose processing logic can be swapped at runtime.

use std::sync::Arc;
use std::time::Duration;

use lane_behavior::{BehaviorHost, BehaviorSource, BehaviorWatcher, HookSink, ScriptSource};
use lane_core::{Config, Message};
use lane_scheduler::{ErrorSink, Scheduler, SchedulerKind, WorkerPool};
use tracing::{debug, warn};

use crate::error::NodeError;
use crate::node::NodeBase;

/// A stage plus its hot-swappable behavior.
///
/// Every hook call takes the host's lock, so hooks never overlap each other
/// or a reload swap. When a debounce window is given and the source has a
/// directory, edits under it trigger [`update_behavior`](Self::update_behavior).
pub struct DynamicBehaviorNode {
    base: NodeBase,
    host: Arc<BehaviorHost>,
    watcher: Option<BehaviorWatcher>,
}

impl DynamicBehaviorNode {
    /// Load the initial behavior (failure is returned) and optionally start
    /// watching its sources (failure is logged, the node runs without reloads).
    pub fn new(base: NodeBase, source: Box<dyn BehaviorSource>, watch: Option<Duration>) -> Result<Self, NodeError> {
        let host = Arc::new(BehaviorHost::load(base.name(), source)?);

        let watcher = match (watch, host.watch_path()) {
            (Some(window), Some(dir)) => match BehaviorWatcher::start(dir, window, Arc::downgrade(&host)) {
                Ok(w) => Some(w),
                Err(e) => {
                    warn!(
                        node = %base.name(),
                        path = %dir.display(),
                        error = %e,
                        "failed to watch behavior sources, hot reload disabled"
                    );
                    None
                }
            },
            (Some(_), None) => {
                debug!(node = %base.name(), "behavior source has no directory to watch");
                None
            }
            (None, _) => None,
        };

        Ok(Self { base, host, watcher })
    }

    /// Node named and wired from config: scripts under
    /// `<script_root>/<category>/<name>`, scheduler from `concurrent`.
    pub fn from_config(config: &Config, hooks: Arc<dyn HookSink>, errors: Arc<dyn ErrorSink>) -> Result<Self, NodeError> {
        let pool = WorkerPool::from_config(&config.pool)?;
        let base = NodeBase::new(
            config.node.name.clone(),
            SchedulerKind::from_concurrency(config.node.concurrent),
            pool,
            errors,
        );
        let stage = format!("{}/{}", config.node.category, config.node.name);
        let source = ScriptSource::with_sink(config.node.source_dir(), stage, hooks);
        let watch = config.watcher.enabled.then(|| config.watcher.debounce());
        Self::new(base, Box::new(source), watch)
    }

    pub fn base(&self) -> &NodeBase {
        &self.base
    }

    pub fn name(&self) -> &str {
        self.base.name()
    }

    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        self.base.scheduler()
    }

    pub fn host(&self) -> &Arc<BehaviorHost> {
        &self.host
    }

    pub fn watcher(&self) -> Option<&BehaviorWatcher> {
        self.watcher.as_ref()
    }

    pub fn on_config_load(&self) -> Result<(), NodeError> {
        Ok(self.host.on_config_load()?)
    }

    pub fn on_config_loaded(&self) -> Result<(), NodeError> {
        Ok(self.host.on_config_loaded()?)
    }

    pub fn on_dispatch(&self, item: &Message) -> Result<(), NodeError> {
        Ok(self.host.on_dispatch(item)?)
    }

    pub fn on_dispatched(&self, item: &Message) -> Result<(), NodeError> {
        Ok(self.host.on_dispatched(item)?)
    }

    /// Rebuild the behavior and swap it in; the old one stays on failure.
    pub fn update_behavior(&self) -> Result<u64, NodeError> {
        Ok(self.host.update_behavior()?)
    }
}

impl std::fmt::Debug for DynamicBehaviorNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicBehaviorNode")
            .field("base", &self.base)
            .field("host", &self.host)
            .field("watcher", &self.watcher)
            .finish()
    }
}
