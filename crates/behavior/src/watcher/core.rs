//! Recursive `notify` watch on a stage directory.

use std::path::{Path, PathBuf};
use std::sync::Weak;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use super::debounce::{Debouncer, WatchState};
use crate::error::Result;
use crate::host::BehaviorHost;

/// Watches a stage's source directory and reloads its host after each burst
/// of changes.
///
/// The host is held weakly: once its owner is gone, pending reloads do nothing.
pub struct BehaviorWatcher {
    // Declared first so event delivery stops before the debouncer shuts down.
    _watcher: RecommendedWatcher,
    debouncer: Debouncer,
    dir: PathBuf,
}

impl BehaviorWatcher {
    pub fn start(dir: &Path, window: Duration, host: Weak<BehaviorHost>) -> Result<Self> {
        let stage = host
            .upgrade()
            .map(|h| h.stage().to_string())
            .unwrap_or_default();
        let debouncer = Debouncer::spawn(&stage, window, move || {
            if let Some(host) = host.upgrade() {
                // Failures are logged by the host and leave the old behavior active.
                let _ = host.update_behavior();
            }
        })?;
        Self::with_debouncer(dir, debouncer)
    }

    /// Watch `dir` and feed change events into an existing debouncer.
    pub fn with_debouncer(dir: &Path, debouncer: Debouncer) -> Result<Self> {
        let trigger = debouncer.trigger_handle();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if is_change(&event.kind) => {
                debug!(kind = ?event.kind, paths = ?event.paths, "behavior source changed");
                trigger.trigger();
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "behavior watcher error"),
        })?;
        watcher.watch(dir, RecursiveMode::Recursive)?;

        info!(
            path = %dir.display(),
            debounce_ms = debouncer.window().as_millis() as u64,
            "watching behavior sources (recursive)"
        );
        Ok(Self {
            _watcher: watcher,
            debouncer,
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state(&self) -> WatchState {
        self.debouncer.state()
    }

    pub fn reload_count(&self) -> u64 {
        self.debouncer.reload_count()
    }
}

impl std::fmt::Debug for BehaviorWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorWatcher")
            .field("dir", &self.dir)
            .field("state", &self.state())
            .field("reload_count", &self.reload_count())
            .finish()
    }
}

fn is_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
