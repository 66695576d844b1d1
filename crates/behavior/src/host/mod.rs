//! [`BehaviorHost`]: the single active behavior of a stage.
//!
//! Hook invocations and reload swaps share one mutex, so a hook never runs
//! while its instance is being replaced and two hooks never run at once.
//! Building the replacement happens before the lock is taken.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use lane_core::Message;
use tracing::{info, warn};

use crate::behavior::{Behavior, BehaviorSource};
use crate::error::Result;

#[cfg(test)]
mod tests;

pub struct BehaviorHost {
    stage: String,
    source: Box<dyn BehaviorSource>,
    active: Mutex<Box<dyn Behavior>>,
    /// Successful swaps since construction (the initial load is generation 0).
    generation: AtomicU64,
    failed_reloads: AtomicU64,
}

impl BehaviorHost {
    /// Load the first behavior from `source`.
    ///
    /// Unlike a reload, a failure here is returned to the caller: a host
    /// never exists without an active behavior.
    pub fn load(stage: impl Into<String>, source: Box<dyn BehaviorSource>) -> Result<Self> {
        let stage = stage.into();
        let behavior = source.load()?;
        info!(
            stage = %stage,
            source = %source.describe(),
            behavior_id = %behavior.id(),
            "behavior loaded"
        );
        Ok(Self {
            stage,
            source,
            active: Mutex::new(behavior),
            generation: AtomicU64::new(0),
            failed_reloads: AtomicU64::new(0),
        })
    }

    // A hook that panicked leaves the mutex poisoned; the instance itself is
    // still whole, so later callers keep using it.
    fn lock(&self) -> MutexGuard<'_, Box<dyn Behavior>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_config_load(&self) -> Result<()> {
        self.lock().on_config_load()
    }

    pub fn on_config_loaded(&self) -> Result<()> {
        self.lock().on_config_loaded()
    }

    pub fn on_dispatch(&self, item: &Message) -> Result<()> {
        self.lock().on_dispatch(item)
    }

    pub fn on_dispatched(&self, item: &Message) -> Result<()> {
        self.lock().on_dispatched(item)
    }

    /// Rebuild the behavior from its source and swap it in.
    ///
    /// On failure the active behavior is left untouched, the failure is
    /// logged and returned. Returns the new generation on success.
    pub fn update_behavior(&self) -> Result<u64> {
        let replacement = match self.source.load() {
            Ok(b) => b,
            Err(e) => {
                self.failed_reloads.fetch_add(1, Ordering::Relaxed);
                warn!(
                    stage = %self.stage,
                    source = %self.source.describe(),
                    error = %e,
                    "behavior reload failed, keeping previous behavior"
                );
                return Err(e);
            }
        };

        let new_id = replacement.id().to_string();
        let (previous, generation) = {
            let mut guard = self.lock();
            let previous = std::mem::replace(&mut *guard, replacement);
            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            (previous, generation)
        };

        info!(
            stage = %self.stage,
            previous_id = %previous.id(),
            behavior_id = %new_id,
            generation,
            "behavior reloaded"
        );
        drop(previous);
        Ok(generation)
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn failed_reloads(&self) -> u64 {
        self.failed_reloads.load(Ordering::Relaxed)
    }

    /// Id of the active behavior. Takes the lock, so it waits for a running hook.
    pub fn active_id(&self) -> String {
        self.lock().id().to_string()
    }

    /// Run `f` against the active behavior while holding the lock.
    pub fn with_active<R>(&self, f: impl FnOnce(&mut dyn Behavior) -> R) -> R {
        let mut guard = self.lock();
        f(&mut **guard)
    }

    pub fn watch_path(&self) -> Option<&Path> {
        self.source.watch_path()
    }
}

impl std::fmt::Debug for BehaviorHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorHost")
            .field("stage", &self.stage)
            .field("source", &self.source.describe())
            .field("generation", &self.generation())
            .field("failed_reloads", &self.failed_reloads())
            .finish()
    }
}
