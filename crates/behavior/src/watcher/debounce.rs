//! Single-deadline debouncer on one timer thread.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error};

use crate::error::{BehaviorError, Result};

/// Reload state of a watched stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchState {
    Idle,
    /// An event arrived; the action runs when the deadline passes quietly.
    PendingReload,
    Reloading,
}

#[derive(Debug, Default)]
struct Slot {
    deadline: Option<Instant>,
    reloading: bool,
    shutdown: bool,
}

#[derive(Debug)]
struct Shared {
    slot: Mutex<Slot>,
    cond: Condvar,
    window: Duration,
    reloads: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle that arms (or re-arms) the debounce deadline.
#[derive(Debug, Clone)]
pub struct DebounceTrigger {
    shared: Arc<Shared>,
}

impl DebounceTrigger {
    pub fn trigger(&self) {
        let mut slot = self.shared.lock();
        if slot.shutdown {
            return;
        }
        slot.deadline = Some(Instant::now() + self.shared.window);
        self.shared.cond.notify_one();
    }
}

/// Runs an action once per burst of triggers, after `window` without a new one.
///
/// Triggers that arrive while the action is running arm a fresh deadline, so
/// the action runs again afterwards. Dropping the debouncer discards any
/// pending deadline and joins the timer thread.
#[derive(Debug)]
pub struct Debouncer {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn spawn<F>(name: &str, window: Duration, action: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::default()),
            cond: Condvar::new(),
            window,
            reloads: AtomicU64::new(0),
        });

        let thread = thread::Builder::new()
            .name(format!("debounce-{}", name))
            .spawn({
                let shared = shared.clone();
                move || run_timer(&shared, action)
            })
            .map_err(BehaviorError::WatcherThread)?;

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    pub fn trigger(&self) {
        self.trigger_handle().trigger();
    }

    pub fn trigger_handle(&self) -> DebounceTrigger {
        DebounceTrigger {
            shared: self.shared.clone(),
        }
    }

    pub fn state(&self) -> WatchState {
        let slot = self.shared.lock();
        if slot.reloading {
            WatchState::Reloading
        } else if slot.deadline.is_some() {
            WatchState::PendingReload
        } else {
            WatchState::Idle
        }
    }

    /// Number of times the action has run.
    pub fn reload_count(&self) -> u64 {
        self.shared.reloads.load(Ordering::SeqCst)
    }

    pub fn window(&self) -> Duration {
        self.shared.window
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        {
            let mut slot = self.shared.lock();
            slot.shutdown = true;
            slot.deadline = None;
            self.shared.cond.notify_all();
        }
        if let Some(handle) = self.thread.take() {
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

fn run_timer<F: FnMut()>(shared: &Shared, mut action: F) {
    let mut slot = shared.lock();
    loop {
        if slot.shutdown {
            return;
        }

        let Some(deadline) = slot.deadline else {
            slot = shared.cond.wait(slot).unwrap_or_else(PoisonError::into_inner);
            continue;
        };

        let now = Instant::now();
        if now < deadline {
            slot = match shared.cond.wait_timeout(slot, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
            continue;
        }

        slot.deadline = None;
        slot.reloading = true;
        drop(slot);

        debug!("debounce window elapsed, running reload");
        if panic::catch_unwind(AssertUnwindSafe(|| action())).is_err() {
            error!("debounced reload panicked");
        }
        shared.reloads.fetch_add(1, Ordering::SeqCst);

        slot = shared.lock();
        slot.reloading = false;
    }
}
