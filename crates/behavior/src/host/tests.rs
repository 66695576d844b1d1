//! Tests for the behavior host: swap semantics and mutual exclusion.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::Duration;

use lane_core::Message;

use super::*;
use crate::error::BehaviorError;

/// Shared instrumentation for every behavior a [`MonitorSource`] hands out.
#[derive(Default)]
struct Monitor {
    in_hook: AtomicUsize,
    overlaps: AtomicUsize,
    torn: AtomicUsize,
    hooks_run: AtomicUsize,
    loads: AtomicU64,
    fail_next: AtomicBool,
    panic_on_seq: OnceLock<u64>,
    host: OnceLock<Weak<BehaviorHost>>,
}

impl Monitor {
    fn host_generation(&self) -> Option<u64> {
        self.host.get().and_then(Weak::upgrade).map(|h| h.generation())
    }
}

struct MonitorBehavior {
    id: String,
    monitor: Arc<Monitor>,
}

impl MonitorBehavior {
    fn enter(&self, item: Option<&Message>) -> Result<()> {
        if self.monitor.in_hook.fetch_add(1, Ordering::SeqCst) != 0 {
            self.monitor.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let before = self.monitor.host_generation();
        thread::sleep(Duration::from_micros(100));
        let after = self.monitor.host_generation();
        if before != after {
            self.monitor.torn.fetch_add(1, Ordering::SeqCst);
        }
        self.monitor.in_hook.fetch_sub(1, Ordering::SeqCst);
        self.monitor.hooks_run.fetch_add(1, Ordering::SeqCst);

        if let (Some(item), Some(seq)) = (item, self.monitor.panic_on_seq.get()) {
            if item.seq == *seq {
                panic!("monitor panic at seq {}", seq);
            }
        }
        Ok(())
    }
}

impl Behavior for MonitorBehavior {
    fn id(&self) -> &str {
        &self.id
    }

    fn on_config_load(&mut self) -> Result<()> {
        self.enter(None)
    }

    fn on_config_loaded(&mut self) -> Result<()> {
        self.enter(None)
    }

    fn on_dispatch(&mut self, item: &Message) -> Result<()> {
        self.enter(Some(item))
    }

    fn on_dispatched(&mut self, item: &Message) -> Result<()> {
        if item.seq == u64::MAX {
            return Err(BehaviorError::Hook {
                hook: crate::behavior::Hook::OnDispatched,
                message: "rejected".to_string(),
            });
        }
        self.enter(Some(item))
    }
}

struct MonitorSource {
    monitor: Arc<Monitor>,
}

impl BehaviorSource for MonitorSource {
    fn describe(&self) -> String {
        "monitor".to_string()
    }

    fn load(&self) -> Result<Box<dyn Behavior>> {
        if self.monitor.fail_next.swap(false, Ordering::SeqCst) {
            return Err(BehaviorError::Compile("injected failure".to_string()));
        }
        let n = self.monitor.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MonitorBehavior {
            id: format!("monitor-{}", n),
            monitor: self.monitor.clone(),
        }))
    }
}

fn monitor_host() -> (Arc<Monitor>, Arc<BehaviorHost>) {
    let monitor = Arc::new(Monitor::default());
    let source = MonitorSource {
        monitor: monitor.clone(),
    };
    let host = Arc::new(BehaviorHost::load("test/monitor", Box::new(source)).unwrap());
    let _ = monitor.host.set(Arc::downgrade(&host));
    (monitor, host)
}

#[test]
fn initial_load_failure_is_returned() {
    let monitor = Arc::new(Monitor::default());
    monitor.fail_next.store(true, Ordering::SeqCst);
    let source = MonitorSource {
        monitor: monitor.clone(),
    };
    let err = BehaviorHost::load("test/monitor", Box::new(source)).unwrap_err();
    assert!(err.is_compilation());
}

#[test]
fn reload_swaps_behavior_and_bumps_generation() {
    let (_monitor, host) = monitor_host();
    assert_eq!(host.active_id(), "monitor-0");
    assert_eq!(host.generation(), 0);

    assert_eq!(host.update_behavior().unwrap(), 1);
    assert_eq!(host.active_id(), "monitor-1");
    assert_eq!(host.generation(), 1);
}

#[test]
fn failed_reload_keeps_previous_behavior() {
    let (monitor, host) = monitor_host();
    monitor.fail_next.store(true, Ordering::SeqCst);

    assert!(host.update_behavior().is_err());
    assert_eq!(host.active_id(), "monitor-0");
    assert_eq!(host.generation(), 0);
    assert_eq!(host.failed_reloads(), 1);

    host.on_dispatch(&Message::empty(1)).unwrap();
    host.on_dispatched(&Message::empty(1)).unwrap();
    assert_eq!(monitor.hooks_run.load(Ordering::SeqCst), 2);
}

#[test]
fn hook_error_propagates_and_releases_lock() {
    let (_monitor, host) = monitor_host();
    let err = host.on_dispatched(&Message::empty(u64::MAX)).unwrap_err();
    assert!(matches!(err, BehaviorError::Hook { .. }));
    host.on_dispatch(&Message::empty(1)).unwrap();
}

#[test]
fn panicking_hook_releases_lock() {
    let (monitor, host) = monitor_host();
    monitor.panic_on_seq.set(3).unwrap();

    let result = panic::catch_unwind(AssertUnwindSafe(|| host.on_dispatch(&Message::empty(3))));
    assert!(result.is_err());

    host.on_dispatch(&Message::empty(4)).unwrap();
    assert_eq!(host.update_behavior().unwrap(), 1);
}

#[test]
fn with_active_runs_under_lock() {
    let (_monitor, host) = monitor_host();
    let id = host.with_active(|b| b.id().to_string());
    assert_eq!(id, "monitor-0");
}

#[test]
fn dispatch_racing_reload_never_overlaps() {
    const DISPATCHERS: usize = 4;
    const DISPATCHES: u64 = 150;
    const RELOADERS: usize = 2;
    const RELOADS: u64 = 40;

    let (monitor, host) = monitor_host();

    let mut handles = Vec::new();
    for t in 0..DISPATCHERS {
        let host = host.clone();
        handles.push(thread::spawn(move || {
            for i in 0..DISPATCHES {
                let item = Message::empty(t as u64 * 1_000 + i);
                host.on_dispatch(&item).unwrap();
                host.on_dispatched(&item).unwrap();
            }
        }));
    }
    for _ in 0..RELOADERS {
        let host = host.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..RELOADS {
                host.update_behavior().unwrap();
                thread::yield_now();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(monitor.overlaps.load(Ordering::SeqCst), 0);
    assert_eq!(monitor.torn.load(Ordering::SeqCst), 0);
    assert_eq!(
        monitor.hooks_run.load(Ordering::SeqCst),
        DISPATCHERS * DISPATCHES as usize * 2
    );
    assert_eq!(host.generation(), RELOADERS as u64 * RELOADS);
}
