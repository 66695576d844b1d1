//! Debounce timing tests. Windows are scaled down with wide margins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::*;

const WINDOW: Duration = Duration::from_millis(150);

fn counting_debouncer() -> (Arc<AtomicU64>, Debouncer) {
    let runs = Arc::new(AtomicU64::new(0));
    let debouncer = Debouncer::spawn("test", WINDOW, {
        let runs = runs.clone();
        move || {
            runs.fetch_add(1, Ordering::SeqCst);
        }
    })
    .unwrap();
    (runs, debouncer)
}

fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    cond()
}

#[test]
fn starts_idle() {
    let (runs, debouncer) = counting_debouncer();
    assert_eq!(debouncer.state(), WatchState::Idle);
    thread::sleep(WINDOW * 2);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[test]
fn burst_inside_window_runs_once() {
    let (runs, debouncer) = counting_debouncer();
    let trigger = debouncer.trigger_handle();

    for _ in 0..10 {
        trigger.trigger();
        thread::sleep(WINDOW / 10);
    }
    assert_eq!(debouncer.state(), WatchState::PendingReload);

    assert!(wait_until(WINDOW * 10, || debouncer.reload_count() == 1));
    thread::sleep(WINDOW * 3);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(debouncer.state(), WatchState::Idle);
}

#[test]
fn spaced_triggers_run_once_each() {
    let (runs, debouncer) = counting_debouncer();

    for expected in 1..=3 {
        debouncer.trigger();
        assert!(wait_until(WINDOW * 10, || debouncer.reload_count() == expected));
        thread::sleep(WINDOW);
    }
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

#[test]
fn extending_the_deadline_delays_the_action() {
    let (runs, debouncer) = counting_debouncer();
    let start = Instant::now();

    debouncer.trigger();
    thread::sleep(WINDOW * 2 / 3);
    debouncer.trigger();

    assert!(wait_until(WINDOW * 10, || runs.load(Ordering::SeqCst) == 1));
    assert!(start.elapsed() >= WINDOW * 2 / 3 + WINDOW);
}

#[test]
fn trigger_during_reload_schedules_another_run() {
    let runs = Arc::new(AtomicU64::new(0));
    let debouncer = Debouncer::spawn("slow", WINDOW, {
        let runs = runs.clone();
        move || {
            thread::sleep(WINDOW * 2);
            runs.fetch_add(1, Ordering::SeqCst);
        }
    })
    .unwrap();

    debouncer.trigger();
    assert!(wait_until(WINDOW * 10, || debouncer.state() == WatchState::Reloading));
    debouncer.trigger();

    assert!(wait_until(WINDOW * 20, || runs.load(Ordering::SeqCst) == 2));
    assert!(wait_until(WINDOW * 10, || debouncer.state() == WatchState::Idle));
}

#[test]
fn panicking_action_keeps_timer_alive() {
    let runs = Arc::new(AtomicU64::new(0));
    let debouncer = Debouncer::spawn("panicky", WINDOW, {
        let runs = runs.clone();
        move || {
            if runs.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first reload fails hard");
            }
        }
    })
    .unwrap();

    debouncer.trigger();
    assert!(wait_until(WINDOW * 10, || debouncer.reload_count() == 1));
    debouncer.trigger();
    assert!(wait_until(WINDOW * 10, || debouncer.reload_count() == 2));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn drop_discards_pending_deadline() {
    let (runs, debouncer) = counting_debouncer();
    let trigger = debouncer.trigger_handle();

    debouncer.trigger();
    drop(debouncer);
    trigger.trigger();

    thread::sleep(WINDOW * 3);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}
