//! Cross-thread ordering and submission-latency properties of the schedulers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use lane_scheduler::{OrderedScheduler, PoolScheduler, Scheduler, SchedulerExt, WorkerPool};

const PRODUCERS: usize = 8;
const PER_PRODUCER: usize = 250;

#[test]
fn ordered_lane_preserves_global_enqueue_order_across_producers() {
    let scheduler = Arc::new(OrderedScheduler::new(
        WorkerPool::dedicated(4).expect("build pool"),
    ));

    // Producers draw a ticket and enqueue while holding the ticket lock, so
    // ticket order is exactly enqueue order.
    let ticket = Arc::new(Mutex::new(0usize));
    let executed = Arc::new(Mutex::new(Vec::with_capacity(PRODUCERS * PER_PRODUCER)));
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let (done_tx, done_rx) = mpsc::channel();

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let scheduler = Arc::clone(&scheduler);
            let ticket = Arc::clone(&ticket);
            let executed = Arc::clone(&executed);
            let active = Arc::clone(&active);
            let max_active = Arc::clone(&max_active);
            let done_tx = done_tx.clone();
            thread::spawn(move || {
                for _ in 0..PER_PRODUCER {
                    let mut next = ticket.lock().unwrap();
                    let seq = *next;
                    *next += 1;

                    let executed = Arc::clone(&executed);
                    let active = Arc::clone(&active);
                    let max_active = Arc::clone(&max_active);
                    let done_tx = done_tx.clone();
                    scheduler.schedule_with(
                        move |seq| {
                            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                            max_active.fetch_max(now, Ordering::SeqCst);
                            executed.lock().unwrap().push(seq);
                            active.fetch_sub(1, Ordering::SeqCst);
                            done_tx.send(()).unwrap();
                            Ok(())
                        },
                        seq,
                    );
                    drop(next);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    for _ in 0..PRODUCERS * PER_PRODUCER {
        done_rx.recv_timeout(Duration::from_secs(30)).unwrap();
    }

    let executed = executed.lock().unwrap();
    let expected: Vec<usize> = (0..PRODUCERS * PER_PRODUCER).collect();
    assert_eq!(*executed, expected);
    assert_eq!(max_active.load(Ordering::SeqCst), 1, "callbacks overlapped");
}

#[test]
fn pool_schedule_returns_before_the_callback_finishes() {
    let scheduler = PoolScheduler::new(WorkerPool::dedicated(2).expect("build pool"));
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let (done_tx, done_rx) = mpsc::channel();

    let started = Instant::now();
    scheduler.schedule(Box::new(move || {
        release_rx.recv().unwrap();
        done_tx.send(()).unwrap();
        Ok(())
    }));
    let elapsed = started.elapsed();

    // The callback cannot finish until released, yet schedule already returned.
    assert!(done_rx.try_recv().is_err());
    assert!(elapsed < Duration::from_millis(500), "schedule blocked for {:?}", elapsed);

    release_tx.send(()).unwrap();
    done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
}

#[test]
fn pool_scheduler_runs_callbacks_concurrently() {
    let scheduler = PoolScheduler::new(WorkerPool::dedicated(4).expect("build pool"));
    let barrier = Arc::new(std::sync::Barrier::new(3));
    let (done_tx, done_rx) = mpsc::channel();

    // Three callbacks that can only finish if they run at the same time.
    for _ in 0..3 {
        let barrier = Arc::clone(&barrier);
        let done_tx = done_tx.clone();
        scheduler.schedule(Box::new(move || {
            barrier.wait();
            done_tx.send(()).unwrap();
            Ok(())
        }));
    }

    for _ in 0..3 {
        done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
    }
}

#[test]
fn pool_errors_reach_the_sink_not_the_caller() {
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let sink = move |scheduler: &str, error: &anyhow::Error| {
        tx.lock()
            .unwrap()
            .send(format!("{}: {}", scheduler, error))
            .unwrap();
    };
    let scheduler = PoolScheduler::with_sink(WorkerPool::global(), Arc::new(sink));

    scheduler.schedule(Box::new(|| Err(anyhow::anyhow!("unreachable upstream"))));

    let report = rx.recv_timeout(Duration::from_secs(10)).unwrap();
    assert_eq!(report, "pool: unreachable upstream");
}

#[test]
fn worker_pool_reports_its_thread_count() {
    assert_eq!(WorkerPool::dedicated(3).expect("build pool").current_num_threads(), 3);
    assert_eq!(WorkerPool::global().current_num_threads(), rayon::current_num_threads());
}
