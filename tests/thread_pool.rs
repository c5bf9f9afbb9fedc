use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_utils::thread::scope;
use taskpool::{AnyValue, PoolConfig, PoolError, PoolMode, PoolState, Task, ThreadPool};

struct RangeSum {
    begin: u64,
    end: u64,
}

impl Task for RangeSum {
    fn run(&self) -> AnyValue {
        let mut sum: u64 = 0;
        for i in self.begin..=self.end {
            sum += i;
        }
        AnyValue::new(sum)
    }
}

fn quick_config(mode: PoolMode, queue_capacity: usize) -> PoolConfig {
    PoolConfig {
        mode,
        queue_capacity,
        submit_timeout: Duration::from_millis(100),
        idle_timeout: Duration::from_millis(200),
        idle_poll: Duration::from_millis(20),
        ..PoolConfig::default()
    }
}

fn sleepy(ms: u64, value: usize) -> impl FnOnce() -> usize + Send + 'static {
    move || {
        thread::sleep(Duration::from_millis(ms));
        value
    }
}

#[test]
fn fixed_pool_sums_disjoint_ranges() {
    let pool = ThreadPool::new();
    pool.set_queue_capacity(4).unwrap();
    pool.start(2).unwrap();

    let span = 100_000_000;
    let results: Vec<_> = (0..5)
        .map(|i| {
            pool.submit(RangeSum {
                begin: i * span + 1,
                end: (i + 1) * span,
            })
        })
        .collect();

    assert!(results.iter().all(|r| r.is_valid()));
    let total: u64 = results.iter().map(|r| r.get_as::<u64>().unwrap()).sum();
    assert_eq!(total, 500_000_000_500_000_000);
    assert_eq!(pool.stats().peak_workers, 2);
}

#[test]
fn value_is_taken_once() {
    let pool = ThreadPool::new();
    pool.start(1).unwrap();

    let result = pool.submit(|| AnyValue::new(String::from("done")));
    assert_eq!(result.get().cast::<String>().unwrap(), "done");

    let start = Instant::now();
    let again = result.get();
    assert!(again.is_empty());
    assert!(start.elapsed() < Duration::from_millis(100));
}

#[test]
fn single_worker_runs_tasks_in_submission_order() {
    let pool = ThreadPool::with_config(quick_config(PoolMode::Fixed, 64)).unwrap();
    pool.start(1).unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    let results: Vec<_> = (0..32)
        .map(|i| {
            let order = order.clone();
            pool.submit_fn(move || order.lock().unwrap().push(i))
        })
        .collect();
    for result in &results {
        assert!(result.is_valid());
        result.get();
    }

    assert_eq!(*order.lock().unwrap(), (0..32).collect::<Vec<_>>());
}

#[test]
fn wrong_type_is_a_mismatch() {
    let pool = ThreadPool::new();
    pool.start(1).unwrap();

    let result = pool.submit_fn(|| 5i32);
    match result.get_as::<String>() {
        Err(PoolError::TypeMismatch { found, .. }) => assert_eq!(found, "i32"),
        other => panic!("expected a type mismatch, got {other:?}"),
    }
}

#[test]
fn full_queue_rejects_without_blocking() {
    let pool = ThreadPool::with_config(PoolConfig {
        submit_timeout: Duration::from_millis(50),
        ..quick_config(PoolMode::Fixed, 1)
    })
    .unwrap();
    pool.start(1).unwrap();

    let results: Vec<_> = (0..4).map(|i| pool.submit_fn(sleepy(300, i))).collect();

    let rejected: Vec<_> = results.iter().filter(|r| !r.is_valid()).collect();
    assert!(!rejected.is_empty());
    for result in &rejected {
        let start = Instant::now();
        assert!(result.get().is_empty());
        assert!(matches!(result.get_as::<usize>(), Err(PoolError::Rejected)));
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    for (i, result) in results.iter().enumerate().filter(|(_, r)| r.is_valid()) {
        assert_eq!(result.get_as::<usize>().unwrap(), i);
    }
}

#[test]
fn fixed_pool_never_grows() {
    let pool = ThreadPool::with_config(quick_config(PoolMode::Fixed, 64)).unwrap();
    pool.start(3).unwrap();

    let results: Vec<_> = (0..20).map(|i| pool.submit_fn(sleepy(5, i))).collect();
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.get_as::<usize>().unwrap(), i);
    }

    let stats = pool.stats();
    assert_eq!(stats.peak_workers, 3);
    assert_eq!(stats.spawned, 3);
    assert_eq!(stats.live_workers, 3);
}

#[test]
fn cached_pool_grows_then_shrinks_to_initial() {
    let pool = ThreadPool::with_config(PoolConfig {
        thread_ceiling: 6,
        ..quick_config(PoolMode::Cached, 2)
    })
    .unwrap();
    pool.start(2).unwrap();

    let results: Vec<_> = (0..6).map(|i| pool.submit_fn(sleepy(200, i))).collect();
    for result in &results {
        assert!(result.is_valid());
    }

    let peak = pool.stats().peak_workers;
    assert!(peak > 2, "pool did not grow: peak {peak}");
    assert!(peak <= 6, "pool exceeded its ceiling: peak {peak}");

    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.get_as::<usize>().unwrap(), i);
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while pool.stats().live_workers > 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(pool.stats().live_workers, 2);

    thread::sleep(Duration::from_millis(400));
    let stats = pool.stats();
    assert_eq!(stats.live_workers, 2);
    assert_eq!(stats.idle_workers, 2);
    assert_eq!(stats.spawned - stats.retired, 2);
}

#[test]
fn shutdown_runs_every_queued_task() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut pool = ThreadPool::with_config(quick_config(PoolMode::Fixed, 16)).unwrap();
    pool.start(1).unwrap();

    for _ in 0..8 {
        let counter = counter.clone();
        // results dropped immediately; the tasks must still run
        pool.submit_fn(move || {
            thread::sleep(Duration::from_millis(10));
            counter.fetch_add(1, Ordering::SeqCst);
        });
    }

    pool.shutdown();
    assert_eq!(counter.load(Ordering::SeqCst), 8);
    assert_eq!(pool.state(), PoolState::Stopped);

    let stats = pool.stats();
    assert_eq!(stats.live_workers, 0);
    assert_eq!(stats.queued_tasks, 0);
    assert_eq!(stats.spawned, stats.retired);
}

#[test]
fn drop_drains_cached_pool() {
    let counter = Arc::new(AtomicUsize::new(0));
    {
        let pool = ThreadPool::with_config(PoolConfig {
            thread_ceiling: 4,
            ..quick_config(PoolMode::Cached, 4)
        })
        .unwrap();
        pool.start(2).unwrap();
        for _ in 0..6 {
            let counter = counter.clone();
            pool.submit_fn(move || {
                thread::sleep(Duration::from_millis(20));
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
    }
    assert_eq!(counter.load(Ordering::SeqCst), 6);
}

#[test]
fn configuration_is_frozen_while_running() {
    let mut pool = ThreadPool::new();
    pool.set_mode(PoolMode::Cached).unwrap();
    pool.start(2).unwrap();

    assert_eq!(pool.state(), PoolState::Running);
    assert!(matches!(pool.set_mode(PoolMode::Fixed), Err(PoolError::AlreadyRunning)));
    assert!(matches!(pool.set_queue_capacity(8), Err(PoolError::AlreadyRunning)));
    assert!(matches!(pool.set_thread_ceiling(8), Err(PoolError::AlreadyRunning)));
    assert!(matches!(pool.start(2), Err(PoolError::AlreadyRunning)));

    pool.shutdown();
    pool.set_mode(PoolMode::Fixed).unwrap();
    assert_eq!(pool.config().mode, PoolMode::Fixed);
}

#[test]
fn invalid_settings_are_rejected() {
    let pool = ThreadPool::new();
    assert!(matches!(pool.set_queue_capacity(0), Err(PoolError::InvalidConfig(_))));
    assert!(matches!(pool.set_thread_ceiling(0), Err(PoolError::InvalidConfig(_))));
    assert!(matches!(pool.start(0), Err(PoolError::InvalidConfig(_))));
    assert_eq!(pool.state(), PoolState::Stopped);
}

#[test]
fn start_above_ceiling_raises_ceiling() {
    let pool = ThreadPool::new();
    pool.set_mode(PoolMode::Cached).unwrap();
    pool.set_thread_ceiling(2).unwrap();
    pool.start(4).unwrap();

    assert_eq!(pool.config().thread_ceiling, 4);
    assert_eq!(pool.stats().live_workers, 4);
}

#[test]
fn submit_to_stopped_pool_is_rejected() {
    let pool = ThreadPool::new();
    let result = pool.submit_fn(|| 1u8);
    assert!(!result.is_valid());
    assert!(result.get().is_empty());
}

#[test]
fn panicking_task_yields_empty_value() {
    let pool = ThreadPool::new();
    pool.start(1).unwrap();

    let failed = pool.submit_fn(|| -> u32 { panic!("task failure") });
    assert!(failed.get().is_empty());

    let ok = pool.submit_fn(|| 3u32);
    assert_eq!(ok.get_as::<u32>().unwrap(), 3);
    assert_eq!(pool.stats().live_workers, 1);
}

#[test]
fn pool_restarts_after_shutdown() {
    let mut pool = ThreadPool::new();
    pool.start(2).unwrap();
    assert_eq!(pool.submit_fn(|| 1u64).get_as::<u64>().unwrap(), 1);
    pool.shutdown();

    pool.start(3).unwrap();
    assert_eq!(pool.submit_fn(|| 2u64).get_as::<u64>().unwrap(), 2);
    let stats = pool.stats();
    assert_eq!(stats.live_workers, 3);
    assert_eq!(stats.spawned, 5);
    assert_eq!(stats.retired, 2);
}

#[test]
fn concurrent_submitters() {
    let pool = ThreadPool::new();
    pool.set_mode(PoolMode::Cached).unwrap();
    pool.set_thread_ceiling(8).unwrap();
    pool.start(2).unwrap();

    let total = scope(|s| {
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let pool = &pool;
                s.spawn(move |_| {
                    (0..25u64)
                        .map(|i| pool.submit_fn(move || t * 100 + i))
                        .collect::<Vec<_>>()
                        .iter()
                        .map(|r| r.get_as::<u64>().unwrap())
                        .sum::<u64>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum::<u64>()
    })
    .unwrap();

    let expected: u64 = (0..4u64).flat_map(|t| (0..25u64).map(move |i| t * 100 + i)).sum();
    assert_eq!(total, expected);
    assert!(pool.stats().peak_workers <= 8);
}
