use jobsys::{Context, JobSystem, Priority};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn spin_for(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

#[test]
fn test_spin_tasks_run_in_parallel() {
    let system = JobSystem::new().unwrap();
    if system.thread_count(Priority::High) < 7 {
        eprintln!("skipping: needs at least 7 high-priority workers");
        return;
    }

    let context = Context::new();
    let completed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();
    for _ in 0..7 {
        let completed_clone = completed.clone();
        system.execute(&context, move |_args| {
            spin_for(Duration::from_millis(100));
            completed_clone.fetch_add(1, Ordering::SeqCst);
        });
    }
    system.wait(&context);
    let elapsed = start.elapsed();

    assert_eq!(completed.load(Ordering::SeqCst), 7);
    // Seven 100 ms spins on seven workers finish in roughly one spin, far
    // under the 700 ms serial time even with scheduling noise.
    assert!(
        elapsed < Duration::from_millis(500),
        "expected parallel completion, took {elapsed:?}"
    );
}

#[test]
fn test_wait_on_idle_context_returns_immediately() {
    let system = JobSystem::new().unwrap();
    let context = Context::new();

    let start = Instant::now();
    system.wait(&context);
    assert!(start.elapsed() < Duration::from_millis(50));
    assert!(!system.is_busy(&context));
}

#[test]
fn test_not_busy_after_wait() {
    let system = JobSystem::new().unwrap();
    let context = Context::new();

    for _ in 0..32 {
        system.execute(&context, |_args| {
            spin_for(Duration::from_micros(200));
        });
    }

    system.wait(&context);
    assert!(!system.is_busy(&context));
    assert_eq!(context.outstanding_jobs(), 0);
}

#[test]
fn test_concurrent_waiters_on_one_context() {
    let system = Arc::new(JobSystem::new().unwrap());
    let context = Context::new();
    let completed = Arc::new(AtomicUsize::new(0));

    for _ in 0..64 {
        let completed_clone = completed.clone();
        system.execute(&context, move |_args| {
            spin_for(Duration::from_micros(500));
            completed_clone.fetch_add(1, Ordering::SeqCst);
        });
    }

    std::thread::scope(|scope| {
        for _ in 0..2 {
            let system = system.clone();
            let context = context.clone();
            scope.spawn(move || system.wait(&context));
        }
    });

    assert_eq!(completed.load(Ordering::SeqCst), 64);
    assert!(!context.is_busy());
}

#[test]
fn test_wait_helps_drain_the_pool() {
    // More work than the queues can hold at once; the waiter pitches in
    // rather than spinning idle.
    let system = JobSystem::new().unwrap();
    let context = Context::new();
    let completed = Arc::new(AtomicUsize::new(0));

    const JOBS: u32 = 10_000;
    let completed_clone = completed.clone();
    system.dispatch(&context, JOBS, 1, move |_args| {
        completed_clone.fetch_add(1, Ordering::SeqCst);
    });
    system.wait(&context);

    assert_eq!(completed.load(Ordering::SeqCst), JOBS as usize);
    assert_eq!(context.outstanding_jobs(), 0);
}
