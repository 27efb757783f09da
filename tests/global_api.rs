//! Tests for the process-global surface. The global instance is shared
//! state, so every test here serializes on one lock.

use jobsys::{Context, Error, Priority};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

static GLOBAL_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn test_initialize_round_trip() {
    let _guard = GLOBAL_LOCK.lock().unwrap();

    for _ in 0..2 {
        jobsys::initialize().unwrap();
        assert!(jobsys::thread_count(Priority::High) >= 1);
        assert_eq!(jobsys::thread_count(Priority::Streaming), 1);

        let context = Context::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        jobsys::dispatch(&context, 100, 10, move |_args| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        jobsys::wait(&context);
        assert_eq!(hits.load(Ordering::SeqCst), 100);

        jobsys::shutdown();
        assert_eq!(jobsys::thread_count(Priority::High), 0);
    }
}

#[test]
fn test_double_initialize_is_an_error() {
    let _guard = GLOBAL_LOCK.lock().unwrap();

    jobsys::initialize().unwrap();
    assert!(matches!(
        jobsys::initialize(),
        Err(Error::AlreadyInitialized)
    ));
    jobsys::shutdown();
}

#[test]
fn test_submissions_without_initialize_are_no_ops() {
    let _guard = GLOBAL_LOCK.lock().unwrap();

    let context = Context::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let hits_clone = hits.clone();
    jobsys::execute(&context, move |_args| {
        hits_clone.fetch_add(1, Ordering::SeqCst);
    });
    let hits_clone = hits.clone();
    jobsys::dispatch(&context, 100, 10, move |_args| {
        hits_clone.fetch_add(1, Ordering::SeqCst);
    });
    jobsys::wait(&context);

    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(!jobsys::is_busy(&context));
    assert_eq!(jobsys::thread_count(Priority::High), 0);
}

#[test]
fn test_shutdown_without_initialize_is_safe() {
    let _guard = GLOBAL_LOCK.lock().unwrap();
    jobsys::shutdown();
    jobsys::shutdown();
}
