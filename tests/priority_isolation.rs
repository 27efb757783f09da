use jobsys::{Context, JobSystem, Priority};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn spin_for(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

#[test]
fn test_streaming_completes_while_high_is_saturated() {
    let system = JobSystem::new().unwrap();
    let high_workers = system.thread_count(Priority::High);
    if high_workers < 2 {
        eprintln!("skipping: high tier executes inline on this machine");
        return;
    }

    // Enough 5 ms tasks to keep every high worker busy well past the
    // streaming submission below.
    let high = Context::new();
    for _ in 0..high_workers * 50 {
        system.execute(&high, |_args| {
            spin_for(Duration::from_millis(5));
        });
    }
    assert!(system.is_busy(&high));

    let streaming = Context::with_priority(Priority::Streaming);
    let streamed = Arc::new(AtomicBool::new(false));
    let streamed_clone = streamed.clone();
    system.execute(&streaming, move |_args| {
        streamed_clone.store(true, Ordering::SeqCst);
    });
    system.wait(&streaming);

    assert!(streamed.load(Ordering::SeqCst));
    assert!(
        system.is_busy(&high),
        "high tier should still have outstanding work"
    );

    system.wait(&high);
    assert!(!system.is_busy(&high));
}

#[test]
fn test_low_tier_runs_independently() {
    let system = JobSystem::new().unwrap();

    let low = Context::with_priority(Priority::Low);
    let done = Arc::new(AtomicBool::new(false));
    let done_clone = done.clone();
    system.execute(&low, move |_args| {
        done_clone.store(true, Ordering::SeqCst);
    });
    system.wait(&low);

    assert!(done.load(Ordering::SeqCst));
}
