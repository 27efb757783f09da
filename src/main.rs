use jobsys::{Context, Priority};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn stopwatch<F: FnOnce()>(label: &str, body: F) {
    let start = Instant::now();
    body();
    println!("  {label}: {:?}", start.elapsed());
}

fn spin_for(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

fn main() {
    println!("jobsys - Priority-Partitioned Parallel Job Scheduler\n");

    jobsys::initialize().expect("job system failed to start");
    println!(
        "Workers: high={} low={} streaming={}\n",
        jobsys::thread_count(Priority::High),
        jobsys::thread_count(Priority::Low),
        jobsys::thread_count(Priority::Streaming)
    );

    // Example 1: seven spin tasks, serial vs executed in parallel.
    println!("Example 1: spin tasks");
    let spin = Duration::from_millis(20);
    stopwatch("serial spins", || {
        for _ in 0..7 {
            spin_for(spin);
        }
    });
    stopwatch("parallel spins", || {
        let context = Context::new();
        for _ in 0..7 {
            jobsys::execute(&context, move |_args| spin_for(spin));
        }
        jobsys::wait(&context);
    });

    // Example 2: bulk transform, serial vs dispatched in groups of 1000.
    println!("\nExample 2: bulk transform");
    let count = 1_500_000u32;
    let data: Arc<Vec<AtomicU32>> = Arc::new((0..count).map(AtomicU32::new).collect());

    stopwatch("serial transform", || {
        for cell in data.iter() {
            let value = cell.load(Ordering::Relaxed);
            cell.store(value.wrapping_mul(31).wrapping_add(7), Ordering::Relaxed);
        }
    });
    stopwatch("dispatched transform", || {
        let context = Context::new();
        let data = data.clone();
        jobsys::dispatch(&context, count, 1000, move |args| {
            let cell = &data[args.job_index as usize];
            let value = cell.load(Ordering::Relaxed);
            cell.store(value.wrapping_mul(31).wrapping_add(7), Ordering::Relaxed);
        });
        jobsys::wait(&context);
    });

    // Example 3: streaming work stays off the high-priority pool.
    println!("\nExample 3: streaming alongside high-priority load");
    stopwatch("mixed priorities", || {
        let frame = Context::new();
        jobsys::dispatch(&frame, 100_000, 500, |_args| {
            std::hint::black_box(0u64);
        });

        let streaming = Context::with_priority(Priority::Streaming);
        jobsys::execute(&streaming, |_args| spin_for(Duration::from_millis(5)));

        jobsys::wait(&streaming);
        jobsys::wait(&frame);
    });

    println!("\nShutting down...");
    jobsys::shutdown();
    println!("Done.");
}
