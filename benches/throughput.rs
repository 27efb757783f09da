//! Submission throughput benchmark using criterion.
//!
//! Measures how fast single jobs move through the high-priority pool when
//! submitted one at a time from the main thread.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use jobsys::{Config, Context, JobSystem};

const JOB_COUNT: usize = 10_000;

fn bench_execute_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute_throughput");
    group.throughput(Throughput::Elements(JOB_COUNT as u64));
    group.sample_size(10);

    for threads in [2u32, 4, 8] {
        if (threads as usize) > num_cpus::get() {
            continue;
        }
        let system =
            JobSystem::with_config(Config::new().with_max_thread_count(threads)).unwrap();

        // Warmup
        for _ in 0..100 {
            let context = Context::new();
            system.execute(&context, |_args| {});
            system.wait(&context);
        }

        group.bench_function(BenchmarkId::new("submit_and_wait", threads), |b| {
            b.iter(|| {
                let context = Context::new();
                for _ in 0..JOB_COUNT {
                    system.execute(&context, |_args| {
                        std::hint::black_box(1 + 1);
                    });
                }
                system.wait(&context);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_execute_throughput);
criterion_main!(benches);
