//! Scheduler state, configuration, and the submission surface.
//!
//! A [`JobSystem`] owns one worker pool per [`Priority`] tier plus the alive
//! flag every worker polls. Tier sizing follows the observed hardware
//! concurrency: High gets `cores - 1` workers, Low gets `cores - 2`, and
//! Streaming gets a single worker, each clamped to
//! `[1, Config::max_thread_count]`.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::context::Context;
use crate::job::{Job, JobArgs, Priority, Task};
use crate::pool::{self, Pool, WorkerParams};

/// Per-worker queue capacity used when [`Config`] does not override it.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Hook invoked on a worker thread as it starts or exits.
///
/// Receives the worker's tier and home index. Embedders use this to apply an
/// OS thread priority, register the thread with a profiler, and similar
/// platform concerns the scheduler itself stays out of.
pub trait WorkerHook: Send + Sync {
    fn run(&self, priority: Priority, worker_index: u32);
}

impl<F> WorkerHook for F
where
    F: Fn(Priority, u32) + Send + Sync,
{
    fn run(&self, priority: Priority, worker_index: u32) {
        self(priority, worker_index)
    }
}

/// Scheduler construction options.
#[derive(Clone)]
pub struct Config {
    max_thread_count: u32,
    queue_capacity: usize,
    pin_worker_threads: bool,
    start_hook: Option<Arc<dyn WorkerHook>>,
    exit_hook: Option<Arc<dyn WorkerHook>>,
}

impl Config {
    pub fn new() -> Self {
        Config {
            max_thread_count: u32::MAX,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            pin_worker_threads: false,
            start_hook: None,
            exit_hook: None,
        }
    }

    /// Caps the worker count of every tier. Clamped to at least one.
    pub fn with_max_thread_count(mut self, max_thread_count: u32) -> Self {
        self.max_thread_count = max_thread_count.max(1);
        self
    }

    /// Capacity of each per-worker queue. Clamped to at least one.
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity.max(1);
        self
    }

    /// Pins workers to cores: High and Low workers walk the core ids
    /// starting at index 1, leaving core 0 to the main thread; the Streaming
    /// worker takes the last core.
    pub fn with_pinning(mut self, pin_worker_threads: bool) -> Self {
        self.pin_worker_threads = pin_worker_threads;
        self
    }

    /// Runs on each worker thread right after it starts.
    pub fn with_start_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(Priority, u32) + Send + Sync + 'static,
    {
        self.start_hook = Some(Arc::new(hook));
        self
    }

    /// Runs on each worker thread right before it exits.
    pub fn with_exit_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(Priority, u32) + Send + Sync + 'static,
    {
        self.exit_hook = Some(Arc::new(hook));
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

/// Errors surfaced while bringing the scheduler up.
#[derive(Debug, Error)]
pub enum Error {
    /// The process-global scheduler is already running.
    #[error("job system is already initialized")]
    AlreadyInitialized,
    /// No worker thread could be started for a tier.
    #[error("failed to start any worker for the {priority:?} pool")]
    PoolSpawnFailed {
        priority: Priority,
        #[source]
        source: io::Error,
    },
}

struct PoolEntry {
    pool: Arc<Pool>,
    // Workers actually running; may be fewer than the pool's queue count
    // after a partial spawn. Every queue is still drained because each
    // worker's scan covers the whole queue array.
    thread_count: u32,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// The scheduler: three priority pools and the alive flag.
///
/// Submissions go through a caller-owned [`Context`]; the context picks the
/// tier and tracks completion. Dropping the system shuts it down.
pub struct JobSystem {
    core_count: usize,
    alive: Arc<AtomicBool>,
    pools: Vec<PoolEntry>,
}

impl JobSystem {
    /// Creates a scheduler with the default configuration.
    pub fn new() -> Result<Self, Error> {
        JobSystem::with_config(Config::default())
    }

    /// Creates a scheduler, sizing each tier from the hardware concurrency
    /// and spawning its workers.
    ///
    /// A tier that cannot start any worker fails construction; a tier that
    /// starts only a subset logs a warning and continues with what it got.
    pub fn with_config(config: Config) -> Result<Self, Error> {
        let core_count = num_cpus::get().max(1);
        let clamp = |wanted: usize| (wanted as u32).clamp(1, config.max_thread_count);
        let sizes = [
            (Priority::High, clamp(core_count.saturating_sub(1))),
            (Priority::Low, clamp(core_count.saturating_sub(2))),
            (Priority::Streaming, clamp(1)),
        ];

        let alive = Arc::new(AtomicBool::new(true));
        let core_ids = if config.pin_worker_threads {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };

        let mut pools = Vec::with_capacity(Priority::COUNT);
        for (priority, wanted) in sizes {
            let pool = Arc::new(Pool::new(priority, wanted, config.queue_capacity));
            let mut workers = Vec::with_capacity(wanted as usize);
            let mut spawn_error = None;

            for home in 0..wanted as usize {
                let params = WorkerParams {
                    pool: Arc::clone(&pool),
                    alive: Arc::clone(&alive),
                    home,
                    core_id: pinned_core(&core_ids, priority, home),
                    start_hook: config.start_hook.clone(),
                    exit_hook: config.exit_hook.clone(),
                };
                match pool::spawn_worker(params) {
                    Ok(handle) => workers.push(handle),
                    Err(source) => {
                        spawn_error = Some(source);
                        break;
                    }
                }
            }

            if let Some(source) = spawn_error {
                if workers.is_empty() {
                    pools.push(PoolEntry {
                        pool,
                        thread_count: 0,
                        workers: Mutex::new(workers),
                    });
                    stop_workers(&alive, &pools);
                    return Err(Error::PoolSpawnFailed { priority, source });
                }
                tracing::warn!(
                    pool = priority.label(),
                    spawned = workers.len(),
                    wanted,
                    "spawned fewer workers than requested: {source}"
                );
            }

            pools.push(PoolEntry {
                pool,
                thread_count: workers.len() as u32,
                workers: Mutex::new(workers),
            });
        }

        tracing::info!(
            core_count,
            high = pools[Priority::High.index()].thread_count,
            low = pools[Priority::Low.index()].thread_count,
            streaming = pools[Priority::Streaming.index()].thread_count,
            "job system initialized"
        );

        Ok(JobSystem {
            core_count,
            alive,
            pools,
        })
    }

    /// Observed hardware concurrency.
    pub fn core_count(&self) -> usize {
        self.core_count
    }

    /// Number of workers running for a tier.
    pub fn thread_count(&self, priority: Priority) -> u32 {
        self.pools[priority.index()].thread_count
    }

    /// Submits a single job to the context's tier.
    ///
    /// The job covers the index range `[0, 1)`, so the task runs exactly
    /// once. On a single-worker tier the job executes inline on the caller.
    pub fn execute<F>(&self, context: &Context, task: F)
    where
        F: Fn(JobArgs) + Send + Sync + 'static,
    {
        self.execute_task(context, Arc::new(task));
    }

    /// [`JobSystem::execute`] for an already-shared [`Task`].
    pub fn execute_task(&self, context: &Context, task: Task) {
        if !self.alive.load(Ordering::Acquire) {
            return;
        }
        let entry = &self.pools[context.priority().index()];

        context.add_jobs(1);
        let job = Job {
            task,
            context: context.clone(),
            group_id: 0,
            group_begin: 0,
            group_end: 1,
            shared_memory_bytes: 0,
        };

        if entry.thread_count <= 1 {
            job.execute();
            return;
        }
        entry.pool.submit(job);
        entry.pool.notify_one();
    }

    /// Fans a parallel loop of `job_count` sub-items out across the
    /// context's tier, `group_size` sub-items per job.
    ///
    /// Sub-items within a group run serially in ascending index order on one
    /// worker; groups run concurrently in unspecified order. A zero
    /// `job_count` or `group_size` is a no-op.
    pub fn dispatch<F>(&self, context: &Context, job_count: u32, group_size: u32, task: F)
    where
        F: Fn(JobArgs) + Send + Sync + 'static,
    {
        self.dispatch_task(context, job_count, group_size, Arc::new(task), 0);
    }

    /// [`JobSystem::dispatch`] with `shared_memory_bytes` of scratch handed
    /// to every invocation of a group, valid for that group's duration.
    pub fn dispatch_with_scratch<F>(
        &self,
        context: &Context,
        job_count: u32,
        group_size: u32,
        task: F,
        shared_memory_bytes: usize,
    ) where
        F: Fn(JobArgs) + Send + Sync + 'static,
    {
        self.dispatch_task(
            context,
            job_count,
            group_size,
            Arc::new(task),
            shared_memory_bytes,
        );
    }

    /// Shared-task form of dispatch. The counter is raised by the group
    /// count before any job is enqueued, and each job decrements it once.
    pub fn dispatch_task(
        &self,
        context: &Context,
        job_count: u32,
        group_size: u32,
        task: Task,
        shared_memory_bytes: usize,
    ) {
        if !self.alive.load(Ordering::Acquire) {
            return;
        }
        if job_count == 0 || group_size == 0 {
            return;
        }

        let group_count = dispatch_group_count(job_count, group_size);
        let entry = &self.pools[context.priority().index()];

        context.add_jobs(group_count);
        let inline = entry.thread_count <= 1;

        for group_id in 0..group_count {
            let group_begin = group_id * group_size;
            let group_end = (group_begin + group_size).min(job_count);
            let job = Job {
                task: task.clone(),
                context: context.clone(),
                group_id,
                group_begin,
                group_end,
                shared_memory_bytes,
            };
            if inline {
                job.execute();
            } else {
                entry.pool.submit(job);
            }
        }

        if !inline {
            entry.pool.notify_all();
        }
    }

    /// Non-blocking check for outstanding work on a context.
    pub fn is_busy(&self, context: &Context) -> bool {
        context.is_busy()
    }

    /// Blocks until the context is idle, turning the caller into a temporary
    /// worker for the context's tier.
    ///
    /// Jobs from other contexts picked up during the drain are executed too;
    /// that keeps throughput up when the pool is saturated and avoids
    /// deadlock when the caller holds the last submission.
    pub fn wait(&self, context: &Context) {
        if !context.is_busy() {
            return;
        }
        let pool = &self.pools[context.priority().index()].pool;
        pool.notify_all();

        let start = pool.next_submit.fetch_add(1, Ordering::Relaxed) % pool.queue_count();
        while context.is_busy() {
            if !self.alive.load(Ordering::Acquire) {
                return;
            }
            if !pool.run_one(start) {
                thread::yield_now();
            }
        }
    }

    /// Stops accepting submissions, wakes every pool, and joins all workers.
    /// Queued jobs that no worker picked up before observing the flag are
    /// discarded. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        stop_workers(&self.alive, &self.pools);
    }
}

impl Drop for JobSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn stop_workers(alive: &AtomicBool, pools: &[PoolEntry]) {
    alive.store(false, Ordering::Release);
    // One broadcast per pool suffices: the epoch bump keeps any worker that
    // has not reached its condvar wait from sleeping through it.
    for entry in pools {
        entry.pool.notify_all();
    }
    for entry in pools {
        let handles = std::mem::take(&mut *entry.workers.lock().unwrap());
        for handle in handles {
            let _ = handle.join();
        }
    }
}

fn pinned_core(
    core_ids: &[core_affinity::CoreId],
    priority: Priority,
    home: usize,
) -> Option<core_affinity::CoreId> {
    if core_ids.is_empty() {
        return None;
    }
    let index = match priority {
        Priority::High | Priority::Low => (1 + home) % core_ids.len(),
        Priority::Streaming => core_ids.len() - 1 - (home % core_ids.len()),
    };
    core_ids.get(index).copied()
}

/// Number of jobs a dispatch produces for `job_count` sub-items at
/// `group_size` sub-items per group. Zero when either argument is zero.
pub fn dispatch_group_count(job_count: u32, group_size: u32) -> u32 {
    if job_count == 0 || group_size == 0 {
        return 0;
    }
    job_count.div_ceil(group_size)
}
