//! Per-priority worker pools.
//!
//! Each pool owns one queue per worker. Submission round-robins across the
//! queues; a worker drains its home queue first and then scans its peers in
//! order, which is where work stealing happens. A worker whose full scan
//! yields nothing sleeps on the pool condvar until a submitter bumps the
//! wake epoch.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_utils::CachePadded;

use crate::job::{Job, Priority};
use crate::queue::JobQueue;
use crate::system::WorkerHook;

pub(crate) struct Pool {
    pub(crate) priority: Priority,
    queues: Vec<CachePadded<JobQueue>>,
    pub(crate) next_submit: AtomicUsize,
    wake_mutex: Mutex<()>,
    wake_condvar: Condvar,
    // Bumped under the wake mutex on every notify. A worker that saw the
    // same epoch before and after its empty scan may safely sleep; any
    // submission in between forces a re-scan instead. This closes the
    // lost-wakeup window between scan end and condvar wait.
    wake_epoch: AtomicU64,
}

impl Pool {
    pub(crate) fn new(priority: Priority, thread_count: u32, queue_capacity: usize) -> Self {
        let queues = (0..thread_count)
            .map(|_| CachePadded::new(JobQueue::bounded(queue_capacity)))
            .collect();
        Pool {
            priority,
            queues,
            next_submit: AtomicUsize::new(0),
            wake_mutex: Mutex::new(()),
            wake_condvar: Condvar::new(),
            wake_epoch: AtomicU64::new(0),
        }
    }

    pub(crate) fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// Pushes one job, choosing the target queue by round-robin. When the
    /// target is full the submitter cooperates by running one job from the
    /// pool and retrying; jobs are never dropped.
    pub(crate) fn submit(&self, mut job: Job) {
        loop {
            let index = self.next_submit.fetch_add(1, Ordering::Relaxed) % self.queues.len();
            match self.queues[index].push_back(job) {
                Ok(()) => return,
                Err(rejected) => {
                    job = rejected;
                    self.notify_all();
                    self.run_one(index);
                }
            }
        }
    }

    /// Executes at most one job from the pool, scanning from `start`.
    /// Returns false when every queue was empty.
    pub(crate) fn run_one(&self, start: usize) -> bool {
        for k in 0..self.queues.len() {
            let queue = &self.queues[(start + k) % self.queues.len()];
            if let Some(job) = queue.pop_front() {
                job.execute();
                return true;
            }
        }
        false
    }

    // Local-first traversal: drain the queue at `home` until empty, then
    // each peer in turn. Returns true if at least one job ran.
    fn scan_and_drain(&self, home: usize) -> bool {
        let mut ran = false;
        for k in 0..self.queues.len() {
            let queue = &self.queues[(home + k) % self.queues.len()];
            while let Some(job) = queue.pop_front() {
                job.execute();
                ran = true;
            }
        }
        ran
    }

    pub(crate) fn notify_one(&self) {
        self.bump_epoch();
        self.wake_condvar.notify_one();
    }

    pub(crate) fn notify_all(&self) {
        self.bump_epoch();
        self.wake_condvar.notify_all();
    }

    fn bump_epoch(&self) {
        let _guard = self.wake_mutex.lock().unwrap();
        self.wake_epoch.fetch_add(1, Ordering::Release);
    }
}

pub(crate) struct WorkerParams {
    pub(crate) pool: Arc<Pool>,
    pub(crate) alive: Arc<AtomicBool>,
    pub(crate) home: usize,
    pub(crate) core_id: Option<core_affinity::CoreId>,
    pub(crate) start_hook: Option<Arc<dyn WorkerHook>>,
    pub(crate) exit_hook: Option<Arc<dyn WorkerHook>>,
}

/// Spawns one named worker thread with its home-queue index.
pub(crate) fn spawn_worker(params: WorkerParams) -> io::Result<JoinHandle<()>> {
    let name = format!("jobsys-{}-{}", params.pool.priority.label(), params.home);
    thread::Builder::new().name(name).spawn(move || {
        let WorkerParams {
            pool,
            alive,
            home,
            core_id,
            start_hook,
            exit_hook,
        } = params;

        if let Some(core_id) = core_id {
            core_affinity::set_for_current(core_id);
        }
        if let Some(hook) = &start_hook {
            hook.run(pool.priority, home as u32);
        }

        while alive.load(Ordering::Acquire) {
            let epoch = pool.wake_epoch.load(Ordering::Acquire);
            if pool.scan_and_drain(home) {
                continue;
            }

            let guard = pool.wake_mutex.lock().unwrap();
            if pool.wake_epoch.load(Ordering::Acquire) == epoch && alive.load(Ordering::Acquire) {
                // Spurious wakeups are fine, the loop re-enters the scan.
                drop(pool.wake_condvar.wait(guard).unwrap());
            }
        }

        if let Some(hook) = &exit_hook {
            hook.run(pool.priority, home as u32);
        }
    })
}
