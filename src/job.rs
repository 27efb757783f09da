//! Job descriptors and group execution.
//!
//! A [`Job`] is the schedulable unit: a single `execute` call produces one
//! job covering the index range `[0, 1)`, and a `dispatch` produces one job
//! per group. The worker that pops a job runs its task once per sub-item in
//! `[group_begin, group_end)`, serially and in ascending order, then
//! decrements the owning context exactly once.

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::context::Context;

/// Priority tier a context submits into.
///
/// Each tier owns its own worker pool, so streaming and housekeeping work
/// cannot preempt frame-critical tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    /// Frame-critical tasks. The default.
    #[default]
    High,
    /// Background work that is not latency-sensitive.
    Low,
    /// Long-running I/O-adjacent work such as resource streaming.
    Streaming,
}

impl Priority {
    pub(crate) const COUNT: usize = 3;

    pub(crate) fn index(self) -> usize {
        match self {
            Priority::High => 0,
            Priority::Low => 1,
            Priority::Streaming => 2,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Low => "low",
            Priority::Streaming => "streaming",
        }
    }
}

/// Arguments passed by value to a task, once per sub-item.
pub struct JobArgs<'s> {
    /// Global index of this sub-item within the originating dispatch.
    pub job_index: u32,
    /// Index of the group this invocation belongs to. Zero for `execute`.
    pub group_id: u32,
    /// Sub-item index relative to the group (`job_index - group_begin`).
    pub group_index: u32,
    /// True on the smallest `job_index` of the group.
    pub is_first_in_group: bool,
    /// True on the largest `job_index` of the group.
    pub is_last_in_group: bool,
    /// Scratch shared by all sub-items of this group. Empty unless the
    /// dispatch requested shared memory. Contents are unspecified on entry
    /// and invalid once the group returns.
    pub shared_memory: &'s mut [u8],
}

/// A task callable. One `Arc` is shared by every job of a dispatch.
pub type Task = Arc<dyn Fn(JobArgs) + Send + Sync>;

/// Internal job descriptor. Immutable once enqueued.
pub(crate) struct Job {
    pub(crate) task: Task,
    pub(crate) context: Context,
    pub(crate) group_id: u32,
    pub(crate) group_begin: u32,
    pub(crate) group_end: u32,
    pub(crate) shared_memory_bytes: usize,
}

thread_local! {
    // Per-worker scratch, reused across groups on the same thread. The
    // buffer is taken out of the slot while a group runs so a nested drain
    // (wait or back-pressure) cannot alias it.
    static SCRATCH: Cell<Vec<u8>> = const { Cell::new(Vec::new()) };
}

impl Job {
    /// Runs every sub-item of the group, then decrements the owning context.
    ///
    /// A panic raised by the task is contained here: it is logged and the
    /// context is still decremented so waiters cannot deadlock.
    pub(crate) fn execute(self) {
        debug_assert!(self.group_begin < self.group_end);

        let Job {
            task,
            context,
            group_id,
            group_begin,
            group_end,
            shared_memory_bytes,
        } = self;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            run_group(&*task, group_id, group_begin, group_end, shared_memory_bytes);
        }));

        if let Err(payload) = outcome {
            tracing::error!(group_id, "job panicked: {}", panic_message(&payload));
        }

        context.finish_job();
    }
}

fn run_group(
    task: &(dyn Fn(JobArgs) + Send + Sync),
    group_id: u32,
    group_begin: u32,
    group_end: u32,
    shared_memory_bytes: usize,
) {
    let mut scratch = if shared_memory_bytes > 0 {
        let mut buffer = SCRATCH.take();
        if buffer.len() < shared_memory_bytes {
            buffer.resize(shared_memory_bytes, 0);
        }
        buffer
    } else {
        Vec::new()
    };

    for i in group_begin..group_end {
        task(JobArgs {
            job_index: i,
            group_id,
            group_index: i - group_begin,
            is_first_in_group: i == group_begin,
            is_last_in_group: i == group_end - 1,
            shared_memory: &mut scratch[..shared_memory_bytes],
        });
    }

    if shared_memory_bytes > 0 {
        SCRATCH.set(scratch);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}
