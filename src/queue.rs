//! Multi-producer multi-consumer job queue.
//!
//! One instance per worker thread. A mutex-guarded deque with a capacity
//! bound; overflow is reported back to the submitter, which drains the pool
//! cooperatively instead of blocking or dropping the job.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::job::Job;

pub(crate) struct JobQueue {
    entries: Mutex<VecDeque<Job>>,
    capacity: usize,
}

impl JobQueue {
    pub(crate) fn bounded(capacity: usize) -> Self {
        JobQueue {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Appends a job, handing it back when the queue is at capacity.
    pub(crate) fn push_back(&self, job: Job) -> Result<(), Job> {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= self.capacity {
            return Err(job);
        }
        entries.push_back(job);
        Ok(())
    }

    /// Removes the oldest job, or `None` when empty.
    pub(crate) fn pop_front(&self) -> Option<Job> {
        self.entries.lock().unwrap().pop_front()
    }
}
