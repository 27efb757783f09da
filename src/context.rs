//! Completion handles for submitted work.
//!
//! A [`Context`] aggregates the outstanding-job count for a related batch of
//! submissions. Submitters increment the counter before jobs are enqueued;
//! the worker that finishes a job decrements it once. A thread that observes
//! the counter at zero also observes every write performed by the completed
//! jobs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::job::Priority;

/// A caller-owned completion handle with a priority selector.
///
/// Cloning is cheap and clones share the same counter, which is how in-flight
/// jobs keep a back-reference to the context without owning it. A context is
/// safe to drop as soon as [`Context::is_busy`] returns false.
#[derive(Clone)]
pub struct Context {
    outstanding: Arc<AtomicU32>,
    priority: Priority,
}

impl Context {
    /// Creates an idle context that submits to the [`Priority::High`] tier.
    pub fn new() -> Self {
        Context::with_priority(Priority::High)
    }

    /// Creates an idle context that submits to the given tier.
    pub fn with_priority(priority: Priority) -> Self {
        Context {
            outstanding: Arc::new(AtomicU32::new(0)),
            priority,
        }
    }

    /// The tier this context submits to.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns true while any job submitted through this context has not
    /// completed.
    pub fn is_busy(&self) -> bool {
        self.outstanding.load(Ordering::Acquire) > 0
    }

    /// Current outstanding-job count.
    pub fn outstanding_jobs(&self) -> u32 {
        self.outstanding.load(Ordering::Acquire)
    }

    pub(crate) fn add_jobs(&self, count: u32) {
        self.outstanding.fetch_add(count, Ordering::SeqCst);
    }

    // Release ordering so the thread that sees zero sees the job's writes.
    pub(crate) fn finish_job(&self) {
        self.outstanding.fetch_sub(1, Ordering::Release);
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_is_idle() {
        let context = Context::new();
        assert!(!context.is_busy());
        assert_eq!(context.outstanding_jobs(), 0);
        assert_eq!(context.priority(), Priority::High);
    }

    #[test]
    fn test_busy_transitions() {
        let context = Context::with_priority(Priority::Low);
        context.add_jobs(2);
        assert!(context.is_busy());
        assert_eq!(context.outstanding_jobs(), 2);

        context.finish_job();
        assert!(context.is_busy());

        context.finish_job();
        assert!(!context.is_busy());
    }

    #[test]
    fn test_clones_share_the_counter() {
        let context = Context::new();
        let clone = context.clone();

        context.add_jobs(1);
        assert!(clone.is_busy());

        clone.finish_job();
        assert!(!context.is_busy());
    }
}
