//! Process-global scheduler instance.
//!
//! Mirrors the [`JobSystem`](crate::JobSystem) surface as free functions
//! backed by one lazily-created shared instance. Submissions issued while
//! the global system is absent are silently ignored, and `wait` on an
//! uninitialized system returns immediately.

use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;

use crate::context::Context;
use crate::job::{JobArgs, Priority};
use crate::system::{Config, Error, JobSystem};

lazy_static! {
    static ref GLOBAL: RwLock<Option<Arc<JobSystem>>> = RwLock::new(None);
}

fn current() -> Option<Arc<JobSystem>> {
    GLOBAL.read().unwrap().as_ref().cloned()
}

/// Starts the global job system with the default configuration.
pub fn initialize() -> Result<(), Error> {
    initialize_with(Config::default())
}

/// Starts the global job system.
pub fn initialize_with(config: Config) -> Result<(), Error> {
    let mut slot = GLOBAL.write().unwrap();
    if slot.is_some() {
        return Err(Error::AlreadyInitialized);
    }
    *slot = Some(Arc::new(JobSystem::with_config(config)?));
    Ok(())
}

/// Stops the global job system and joins every worker.
///
/// Safe to call when the system was never started; a later [`initialize`]
/// brings up a fresh instance.
pub fn shutdown() {
    let system = GLOBAL.write().unwrap().take();
    if let Some(system) = system {
        system.shutdown();
    }
}

/// Number of workers running for a tier, or zero when the global system is
/// not initialized.
pub fn thread_count(priority: Priority) -> u32 {
    current().map_or(0, |system| system.thread_count(priority))
}

/// Submits a single job to the context's tier. See [`JobSystem::execute`].
pub fn execute<F>(context: &Context, task: F)
where
    F: Fn(JobArgs) + Send + Sync + 'static,
{
    if let Some(system) = current() {
        system.execute(context, task);
    }
}

/// Fans a parallel loop out across the context's tier. See
/// [`JobSystem::dispatch`].
pub fn dispatch<F>(context: &Context, job_count: u32, group_size: u32, task: F)
where
    F: Fn(JobArgs) + Send + Sync + 'static,
{
    if let Some(system) = current() {
        system.dispatch(context, job_count, group_size, task);
    }
}

/// [`dispatch`] with per-group scratch memory. See
/// [`JobSystem::dispatch_with_scratch`].
pub fn dispatch_with_scratch<F>(
    context: &Context,
    job_count: u32,
    group_size: u32,
    task: F,
    shared_memory_bytes: usize,
) where
    F: Fn(JobArgs) + Send + Sync + 'static,
{
    if let Some(system) = current() {
        system.dispatch_with_scratch(context, job_count, group_size, task, shared_memory_bytes);
    }
}

/// Non-blocking check for outstanding work on a context.
pub fn is_busy(context: &Context) -> bool {
    context.is_busy()
}

/// Blocks until the context is idle, helping the context's tier drain. See
/// [`JobSystem::wait`].
pub fn wait(context: &Context) {
    if let Some(system) = current() {
        system.wait(context);
    }
}
