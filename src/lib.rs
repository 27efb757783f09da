//! # jobsys - Priority-Partitioned Parallel Job Scheduler
//!
//! A job scheduler for latency-sensitive, CPU-bound workloads such as
//! real-time simulation, rendering preparation, and bulk data transforms.
//! Callers submit a single task or a parallel loop through a [`Context`]
//! handle and wait on it cooperatively.
//!
//! ## Architecture
//!
//! Three worker pools, one per [`Priority`] tier, keep streaming and
//! low-priority housekeeping off the frame-critical path. Key components:
//!
//! - **Jobs**: units of work covering a `[begin, end)` sub-item range,
//!   executed serially on one worker
//! - **Per-worker queues**: round-robin submission targets; idle workers
//!   steal from their peers
//! - **Contexts**: atomic counters tracking outstanding jobs, waited on
//!   without blocking the pool
//! - **Worker threads**: OS threads that scan, steal, and sleep on the
//!   pool's wake condition
//!
//! ## Example
//!
//! ```no_run
//! use jobsys::{Context, JobSystem};
//!
//! let system = JobSystem::new().unwrap();
//!
//! let context = Context::new();
//! system.dispatch(&context, 1_000, 100, |args| {
//!     // Runs once per sub-item, 100 sub-items per job.
//!     let _ = args.job_index;
//! });
//! system.wait(&context);
//! ```
//!
//! The [`global`] module exposes the same surface through a process-wide
//! instance: `jobsys::initialize()`, `jobsys::dispatch(...)`,
//! `jobsys::shutdown()`.

pub mod context;
pub mod global;
pub mod job;
mod pool;
mod queue;
pub mod system;

pub use context::Context;
pub use global::{
    dispatch, dispatch_with_scratch, execute, initialize, initialize_with, is_busy, shutdown,
    thread_count, wait,
};
pub use job::{JobArgs, Priority, Task};
pub use system::{dispatch_group_count, Config, Error, JobSystem, WorkerHook};
