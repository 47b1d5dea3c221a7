// src/exec/mod.rs

//! Worker execution layer.
//!
//! This module is responsible for actually computing tasks: claiming them
//! from a [`TaskSource`], waiting out their simulated latency, evaluating
//! them, and reporting the outcome.
//!
//! - [`backend`] provides the `TaskSource` trait and the in-process
//!   `LocalTaskSource`; tests can replace it with a fake implementation.
//! - [`task_runner`] evaluates a single claimed task.
//! - [`executor_loop`] owns the per-worker loop and the transport retry policy.
//! - [`pool`] spawns and stops a fixed number of worker loops.

pub mod backend;
pub mod executor_loop;
pub mod pool;
pub mod task_runner;

pub use backend::{LocalTaskSource, SourceFuture, TaskSource};
pub use executor_loop::{run_worker, with_retry};
pub use pool::WorkerPool;
pub use task_runner::{evaluate, run_task};
