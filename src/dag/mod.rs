// src/dag/mod.rs

//! Task DAG representation, storage and scheduling.
//!
//! - [`graph`] holds the compiled dependency graph of one expression.
//! - [`task_info`] defines the stored task / expression records and the
//!   claim handed to workers.
//! - [`store`] owns all records and applies every status transition.
//! - [`state_manager`] implements the multi-task transitions (result
//!   propagation, cancellation) on behalf of the store.
//! - [`scheduler`] is the thread-safe handle workers talk to.
//! - [`scheduler_step`] defines the result types for store mutations.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod store;
pub mod task_info;

pub use graph::{TaskGraph, TaskSpec};
pub use scheduler::Scheduler;
pub use scheduler_step::{SchedulerStep, StepDisposition, StoreStats};
pub use store::TaskStore;
pub use task_info::{ClaimedTask, ExpressionRecord, TaskRecord};
