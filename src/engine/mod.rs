// src/engine/mod.rs

//! Orchestration around the scheduler.
//!
//! - [`orchestrator`] is the submission front door: it compiles expressions,
//!   records them, and answers status reads.
//! - [`sweeper`] runs the background task that returns tasks with expired
//!   claim leases to the ready queue.

pub mod orchestrator;
pub mod sweeper;

pub use orchestrator::Orchestrator;
pub use sweeper::spawn_lease_sweeper;
