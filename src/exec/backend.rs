// src/exec/backend.rs

//! Pluggable task source abstraction.
//!
//! Worker loops talk to a `TaskSource` instead of a raw [`Scheduler`]. The
//! source is the boundary a network transport would sit behind: claim a
//! task, report its result, report its failure.
//!
//! - `LocalTaskSource` is the in-process implementation used by `calcdag`;
//!   it calls the scheduler directly and never produces transport errors.
//! - Tests can provide their own `TaskSource` that, for example, fails the
//!   first few calls with `CalcdagError::Transport` to exercise retries.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::dag::{ClaimedTask, Scheduler};
use crate::errors::Result;
use crate::types::TaskId;

/// Boxed future returned by [`TaskSource`] methods.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Where a worker gets tasks from and reports outcomes to.
pub trait TaskSource: Send + Sync {
    /// Claim one ready task.
    ///
    /// Must return `CalcdagError::NoTaskAvailable` (not a transport error)
    /// when nothing is ready.
    fn claim(&self) -> SourceFuture<'_, ClaimedTask>;

    /// Report a computed value. Must be safe to call twice for one task.
    fn submit_result(&self, task: TaskId, value: f64) -> SourceFuture<'_, ()>;

    /// Report that a task could not be computed.
    fn submit_failure(&self, task: TaskId, reason: String) -> SourceFuture<'_, ()>;
}

/// In-process task source backed by a shared [`Scheduler`].
#[derive(Debug, Clone)]
pub struct LocalTaskSource {
    scheduler: Scheduler,
}

impl LocalTaskSource {
    pub fn new(scheduler: Scheduler) -> Self {
        Self { scheduler }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

impl TaskSource for LocalTaskSource {
    fn claim(&self) -> SourceFuture<'_, ClaimedTask> {
        Box::pin(async move { self.scheduler.claim_next() })
    }

    fn submit_result(&self, task: TaskId, value: f64) -> SourceFuture<'_, ()> {
        Box::pin(async move {
            let step = self.scheduler.report_result(task, value)?;
            if !step.is_applied() {
                debug!(task = %task, disposition = ?step.disposition, "result not applied");
            }
            Ok(())
        })
    }

    fn submit_failure(&self, task: TaskId, reason: String) -> SourceFuture<'_, ()> {
        Box::pin(async move {
            self.scheduler.report_failure(task, &reason)?;
            Ok(())
        })
    }
}
