// src/dag/scheduler_step.rs

//! Result types for store mutations.

use crate::types::{ExpressionId, ExpressionStatus, TaskId};

/// How a completion or failure report was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDisposition {
    /// The report changed store state.
    Applied,
    /// The task was already `Done`; nothing changed.
    Duplicate,
    /// The task (or its expression) had already failed; nothing changed.
    Ignored,
}

/// Structured result of a single completion or failure report.
///
/// Workers mostly ignore it; tests use it to assert exactly what a report
/// changed.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerStep {
    pub task: TaskId,
    pub expression: ExpressionId,
    pub disposition: StepDisposition,
    /// Tasks that became `Ready` as a result of this step.
    pub newly_ready: Vec<TaskId>,
    /// Tasks newly marked `Failed` in this step (the reported task first,
    /// then any cancelled siblings).
    pub newly_failed: Vec<TaskId>,
    /// Set when this step moved the owning expression to a terminal status.
    pub expression_finished: Option<ExpressionStatus>,
}

impl SchedulerStep {
    pub(crate) fn unchanged(
        task: TaskId,
        expression: ExpressionId,
        disposition: StepDisposition,
    ) -> Self {
        Self {
            task,
            expression,
            disposition,
            newly_ready: Vec::new(),
            newly_failed: Vec::new(),
            expression_finished: None,
        }
    }

    pub fn is_applied(&self) -> bool {
        self.disposition == StepDisposition::Applied
    }
}

/// Per-status counts across the whole store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub expressions: usize,
    pub blocked: usize,
    pub ready: usize,
    pub assigned: usize,
    pub done: usize,
    pub failed: usize,
}
