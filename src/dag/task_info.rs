// src/dag/task_info.rs

//! Stored task and expression records, plus the claim handed to workers.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::dag::graph::TaskSpec;
use crate::errors::{CalcdagError, Result};
use crate::types::{ExpressionId, ExpressionStatus, Operand, Operation, TaskId, TaskStatus};

/// A task as held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    pub id: TaskId,
    pub expression_id: ExpressionId,
    pub operation: Operation,
    pub lhs: Operand,
    pub rhs: Operand,
    pub status: TaskStatus,
    /// Set once the task is `Done`.
    pub result: Option<f64>,
    pub estimated_duration: Duration,
    /// How many times the task has been claimed (lease expiry can cause more
    /// than one claim).
    pub attempts: u32,
    /// When the current claim expires; `None` unless `Assigned` with a lease.
    pub lease_deadline: Option<Instant>,
    /// Reason recorded when the task failed or was cancelled.
    pub failure: Option<String>,
}

impl TaskRecord {
    pub fn from_spec(spec: TaskSpec, expression_id: ExpressionId) -> Self {
        let status = if spec.lhs.is_resolved() && spec.rhs.is_resolved() {
            TaskStatus::Ready
        } else {
            TaskStatus::Blocked
        };

        Self {
            id: spec.id,
            expression_id,
            operation: spec.operation,
            lhs: spec.lhs,
            rhs: spec.rhs,
            status,
            result: None,
            estimated_duration: spec.estimated_duration,
            attempts: 0,
            lease_deadline: None,
            failure: None,
        }
    }

    /// Task IDs this task is still waiting on.
    pub fn waiting_on(&self) -> Vec<TaskId> {
        [self.lhs.dependency(), self.rhs.dependency()]
            .into_iter()
            .flatten()
            .collect()
    }

    /// Both operands as numbers, or `UnresolvedOperand` if either is still a
    /// task reference.
    pub fn resolved_operands(&self) -> Result<(f64, f64)> {
        match (self.lhs.literal(), self.rhs.literal()) {
            (Some(lhs), Some(rhs)) => Ok((lhs, rhs)),
            _ => Err(CalcdagError::UnresolvedOperand(self.id)),
        }
    }

    /// Replace every operand referencing `dependency` with its value.
    ///
    /// Returns `true` if anything was substituted.
    pub fn resolve_operand(&mut self, dependency: TaskId, value: f64) -> bool {
        let mut changed = false;
        for operand in [&mut self.lhs, &mut self.rhs] {
            if *operand == Operand::Task(dependency) {
                *operand = Operand::Literal(value);
                changed = true;
            }
        }
        changed
    }
}

/// A submitted expression as held by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionRecord {
    pub id: ExpressionId,
    /// The text as submitted.
    pub source: String,
    pub status: ExpressionStatus,
    /// Only meaningful when `status == Done`.
    pub result: Option<f64>,
    /// Only set when `status == Error`.
    pub error: Option<String>,
    /// Root of the task graph, once one has been attached.
    pub root: Option<TaskId>,
    /// All tasks of the expression in compile order.
    pub tasks: Vec<TaskId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExpressionRecord {
    pub fn new(id: ExpressionId, source: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            source: source.into(),
            status: ExpressionStatus::Pending,
            result: None,
            error: None,
            root: None,
            tasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn set_status(&mut self, status: ExpressionStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// What a worker receives when it claims a task: the operation and two
/// already-resolved operands.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimedTask {
    pub id: TaskId,
    pub expression_id: ExpressionId,
    pub operation: Operation,
    pub lhs: f64,
    pub rhs: f64,
    pub estimated_duration: Duration,
    /// 1 for the first claim of this task.
    pub attempt: u32,
}
