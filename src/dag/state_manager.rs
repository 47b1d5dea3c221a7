// src/dag/state_manager.rs

//! Status transitions that touch more than one task: result propagation
//! along dependency edges and cancellation of a failed expression.

use std::collections::{BTreeSet, HashMap, VecDeque};

use tracing::{debug, warn};

use crate::dag::task_info::TaskRecord;
use crate::types::{TaskId, TaskStatus};

/// Borrowed view over the store's task tables.
pub struct StateManager<'a> {
    tasks: &'a mut HashMap<TaskId, TaskRecord>,
    dependents: &'a HashMap<TaskId, Vec<TaskId>>,
    ready: &'a mut VecDeque<TaskId>,
    in_flight: &'a mut BTreeSet<TaskId>,
}

impl<'a> StateManager<'a> {
    pub fn new(
        tasks: &'a mut HashMap<TaskId, TaskRecord>,
        dependents: &'a HashMap<TaskId, Vec<TaskId>>,
        ready: &'a mut VecDeque<TaskId>,
        in_flight: &'a mut BTreeSet<TaskId>,
    ) -> Self {
        Self {
            tasks,
            dependents,
            ready,
            in_flight,
        }
    }

    /// Substitute `value` into every dependent of `completed` and flip the
    /// dependents whose operands are now both literals to `Ready`.
    ///
    /// Only the reverse-index entries of `completed` are visited. Returns the
    /// newly ready tasks in the order they were enqueued.
    pub fn propagate_result(&mut self, completed: TaskId, value: f64) -> Vec<TaskId> {
        let index = self.dependents;
        let Some(dependents) = index.get(&completed) else {
            return Vec::new();
        };

        let mut newly_ready = Vec::new();

        for dependent_id in dependents {
            let Some(dependent) = self.tasks.get_mut(dependent_id) else {
                warn!(task = %dependent_id, "dependent missing from task table");
                continue;
            };

            if dependent.status != TaskStatus::Blocked {
                // Cancelled with its expression, or otherwise already moved on.
                continue;
            }

            if !dependent.resolve_operand(completed, value) {
                warn!(
                    task = %dependent.id,
                    dependency = %completed,
                    "reverse index entry without a matching operand"
                );
                continue;
            }

            if dependent.waiting_on().is_empty() {
                dependent.status = TaskStatus::Ready;
                self.ready.push_back(dependent.id);
                newly_ready.push(dependent.id);
                debug!(
                    task = %dependent.id,
                    dependency = %completed,
                    "all operands resolved; marking Ready"
                );
            } else {
                debug!(
                    task = %dependent.id,
                    dependency = %completed,
                    "operand resolved; still waiting on another task"
                );
            }
        }

        newly_ready
    }

    /// Mark every non-terminal task in `task_ids` as `Failed` with `reason`.
    ///
    /// Stale ready-queue entries are skipped lazily by the claim path, so the
    /// queue itself is left alone. Returns the tasks that were cancelled.
    pub fn cancel_tasks(&mut self, task_ids: &[TaskId], reason: &str) -> Vec<TaskId> {
        let mut cancelled = Vec::new();

        for id in task_ids {
            if let Some(task) = self.tasks.get_mut(id) {
                if task.status.is_terminal() {
                    continue;
                }
                task.status = TaskStatus::Failed;
                task.lease_deadline = None;
                task.failure = Some(reason.to_string());
                self.in_flight.remove(id);
                cancelled.push(*id);
                debug!(task = %id, "cancelled task of failed expression");
            }
        }

        cancelled
    }
}
