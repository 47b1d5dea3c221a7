// src/dag/store.rs

//! Authoritative in-memory state for expressions and tasks.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace, warn};

use crate::dag::graph::TaskGraph;
use crate::dag::scheduler_step::{SchedulerStep, StepDisposition, StoreStats};
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{ClaimedTask, ExpressionRecord, TaskRecord};
use crate::errors::{CalcdagError, Result};
use crate::types::{ExpressionId, ExpressionStatus, TaskId, TaskStatus};

/// Owns every expression and task record and is the only place where their
/// statuses change.
///
/// It is responsible for:
/// - inserting a compiled graph with each task `Ready` or `Blocked`
/// - handing out ready tasks in FIFO order and marking them `Assigned`
/// - applying completions and propagating results to dependents through a
///   reverse index (task -> tasks consuming its result)
/// - failing an expression, and every unfinished task in it, when one of its
///   tasks fails
/// - returning tasks with an expired claim lease to the ready queue
///
/// The store is a plain single-threaded value; [`Scheduler`] wraps it in a
/// lock for concurrent use.
///
/// [`Scheduler`]: crate::dag::Scheduler
#[derive(Debug, Default)]
pub struct TaskStore {
    expressions: HashMap<ExpressionId, ExpressionRecord>,
    /// Expression IDs in submission order, for listing.
    expression_order: Vec<ExpressionId>,
    tasks: HashMap<TaskId, TaskRecord>,
    /// Reverse dependency index.
    dependents: HashMap<TaskId, Vec<TaskId>>,
    /// FIFO of ready tasks. May contain stale entries for tasks that were
    /// completed or cancelled while queued; those are skipped on claim.
    ready: VecDeque<TaskId>,
    /// Tasks currently `Assigned`.
    in_flight: BTreeSet<TaskId>,
    next_task_id: u64,
    /// How long a claim stays valid. `None` means claims never expire.
    lease_timeout: Option<Duration>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose claims expire after `lease_timeout`.
    pub fn with_lease_timeout(lease_timeout: Option<Duration>) -> Self {
        Self {
            lease_timeout,
            ..Self::default()
        }
    }

    pub fn lease_timeout(&self) -> Option<Duration> {
        self.lease_timeout
    }

    /// Register a new expression. Fails if the ID is already taken.
    pub fn add_expression(&mut self, expr: ExpressionRecord) -> Result<()> {
        if self.expressions.contains_key(&expr.id) {
            return Err(CalcdagError::ExpressionExists(expr.id));
        }

        debug!(expression = %expr.id, source = %expr.source, "expression added");
        self.expression_order.push(expr.id);
        self.expressions.insert(expr.id, expr);
        Ok(())
    }

    /// Insert the task graph of an already registered expression.
    ///
    /// The graph is validated and rebased onto the store's ID sequence before
    /// anything is mutated, so either every task is inserted or none is.
    /// Returns the global IDs of the inserted tasks in compile order.
    pub fn add_task_graph(
        &mut self,
        expression_id: ExpressionId,
        graph: TaskGraph,
    ) -> Result<Vec<TaskId>> {
        let expr = self
            .expressions
            .get(&expression_id)
            .ok_or(CalcdagError::ExpressionNotFound(expression_id))?;

        if expr.root.is_some() {
            return Err(CalcdagError::TaskGraphExists(expression_id));
        }

        graph.validate()?;

        let base = self.next_task_id;
        let graph = graph.rebased(base);
        self.next_task_id += graph.len() as u64;

        let root = graph.root();
        let mut ids = Vec::with_capacity(graph.len());
        let mut ready_count = 0usize;

        for spec in graph.into_tasks() {
            let record = TaskRecord::from_spec(spec, expression_id);
            let id = record.id;

            for dep in record.waiting_on() {
                let entry = self.dependents.entry(dep).or_default();
                if !entry.contains(&id) {
                    entry.push(id);
                }
            }

            if record.status == TaskStatus::Ready {
                self.ready.push_back(id);
                ready_count += 1;
            }

            ids.push(id);
            self.tasks.insert(id, record);
        }

        if let Some(expr) = self.expressions.get_mut(&expression_id) {
            expr.root = Some(root);
            expr.tasks = ids.clone();
            expr.updated_at = chrono::Utc::now();
        }

        info!(
            expression = %expression_id,
            tasks = ids.len(),
            ready = ready_count,
            root = %root,
            "task graph recorded"
        );

        Ok(ids)
    }

    /// Register an expression together with its graph in one step.
    ///
    /// Nothing is recorded if either part is rejected.
    pub fn add_expression_with_graph(
        &mut self,
        expr: ExpressionRecord,
        graph: TaskGraph,
    ) -> Result<Vec<TaskId>> {
        if self.expressions.contains_key(&expr.id) {
            return Err(CalcdagError::ExpressionExists(expr.id));
        }
        graph.validate()?;

        let id = expr.id;
        self.add_expression(expr)?;
        self.add_task_graph(id, graph)
    }

    /// Claim the oldest ready task.
    ///
    /// Marks it `Assigned`, starts its lease (if leases are enabled) and moves
    /// the owning expression from `Pending` to `Processing`. Fails with
    /// `NoTaskAvailable` when nothing is ready; that is an expected outcome
    /// for pollers.
    pub fn next_ready_task(&mut self, now: Instant) -> Result<ClaimedTask> {
        while let Some(id) = self.ready.pop_front() {
            let Some(task) = self.tasks.get_mut(&id) else {
                continue;
            };

            if task.status != TaskStatus::Ready {
                trace!(task = %id, status = %task.status, "skipping stale ready-queue entry");
                continue;
            }

            let (lhs, rhs) = match task.resolved_operands() {
                Ok(operands) => operands,
                Err(err) => {
                    error!(task = %id, error = %err, "ready task has unresolved operand; demoting to Blocked");
                    task.status = TaskStatus::Blocked;
                    continue;
                }
            };

            task.status = TaskStatus::Assigned;
            task.attempts += 1;
            task.lease_deadline = self.lease_timeout.map(|timeout| now + timeout);
            self.in_flight.insert(id);

            let claimed = ClaimedTask {
                id,
                expression_id: task.expression_id,
                operation: task.operation,
                lhs,
                rhs,
                estimated_duration: task.estimated_duration,
                attempt: task.attempts,
            };

            if let Some(expr) = self.expressions.get_mut(&claimed.expression_id) {
                if expr.status == ExpressionStatus::Pending {
                    expr.set_status(ExpressionStatus::Processing);
                }
            }

            debug!(
                task = %id,
                expression = %claimed.expression_id,
                attempt = claimed.attempt,
                "task assigned"
            );
            return Ok(claimed);
        }

        Err(CalcdagError::NoTaskAvailable)
    }

    /// Record the result of a task and propagate it to its dependents.
    ///
    /// Completing an already `Done` task is a no-op (re-delivery is safe),
    /// as is completing a task whose expression has already failed. If the
    /// task is the root of its graph, the expression becomes `Done` with the
    /// same value. A task that was never claimed yields `TaskNotClaimable`.
    pub fn complete_task(&mut self, id: TaskId, value: f64) -> Result<SchedulerStep> {
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or(CalcdagError::TaskNotFound(id))?;
        let expression_id = task.expression_id;

        match task.status {
            TaskStatus::Done => {
                if task.result != Some(value) {
                    warn!(
                        task = %id,
                        stored = ?task.result,
                        reported = value,
                        "duplicate completion with a different value; keeping the first"
                    );
                } else {
                    debug!(task = %id, "duplicate completion; ignoring");
                }
                return Ok(SchedulerStep::unchanged(
                    id,
                    expression_id,
                    StepDisposition::Duplicate,
                ));
            }
            TaskStatus::Failed => {
                debug!(task = %id, "completion for failed task; ignoring");
                return Ok(SchedulerStep::unchanged(
                    id,
                    expression_id,
                    StepDisposition::Ignored,
                ));
            }
            TaskStatus::Blocked | TaskStatus::Ready | TaskStatus::Assigned => {
                ensure_claimed(task)?;
            }
        }

        task.status = TaskStatus::Done;
        task.result = Some(value);
        task.lease_deadline = None;
        self.in_flight.remove(&id);

        debug!(task = %id, expression = %expression_id, value, "task completed");

        let mut manager = StateManager::new(
            &mut self.tasks,
            &self.dependents,
            &mut self.ready,
            &mut self.in_flight,
        );
        let newly_ready = manager.propagate_result(id, value);

        let mut expression_finished = None;
        if let Some(expr) = self.expressions.get_mut(&expression_id) {
            if expr.root == Some(id) {
                expr.result = Some(value);
                expr.set_status(ExpressionStatus::Done);
                expression_finished = Some(ExpressionStatus::Done);
                info!(expression = %expression_id, result = value, "expression done");
            }
        }

        Ok(SchedulerStep {
            task: id,
            expression: expression_id,
            disposition: StepDisposition::Applied,
            newly_ready,
            newly_failed: Vec::new(),
            expression_finished,
        })
    }

    /// Mark a task as failed, which fails its whole expression.
    ///
    /// Every other unfinished task of the expression is cancelled so it is
    /// never handed out; results already computed for sibling branches are
    /// discarded. Failing a task that is already `Done` or `Failed` is a
    /// no-op; failing one that was never claimed is `TaskNotClaimable`.
    pub fn fail_task(&mut self, id: TaskId, reason: &str) -> Result<SchedulerStep> {
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or(CalcdagError::TaskNotFound(id))?;
        let expression_id = task.expression_id;

        if task.status.is_terminal() {
            debug!(task = %id, status = %task.status, "failure for finished task; ignoring");
            return Ok(SchedulerStep::unchanged(
                id,
                expression_id,
                StepDisposition::Ignored,
            ));
        }
        ensure_claimed(task)?;

        task.status = TaskStatus::Failed;
        task.lease_deadline = None;
        task.failure = Some(reason.to_string());
        self.in_flight.remove(&id);

        warn!(
            task = %id,
            expression = %expression_id,
            reason,
            "task failed; failing its expression"
        );

        let siblings = self
            .expressions
            .get(&expression_id)
            .map(|e| e.tasks.clone())
            .unwrap_or_default();

        let mut manager = StateManager::new(
            &mut self.tasks,
            &self.dependents,
            &mut self.ready,
            &mut self.in_flight,
        );
        let cancelled =
            manager.cancel_tasks(&siblings, &format!("cancelled: task {id} failed"));

        let mut expression_finished = None;
        if let Some(expr) = self.expressions.get_mut(&expression_id) {
            if !expr.status.is_terminal() {
                expr.error = Some(reason.to_string());
                expr.set_status(ExpressionStatus::Error);
                expression_finished = Some(ExpressionStatus::Error);
            }
        }

        let mut newly_failed = Vec::with_capacity(cancelled.len() + 1);
        newly_failed.push(id);
        newly_failed.extend(cancelled);

        Ok(SchedulerStep {
            task: id,
            expression: expression_id,
            disposition: StepDisposition::Applied,
            newly_ready: Vec::new(),
            newly_failed,
            expression_finished,
        })
    }

    /// Return every assigned task whose lease has expired to the ready queue.
    ///
    /// Reclaimed tasks are appended in task ID order. A late report from the
    /// original claimant is still accepted by [`TaskStore::complete_task`].
    pub fn reclaim_expired(&mut self, now: Instant) -> Vec<TaskId> {
        let expired: Vec<TaskId> = self
            .in_flight
            .iter()
            .copied()
            .filter(|id| {
                self.tasks
                    .get(id)
                    .and_then(|t| t.lease_deadline)
                    .is_some_and(|deadline| deadline <= now)
            })
            .collect();

        for id in &expired {
            if let Some(task) = self.tasks.get_mut(id) {
                task.status = TaskStatus::Ready;
                task.lease_deadline = None;
                self.ready.push_back(*id);
            }
            self.in_flight.remove(id);
            warn!(task = %id, "claim lease expired; task returned to ready queue");
        }

        expired
    }

    pub fn expression(&self, id: ExpressionId) -> Option<&ExpressionRecord> {
        self.expressions.get(&id)
    }

    /// All expressions in submission order.
    pub fn expressions(&self) -> impl Iterator<Item = &ExpressionRecord> {
        self.expression_order
            .iter()
            .filter_map(|id| self.expressions.get(id))
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskRecord> {
        self.tasks.get(&id)
    }

    /// Tasks of one expression in compile order.
    pub fn tasks_of(&self, expression_id: ExpressionId) -> Vec<&TaskRecord> {
        self.expressions
            .get(&expression_id)
            .map(|expr| {
                expr.tasks
                    .iter()
                    .filter_map(|id| self.tasks.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tasks that consume the result of `id`.
    pub fn dependents_of(&self, id: TaskId) -> &[TaskId] {
        self.dependents
            .get(&id)
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            expressions: self.expressions.len(),
            ..StoreStats::default()
        };
        for task in self.tasks.values() {
            match task.status {
                TaskStatus::Blocked => stats.blocked += 1,
                TaskStatus::Ready => stats.ready += 1,
                TaskStatus::Assigned => stats.assigned += 1,
                TaskStatus::Done => stats.done += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

/// Reports are accepted only for tasks a worker has claimed: `Assigned`, or
/// `Ready` again after its lease expired.
fn ensure_claimed(task: &TaskRecord) -> Result<()> {
    match task.status {
        TaskStatus::Assigned => Ok(()),
        TaskStatus::Ready if task.attempts > 0 => Ok(()),
        _ => Err(CalcdagError::TaskNotClaimable(task.id)),
    }
}
