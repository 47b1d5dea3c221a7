// src/dag/scheduler.rs

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::dag::graph::TaskGraph;
use crate::dag::scheduler_step::{SchedulerStep, StoreStats};
use crate::dag::store::TaskStore;
use crate::dag::task_info::{ClaimedTask, ExpressionRecord, TaskRecord};
use crate::errors::{CalcdagError, Result};
use crate::types::{ExpressionId, TaskId};

/// Shared, cloneable handle to a [`TaskStore`].
///
/// This is the contract workers and any transport bind to:
/// - `claim_next` hands out one ready task or `NoTaskAvailable`
/// - `report_result` / `report_failure` apply a worker's outcome
///
/// Every mutation takes the single write lock, so completion and readiness
/// propagation are one atomic step and two concurrent claims can never
/// return the same task. Reads share the lock and always observe a fully
/// propagated state.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    store: Arc<RwLock<TaskStore>>,
}

impl Scheduler {
    pub fn new(lease_timeout: Option<Duration>) -> Self {
        Self::from_store(TaskStore::with_lease_timeout(lease_timeout))
    }

    pub fn from_store(store: TaskStore) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
        }
    }

    // Store transitions complete before anything that can panic, so a
    // poisoned lock still guards a consistent store.
    fn read(&self) -> RwLockReadGuard<'_, TaskStore> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TaskStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a new expression and its graph under a freshly generated ID.
    pub fn submit(&self, source: impl Into<String>, graph: TaskGraph) -> Result<ExpressionId> {
        let id = ExpressionId::new();
        self.submit_with_id(id, source, graph)?;
        Ok(id)
    }

    /// Record a new expression under a caller-chosen ID.
    pub fn submit_with_id(
        &self,
        id: ExpressionId,
        source: impl Into<String>,
        graph: TaskGraph,
    ) -> Result<Vec<TaskId>> {
        let record = ExpressionRecord::new(id, source);
        self.write().add_expression_with_graph(record, graph)
    }

    pub fn claim_next(&self) -> Result<ClaimedTask> {
        let claimed = self.write().next_ready_task(Instant::now());
        if let Err(CalcdagError::NoTaskAvailable) = &claimed {
            trace!("claim: no task available");
        }
        claimed
    }

    pub fn report_result(&self, task: TaskId, value: f64) -> Result<SchedulerStep> {
        self.write().complete_task(task, value)
    }

    pub fn report_failure(&self, task: TaskId, reason: &str) -> Result<SchedulerStep> {
        self.write().fail_task(task, reason)
    }

    pub fn reclaim_expired(&self) -> Vec<TaskId> {
        self.write().reclaim_expired(Instant::now())
    }

    pub fn lease_timeout(&self) -> Option<Duration> {
        self.read().lease_timeout()
    }

    pub fn expression(&self, id: ExpressionId) -> Option<ExpressionRecord> {
        self.read().expression(id).cloned()
    }

    pub fn expressions(&self) -> Vec<ExpressionRecord> {
        self.read().expressions().cloned().collect()
    }

    pub fn task(&self, id: TaskId) -> Option<TaskRecord> {
        self.read().task(id).cloned()
    }

    pub fn tasks_of(&self, expression: ExpressionId) -> Vec<TaskRecord> {
        self.read()
            .tasks_of(expression)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        self.read().stats()
    }
}
