// src/engine/orchestrator.rs

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::compiler::compile_with;
use crate::config::ConfigFile;
use crate::dag::{ExpressionRecord, Scheduler};
use crate::engine::sweeper::spawn_lease_sweeper;
use crate::errors::Result;
use crate::types::{ExpressionId, OperationTimings};

/// Front door for submitting expressions and reading their state.
///
/// Compilation happens synchronously inside [`Orchestrator::submit`], so
/// malformed input is reported to the caller straight away and never
/// reaches the store. Execution is asynchronous: callers observe progress
/// only through [`Orchestrator::expression`] / [`Orchestrator::expressions`].
#[derive(Debug, Clone)]
pub struct Orchestrator {
    scheduler: Scheduler,
    timings: OperationTimings,
    sweep_interval: Duration,
}

impl Orchestrator {
    pub fn new(cfg: &ConfigFile) -> Self {
        Self {
            scheduler: Scheduler::new(cfg.scheduler.lease_timeout),
            timings: cfg.timings,
            sweep_interval: cfg.scheduler.sweep_interval,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Compile `source` and record it. Returns the new expression's ID.
    pub fn submit(&self, source: &str) -> Result<ExpressionId> {
        let graph = compile_with(source, &self.timings)?;
        let id = self.scheduler.submit(source.trim(), graph)?;
        info!(expression = %id, source = %source.trim(), "expression submitted");
        Ok(id)
    }

    pub fn expression(&self, id: ExpressionId) -> Option<ExpressionRecord> {
        self.scheduler.expression(id)
    }

    pub fn expressions(&self) -> Vec<ExpressionRecord> {
        self.scheduler.expressions()
    }

    /// Start the background lease sweeper, if claim leases are enabled.
    pub fn spawn_lease_sweeper(&self, shutdown: watch::Receiver<bool>) -> Option<JoinHandle<()>> {
        let lease_timeout = self.scheduler.lease_timeout()?;
        debug!(
            lease_ms = lease_timeout.as_millis() as u64,
            sweep_ms = self.sweep_interval.as_millis() as u64,
            "starting lease sweeper"
        );
        Some(spawn_lease_sweeper(
            self.scheduler.clone(),
            self.sweep_interval,
            shutdown,
        ))
    }

    /// Poll until every expression in `ids` is `done` or `error`.
    ///
    /// Unknown IDs are skipped. Returns the final snapshots in the order of
    /// `ids`.
    pub async fn wait_until_settled(
        &self,
        ids: &[ExpressionId],
        poll: Duration,
    ) -> Vec<ExpressionRecord> {
        loop {
            let snapshots: Vec<ExpressionRecord> = ids
                .iter()
                .filter_map(|id| self.scheduler.expression(*id))
                .collect();

            if snapshots.iter().all(|e| e.status.is_terminal()) {
                return snapshots;
            }

            sleep(poll).await;
        }
    }
}
