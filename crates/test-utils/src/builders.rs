#![allow(dead_code)]

use std::time::Duration;

use calcdag::config::{ConfigFile, RawConfigFile};
use calcdag::dag::{TaskGraph, TaskSpec};
use calcdag::types::{Operand, Operation, TaskId};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from a configuration tuned for tests: no simulated latency,
/// millisecond polling and retry delays, leases disabled.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        config.workers.count = 2;
        config.workers.idle_poll_ms = 5;
        config.workers.error_backoff_ms = 5;
        config.workers.retry_delay_ms = 1;
        config.workers.simulate_latency = false;
        config.scheduler.lease_timeout_ms = 0;
        Self { config }
    }

    pub fn with_workers(mut self, count: usize) -> Self {
        self.config.workers.count = count;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.config.workers.max_retries = retries;
        self
    }

    pub fn with_latency(mut self, all_ops_ms: u64) -> Self {
        self.config.workers.simulate_latency = true;
        self.config.timings.addition_ms = all_ops_ms;
        self.config.timings.subtraction_ms = all_ops_ms;
        self.config.timings.multiplication_ms = all_ops_ms;
        self.config.timings.division_ms = all_ops_ms;
        self
    }

    pub fn with_lease(mut self, lease_ms: u64, sweep_ms: u64) -> Self {
        self.config.scheduler.lease_timeout_ms = lease_ms;
        self.config.scheduler.sweep_interval_ms = sweep_ms;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Hand-assembles a `TaskGraph`, for store tests that need shapes the
/// compiler never emits (shared operands, invalid graphs).
///
/// Task IDs are assigned in insertion order starting at 0. The last task
/// added becomes the root unless `root` is called.
pub struct GraphBuilder {
    tasks: Vec<TaskSpec>,
    root: Option<TaskId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            root: None,
        }
    }

    /// Add a task and return its ID.
    pub fn task(&mut self, operation: Operation, lhs: Operand, rhs: Operand) -> TaskId {
        let id = TaskId(self.tasks.len() as u64);
        self.tasks.push(TaskSpec {
            id,
            operation,
            lhs,
            rhs,
            estimated_duration: Duration::ZERO,
        });
        id
    }

    /// Add a task with an explicit ID, e.g. to create duplicates.
    pub fn raw(&mut self, spec: TaskSpec) -> &mut Self {
        self.tasks.push(spec);
        self
    }

    pub fn root(&mut self, id: TaskId) -> &mut Self {
        self.root = Some(id);
        self
    }

    pub fn build(&self) -> TaskGraph {
        let root = self
            .root
            .or_else(|| self.tasks.last().map(|t| t.id))
            .unwrap_or(TaskId(0));
        TaskGraph::new(self.tasks.clone(), root)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for `Operand::Literal`.
pub fn lit(value: f64) -> Operand {
    Operand::Literal(value)
}

/// Shorthand for `Operand::Task`.
pub fn dep(id: TaskId) -> Operand {
    Operand::Task(id)
}
