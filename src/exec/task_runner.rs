// src/exec/task_runner.rs

//! Computing a single claimed task.

use tokio::time::sleep;
use tracing::debug;

use crate::dag::ClaimedTask;
use crate::errors::{CalcdagError, Result};
use crate::types::Operation;

/// Apply `operation` to two resolved operands.
///
/// `+`, `-` and `*` are total; `/` fails with `DivisionByZero` when the
/// divisor is exactly zero (either sign).
pub fn evaluate(operation: Operation, lhs: f64, rhs: f64) -> Result<f64> {
    match operation {
        Operation::Add => Ok(lhs + rhs),
        Operation::Subtract => Ok(lhs - rhs),
        Operation::Multiply => Ok(lhs * rhs),
        Operation::Divide => {
            if rhs == 0.0 {
                Err(CalcdagError::DivisionByZero)
            } else {
                Ok(lhs / rhs)
            }
        }
    }
}

/// Run a claimed task: wait out its estimated duration (when latency
/// simulation is on), then compute it.
pub async fn run_task(task: &ClaimedTask, simulate_latency: bool) -> Result<f64> {
    if simulate_latency && !task.estimated_duration.is_zero() {
        debug!(
            task = %task.id,
            millis = task.estimated_duration.as_millis() as u64,
            "simulating operation latency"
        );
        sleep(task.estimated_duration).await;
    }

    evaluate(task.operation, task.lhs, task.rhs)
}
