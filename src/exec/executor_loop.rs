// src/exec/executor_loop.rs

//! The claim -> compute -> report loop run by every worker.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::config::WorkerSettings;
use crate::dag::ClaimedTask;
use crate::errors::{CalcdagError, Result};
use crate::exec::backend::TaskSource;
use crate::exec::task_runner::run_task;

/// Run one worker until `shutdown` flips to `true` (or its sender is dropped).
///
/// The shutdown signal is checked between iterations and while idling; a
/// task that has been claimed is always computed and reported.
pub async fn run_worker<S>(
    worker: usize,
    source: Arc<S>,
    settings: WorkerSettings,
    mut shutdown: watch::Receiver<bool>,
) where
    S: TaskSource + ?Sized,
{
    info!(worker, "worker started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        let claimed = with_retry("claim", &settings, || source.claim()).await;

        let pause = match claimed {
            Ok(task) => {
                process_task(worker, source.as_ref(), &settings, task).await;
                None
            }
            Err(CalcdagError::NoTaskAvailable) => {
                trace!(worker, "no task available");
                Some(settings.idle_poll)
            }
            Err(err) => {
                warn!(worker, error = %err, "failed to claim a task");
                Some(settings.error_backoff)
            }
        };

        if let Some(duration) = pause {
            if idle(&mut shutdown, duration).await {
                break;
            }
        }
    }

    info!(worker, "worker stopped");
}

/// Compute a claimed task and report the outcome.
async fn process_task<S>(worker: usize, source: &S, settings: &WorkerSettings, task: ClaimedTask)
where
    S: TaskSource + ?Sized,
{
    debug!(
        worker,
        task = %task.id,
        expression = %task.expression_id,
        operation = %task.operation,
        lhs = task.lhs,
        rhs = task.rhs,
        attempt = task.attempt,
        "computing task"
    );

    match run_task(&task, settings.simulate_latency).await {
        Ok(value) => {
            let reported =
                with_retry("report result", settings, || source.submit_result(task.id, value))
                    .await;
            match reported {
                Ok(()) => debug!(worker, task = %task.id, value, "result reported"),
                Err(err) => warn!(
                    worker,
                    task = %task.id,
                    error = %err,
                    "failed to report result"
                ),
            }
        }
        Err(err) => {
            info!(worker, task = %task.id, error = %err, "task computation failed");
            let reason = err.to_string();
            let reported = with_retry("report failure", settings, || {
                source.submit_failure(task.id, reason.clone())
            })
            .await;
            if let Err(err) = reported {
                warn!(
                    worker,
                    task = %task.id,
                    error = %err,
                    "failed to report task failure"
                );
            }
        }
    }
}

/// Call `op` up to `settings.max_retries` times, sleeping `retry_delay`
/// between attempts. Only retryable (transport) errors trigger another
/// attempt; everything else, including `NoTaskAvailable`, returns at once.
pub async fn with_retry<T, F, Fut>(what: &str, settings: &WorkerSettings, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = settings.max_retries.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                debug!(what, attempt, max_attempts, error = %err, "retrying after transport error");
                sleep(settings.retry_delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Sleep for `duration` unless shutdown is requested first.
///
/// Returns `true` if the worker should stop.
async fn idle(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    tokio::select! {
        _ = sleep(duration) => *shutdown.borrow(),
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
