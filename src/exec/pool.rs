// src/exec/pool.rs

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::WorkerSettings;
use crate::exec::backend::TaskSource;
use crate::exec::executor_loop::run_worker;

/// A fixed set of worker loops sharing one [`TaskSource`].
///
/// Workers run until [`WorkerPool::shutdown`] is called. Dropping the pool
/// without calling it also stops the workers (the shutdown sender goes away),
/// but nothing waits for them.
#[derive(Debug)]
pub struct WorkerPool {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `settings.count` workers on the current Tokio runtime.
    pub fn spawn<S>(source: Arc<S>, settings: &WorkerSettings) -> Self
    where
        S: TaskSource + ?Sized + 'static,
    {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let count = settings.count.max(1);

        let handles = (0..count)
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    Arc::clone(&source),
                    settings.clone(),
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        info!(workers = count, "worker pool started");

        Self { shutdown, handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every worker to stop and wait for them.
    ///
    /// A worker in the middle of a task finishes and reports it first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);

        for handle in self.handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "worker task ended abnormally");
            }
        }

        info!("worker pool stopped");
    }
}
