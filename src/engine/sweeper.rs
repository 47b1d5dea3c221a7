// src/engine/sweeper.rs

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::dag::Scheduler;

/// Spawn a task that returns expired claims to the ready queue every
/// `every`, until `shutdown` flips to `true` or its sender is dropped.
pub fn spawn_lease_sweeper(
    scheduler: Scheduler,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let reclaimed = scheduler.reclaim_expired();
                    if !reclaimed.is_empty() {
                        info!(count = reclaimed.len(), "reclaimed tasks with expired leases");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!("lease sweeper stopped");
    })
}
