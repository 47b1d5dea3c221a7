use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;

use calcdag::dag::{ClaimedTask, Scheduler};
use calcdag::errors::CalcdagError;
use calcdag::exec::{LocalTaskSource, SourceFuture, TaskSource};
use calcdag::types::TaskId;

/// A task source that wraps a [`LocalTaskSource`] and:
/// - fails the first `claim_failures` claims with a transport error
/// - fails the first `report_failures` result reports with a transport error
/// - records every value it forwarded to the scheduler.
pub struct FlakySource {
    inner: LocalTaskSource,
    claim_failures: AtomicUsize,
    report_failures: AtomicUsize,
    claim_calls: AtomicUsize,
    report_calls: AtomicUsize,
    reported: Mutex<Vec<(TaskId, f64)>>,
}

impl FlakySource {
    pub fn new(scheduler: Scheduler, claim_failures: usize, report_failures: usize) -> Self {
        Self {
            inner: LocalTaskSource::new(scheduler),
            claim_failures: AtomicUsize::new(claim_failures),
            report_failures: AtomicUsize::new(report_failures),
            claim_calls: AtomicUsize::new(0),
            report_calls: AtomicUsize::new(0),
            reported: Mutex::new(Vec::new()),
        }
    }

    pub fn claim_calls(&self) -> usize {
        self.claim_calls.load(Ordering::SeqCst)
    }

    pub fn report_calls(&self) -> usize {
        self.report_calls.load(Ordering::SeqCst)
    }

    pub fn reported(&self) -> Vec<(TaskId, f64)> {
        self.reported.lock().unwrap().clone()
    }
}

/// Decrement `counter` if positive; returns whether it was.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl TaskSource for FlakySource {
    fn claim(&self) -> SourceFuture<'_, ClaimedTask> {
        Box::pin(async move {
            self.claim_calls.fetch_add(1, Ordering::SeqCst);
            if take_one(&self.claim_failures) {
                debug!("dropping claim");
                return Err(CalcdagError::Transport("claim dropped".into()));
            }
            self.inner.claim().await
        })
    }

    fn submit_result(&self, task: TaskId, value: f64) -> SourceFuture<'_, ()> {
        Box::pin(async move {
            self.report_calls.fetch_add(1, Ordering::SeqCst);
            if take_one(&self.report_failures) {
                debug!(task = %task, value, "dropping result report");
                return Err(CalcdagError::Transport("report dropped".into()));
            }
            self.reported.lock().unwrap().push((task, value));
            self.inner.submit_result(task, value).await
        })
    }

    fn submit_failure(&self, task: TaskId, reason: String) -> SourceFuture<'_, ()> {
        self.inner.submit_failure(task, reason)
    }
}
