//! Dispatch worker.
//!
//! A long-lived consumer of the bounded dispatch channel. For every due job
//! it receives, it spawns a dedicated execution task that runs the callback
//! and terminates; the worker loop itself never runs user code, so a slow or
//! failing callback cannot stall the channel or other jobs.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::job::Job;
use crate::core::task::JobContext;
use crate::core::types::RunId;
use crate::events::{Event, EventBus};

/// One due job handed from the alarm path to the worker.
pub(crate) struct Dispatch {
    pub(crate) job: Arc<Job>,
    pub(crate) fired_at: DateTime<Utc>,
}

/// Consume dispatches until the channel closes, spawning one execution task
/// per job.
pub(crate) async fn run_dispatch_loop(
    mut rx: mpsc::Receiver<Dispatch>,
    budget: Duration,
    events: Arc<EventBus>,
) {
    while let Some(dispatch) = rx.recv().await {
        tokio::spawn(execute(dispatch, budget, Arc::clone(&events)));
    }
    debug!("dispatch channel closed, worker exiting");
}

/// Run a single job callback in its own task.
async fn execute(dispatch: Dispatch, budget: Duration, events: Arc<EventBus>) {
    let Dispatch { job, fired_at } = dispatch;
    let run_id = RunId::new();
    let ctx = JobContext::new(job.id(), run_id, fired_at);

    events.emit(Event::dispatch_started(job.id(), run_id)).await;

    let start = Instant::now();
    let result = job.task().run(&ctx).await;
    let elapsed = start.elapsed();

    if elapsed > budget {
        warn!(
            job_id = %job.id(),
            name = job.name(),
            elapsed_ms = elapsed.as_millis() as u64,
            budget_ms = budget.as_millis() as u64,
            "job callback exceeded its time budget"
        );
        events
            .emit(Event::budget_exceeded(job.id(), run_id, elapsed, budget))
            .await;
    }

    match result {
        Ok(()) => {
            debug!(job_id = %job.id(), name = job.name(), elapsed_ms = elapsed.as_millis() as u64, "job callback completed");
            events
                .emit(Event::dispatch_completed(job.id(), run_id, elapsed))
                .await;
        }
        Err(error) => {
            warn!(job_id = %job.id(), name = job.name(), error = %error, "job callback failed");
            events
                .emit(Event::dispatch_failed(job.id(), run_id, error.to_string()))
                .await;
        }
    }
}
