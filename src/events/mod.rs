//! Lifecycle events and event handling.
//!
//! The scheduler and dispatch worker emit events for the observable points
//! of a job's life: scheduling, dispatch, completion, failure, and dropped
//! or over-budget executions. Handlers registered on the [`EventBus`] see
//! every event; tests use this as their observation seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::core::types::{JobId, RunId};

/// Lifecycle events emitted during scheduling and dispatch.
#[derive(Debug, Clone)]
pub enum Event {
    /// The scheduler started: worker spawned, timer created.
    SchedulerStarted { timestamp: Instant },

    /// The scheduler stopped and all jobs were cleared.
    SchedulerStopped { timestamp: Instant },

    /// A job was inserted into the registry.
    JobScheduled {
        job_id: JobId,
        next_execution: DateTime<Utc>,
        timestamp: Instant,
    },

    /// A job was removed from the registry.
    JobUnscheduled { job_id: JobId, timestamp: Instant },

    /// A due job was handed to an execution context.
    DispatchStarted {
        job_id: JobId,
        run_id: RunId,
        timestamp: Instant,
    },

    /// A job callback returned successfully.
    DispatchCompleted {
        job_id: JobId,
        run_id: RunId,
        duration: Duration,
        timestamp: Instant,
    },

    /// A job callback returned an error. The job stays scheduled.
    DispatchFailed {
        job_id: JobId,
        run_id: RunId,
        error: String,
        timestamp: Instant,
    },

    /// A due job could not be enqueued because the dispatch channel was
    /// full; the job was rescheduled without executing this cycle.
    DispatchDropped { job_id: JobId, timestamp: Instant },

    /// A callback ran past its soft time budget. Advisory only.
    BudgetExceeded {
        job_id: JobId,
        run_id: RunId,
        elapsed: Duration,
        budget: Duration,
        timestamp: Instant,
    },
}

impl Event {
    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> Instant {
        match self {
            Event::SchedulerStarted { timestamp }
            | Event::SchedulerStopped { timestamp }
            | Event::JobScheduled { timestamp, .. }
            | Event::JobUnscheduled { timestamp, .. }
            | Event::DispatchStarted { timestamp, .. }
            | Event::DispatchCompleted { timestamp, .. }
            | Event::DispatchFailed { timestamp, .. }
            | Event::DispatchDropped { timestamp, .. }
            | Event::BudgetExceeded { timestamp, .. } => *timestamp,
        }
    }

    pub fn scheduler_started() -> Self {
        Event::SchedulerStarted {
            timestamp: Instant::now(),
        }
    }

    pub fn scheduler_stopped() -> Self {
        Event::SchedulerStopped {
            timestamp: Instant::now(),
        }
    }

    pub fn job_scheduled(job_id: JobId, next_execution: DateTime<Utc>) -> Self {
        Event::JobScheduled {
            job_id,
            next_execution,
            timestamp: Instant::now(),
        }
    }

    pub fn job_unscheduled(job_id: JobId) -> Self {
        Event::JobUnscheduled {
            job_id,
            timestamp: Instant::now(),
        }
    }

    pub fn dispatch_started(job_id: JobId, run_id: RunId) -> Self {
        Event::DispatchStarted {
            job_id,
            run_id,
            timestamp: Instant::now(),
        }
    }

    pub fn dispatch_completed(job_id: JobId, run_id: RunId, duration: Duration) -> Self {
        Event::DispatchCompleted {
            job_id,
            run_id,
            duration,
            timestamp: Instant::now(),
        }
    }

    pub fn dispatch_failed(job_id: JobId, run_id: RunId, error: impl Into<String>) -> Self {
        Event::DispatchFailed {
            job_id,
            run_id,
            error: error.into(),
            timestamp: Instant::now(),
        }
    }

    pub fn dispatch_dropped(job_id: JobId) -> Self {
        Event::DispatchDropped {
            job_id,
            timestamp: Instant::now(),
        }
    }

    pub fn budget_exceeded(
        job_id: JobId,
        run_id: RunId,
        elapsed: Duration,
        budget: Duration,
    ) -> Self {
        Event::BudgetExceeded {
            job_id,
            run_id,
            elapsed,
            budget,
            timestamp: Instant::now(),
        }
    }
}

/// Handler for receiving lifecycle events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: &Event);
}

/// Event bus distributing events to registered handlers.
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    /// Create a new event bus with no handlers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register an event handler.
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    /// Emit an event to all registered handlers.
    pub async fn emit(&self, event: Event) {
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            handler.handle(&event).await;
        }
    }

    /// Get the number of registered handlers.
    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
