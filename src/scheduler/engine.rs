//! Scheduler engine and lifecycle control.
//!
//! [`Cron`] is an explicit scheduler instance: it owns the job registry, the
//! wakeup timer, the dispatch channel, and the worker. Multiple independent
//! instances can coexist, and a stopped instance can be started again (job
//! ids keep counting up and are never reused).

use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::config::CronConfig;
use super::registry::JobRegistry;
use super::timer::OneShotTimer;
use super::worker::{self, Dispatch};
use crate::core::expression::ExpressionError;
use crate::core::job::Job;
use crate::core::task::JobTask;
use crate::core::types::JobId;
use crate::events::{Event, EventBus};

/// Advisory value stored while no wakeup is scheduled.
pub(crate) const IDLE_ADVISORY: i64 = i64::MIN;

/// Errors returned by scheduler operations.
#[derive(Debug, Error)]
pub enum CronError {
    /// Malformed schedule expression.
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// `schedule()` was called on a job with no loaded expression.
    #[error("job {0} has no loaded expression")]
    NotLoaded(JobId),

    /// The job's expression has no occurrence after the current time.
    #[error("expression for job {0} has no upcoming occurrence")]
    NoUpcoming(JobId),

    /// A job with this id is already scheduled.
    #[error("job {0} is already scheduled")]
    DuplicateJob(JobId),

    /// `start()` was called on a running scheduler.
    #[error("scheduler is already running")]
    AlreadyRunning,

    /// `stop()` was called on a stopped scheduler.
    #[error("scheduler is not running")]
    NotRunning,
}

/// Shared scheduler state. Everything the alarm path, the worker, and the
/// caller-facing methods touch lives here behind one `Arc`.
pub(crate) struct Inner {
    pub(crate) config: CronConfig,
    pub(crate) registry: Mutex<JobRegistry>,
    pub(crate) dispatch_tx: Mutex<Option<mpsc::Sender<Dispatch>>>,
    pub(crate) timer: OneShotTimer,
    worker: Mutex<Option<JoinHandle<()>>>,
    pub(crate) running: AtomicBool,
    next_id: AtomicU64,
    pub(crate) advisory_seconds: AtomicI64,
    pub(crate) rearms: AtomicU64,
    pub(crate) events: Arc<EventBus>,
}

impl Inner {
    #[cfg(test)]
    pub(crate) fn rearm_count(&self) -> u64 {
        self.rearms.load(Ordering::Relaxed)
    }
}

/// A timer-driven cron job scheduler.
///
/// Jobs are registered with a cron expression and a [`JobTask`]; the
/// scheduler wakes exactly at the next due time, dispatches every due job to
/// its own execution context, reschedules them, and goes back to sleep.
pub struct Cron {
    inner: Arc<Inner>,
}

impl Cron {
    /// Create a stopped scheduler with default configuration.
    pub fn new() -> Self {
        Self::with_config(CronConfig::default())
    }

    /// Create a stopped scheduler with the given configuration.
    pub fn with_config(config: CronConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                registry: Mutex::new(JobRegistry::new()),
                dispatch_tx: Mutex::new(None),
                timer: OneShotTimer::new(),
                worker: Mutex::new(None),
                running: AtomicBool::new(false),
                next_id: AtomicU64::new(1),
                advisory_seconds: AtomicI64::new(IDLE_ADVISORY),
                rearms: AtomicU64::new(0),
                events: Arc::new(EventBus::new()),
            }),
        }
    }

    /// Set the dispatch channel capacity. Must be called before `start()`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.config_mut().channel_capacity = capacity;
        self
    }

    /// Set the per-wakeup drain limit. Must be called before `start()`.
    pub fn with_drain_limit(mut self, limit: usize) -> Self {
        self.config_mut().drain_limit = limit;
        self
    }

    /// Set the soft callback time budget. Must be called before `start()`.
    pub fn with_callback_budget(mut self, budget: std::time::Duration) -> Self {
        self.config_mut().callback_budget = budget;
        self
    }

    /// Set the debounce slot width. Must be called before `start()`.
    pub fn with_debounce_granularity(mut self, granularity: std::time::Duration) -> Self {
        self.config_mut().debounce_granularity = granularity;
        self
    }

    pub(crate) fn config_mut(&mut self) -> &mut CronConfig {
        &mut Arc::get_mut(&mut self.inner)
            .expect("configuration must happen before the scheduler is shared")
            .config
    }

    /// The event bus this scheduler emits lifecycle events on.
    pub fn event_bus(&self) -> &EventBus {
        &self.inner.events
    }

    /// Whether the scheduler is currently running.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Number of currently scheduled jobs.
    pub fn job_count(&self) -> usize {
        self.inner
            .registry
            .lock()
            .expect("registry lock poisoned")
            .len()
    }

    /// Whether the given job is currently scheduled.
    pub fn is_scheduled(&self, job: &Job) -> bool {
        self.inner
            .registry
            .lock()
            .expect("registry lock poisoned")
            .contains(job.id())
    }

    /// Advisory seconds until the next wakeup, or `None` when idle.
    pub fn seconds_until_next_execution(&self) -> Option<i64> {
        match self.inner.advisory_seconds.load(Ordering::SeqCst) {
            IDLE_ADVISORY => None,
            seconds => Some(seconds),
        }
    }

    /// Start the scheduler: create the dispatch channel, spawn the worker,
    /// and arm the timer for the earliest scheduled job.
    pub async fn start(&self) -> Result<(), CronError> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(CronError::AlreadyRunning);
        }

        let (tx, rx) = mpsc::channel(self.inner.config.channel_capacity);
        *self
            .inner
            .dispatch_tx
            .lock()
            .expect("dispatch channel lock poisoned") = Some(tx);

        let worker = tokio::spawn(worker::run_dispatch_loop(
            rx,
            self.inner.config.callback_budget,
            Arc::clone(&self.inner.events),
        ));
        *self.inner.worker.lock().expect("worker lock poisoned") = Some(worker);

        info!("scheduler started");
        self.inner.events.emit(Event::scheduler_started()).await;
        self.inner.rearm();
        Ok(())
    }

    /// Stop the scheduler: tear down the worker and timer, close the
    /// channel, and clear all jobs.
    ///
    /// In-flight callback executions are not cancelled and not awaited.
    pub async fn stop(&self) -> Result<(), CronError> {
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return Err(CronError::NotRunning);
        }

        if let Some(worker) = self
            .inner
            .worker
            .lock()
            .expect("worker lock poisoned")
            .take()
        {
            worker.abort();
        }
        self.inner.timer.disarm();
        *self
            .inner
            .dispatch_tx
            .lock()
            .expect("dispatch channel lock poisoned") = None;

        self.clear_all().await;
        self.inner
            .advisory_seconds
            .store(IDLE_ADVISORY, Ordering::SeqCst);

        info!("scheduler stopped");
        self.inner.events.emit(Event::scheduler_stopped()).await;
        Ok(())
    }

    /// Create a job from an expression and schedule it.
    ///
    /// The id is reserved before parsing, so a failed parse consumes an id
    /// and ids stay strictly monotonic across all creates.
    pub async fn create(
        &self,
        expression: &str,
        task: Arc<dyn JobTask>,
    ) -> Result<Arc<Job>, CronError> {
        let id = self.next_job_id();
        let job = Arc::new(Job::unloaded(id, task));
        job.load_expression(expression)?;
        self.schedule(&job).await?;
        debug!(job_id = %id, name = job.name(), expression, "job created");
        Ok(job)
    }

    /// Compute the job's next occurrence and insert it into the registry.
    ///
    /// Idempotent for an already-scheduled job: any stale entry is removed
    /// first. The timer is rearmed only if the job became (or tied) the new
    /// registry head.
    pub async fn schedule(&self, job: &Arc<Job>) -> Result<(), CronError> {
        let now = Utc::now();
        let next = match job.compute_next_occurrence(now) {
            Some(next) => next,
            None if !job.is_loaded() => return Err(CronError::NotLoaded(job.id())),
            None => return Err(CronError::NoUpcoming(job.id())),
        };
        job.reset_for_schedule(next);

        let became_head = {
            let mut registry = self.inner.registry.lock().expect("registry lock poisoned");
            registry.remove(job.id());
            let head_at = registry.peek_earliest().map(|entry| entry.at);
            registry
                .insert(next, Arc::clone(job))
                .map_err(|_| CronError::DuplicateJob(job.id()))?;
            head_at.is_none_or(|at| next <= at)
        };

        if became_head {
            self.inner.rearm();
        }
        self.inner
            .events
            .emit(Event::job_scheduled(job.id(), next))
            .await;
        Ok(())
    }

    /// Remove the job from the registry. Idempotent; returns whether it was
    /// scheduled.
    ///
    /// Removing the current head rearms the timer eagerly, so no wakeup is
    /// left pending for a job that is no longer scheduled.
    pub async fn unschedule(&self, job: &Arc<Job>) -> bool {
        let (removed, was_head) = {
            let mut registry = self.inner.registry.lock().expect("registry lock poisoned");
            let was_head = registry
                .peek_earliest()
                .map(|entry| entry.job.id() == job.id())
                .unwrap_or(false);
            (registry.remove(job.id()), was_head)
        };

        if removed {
            job.clear_next_execution();
            if was_head {
                self.inner.rearm();
            }
            self.inner
                .events
                .emit(Event::job_unscheduled(job.id()))
                .await;
        }
        removed
    }

    /// Unschedule the job and release the scheduler's references to it.
    ///
    /// The caller's own clones keep the job alive; the scheduler holds
    /// nothing once this returns.
    pub async fn destroy(&self, job: Arc<Job>) {
        self.unschedule(&job).await;
        drop(job);
    }

    /// Destroy every scheduled job, head first, until the registry is empty.
    pub async fn clear_all(&self) {
        loop {
            let head = {
                let registry = self.inner.registry.lock().expect("registry lock poisoned");
                registry.peek_earliest().map(|entry| Arc::clone(&entry.job))
            };
            match head {
                Some(job) => self.destroy(job).await,
                None => break,
            }
        }
    }

    pub(crate) fn next_job_id(&self) -> JobId {
        JobId::new(self.inner.next_id.fetch_add(1, Ordering::SeqCst))
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &Arc<Inner> {
        &self.inner
    }
}

impl Default for Cron {
    fn default() -> Self {
        Self::new()
    }
}
