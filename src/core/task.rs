//! Task trait and error types.
//!
//! A [`JobTask`] is the unit of user work a job fires. Implementations run in
//! their own execution context spawned by the dispatch worker; a slow or
//! failing task never blocks the scheduler or other jobs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::future::Future;
use thiserror::Error;

use super::types::{JobId, RunId};

/// Errors returned by job callbacks.
///
/// These never propagate into the scheduler. The dispatch worker logs the
/// failure and emits an event; the job stays scheduled.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Task execution failed with a message.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Generic error wrapper.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Context handed to a task for one execution.
#[derive(Debug, Clone)]
pub struct JobContext {
    job_id: JobId,
    run_id: RunId,
    fired_at: DateTime<Utc>,
}

impl JobContext {
    pub(crate) fn new(job_id: JobId, run_id: RunId, fired_at: DateTime<Utc>) -> Self {
        Self {
            job_id,
            run_id,
            fired_at,
        }
    }

    /// The id of the job being executed.
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// The id of this particular execution.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The instant the scheduler observed the job as due.
    pub fn fired_at(&self) -> DateTime<Utc> {
        self.fired_at
    }
}

/// The work a scheduled job performs when it fires.
///
/// Any state the task needs travels with the implementing type; the
/// scheduler neither copies nor inspects it.
#[async_trait]
pub trait JobTask: Send + Sync {
    /// A short name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Run the task. Called once per dispatch, in a dedicated execution
    /// context that terminates when this returns.
    async fn run(&self, ctx: &JobContext) -> Result<(), TaskError>;
}

/// Adapter that turns an async closure into a [`JobTask`].
pub struct FnTask<F> {
    name: String,
    func: F,
}

impl<F, Fut> FnTask<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    /// Wrap an async closure as a named task.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

#[async_trait]
impl<F, Fut> JobTask for FnTask<F>
where
    F: Fn(JobContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), TaskError>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &JobContext) -> Result<(), TaskError> {
        (self.func)(ctx.clone()).await
    }
}
