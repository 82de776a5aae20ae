//! Testing utilities for users of the minicron library.
//!
//! These helpers cover the two things scheduler tests keep needing: tasks
//! whose executions can be counted or forced to fail, and an event handler
//! that records everything the scheduler emits.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::core::task::{JobContext, JobTask, TaskError};
use crate::events::{Event, EventHandler};

/// A task that counts how many times it has run.
pub struct CountingTask {
    name: String,
    fired: AtomicUsize,
}

impl CountingTask {
    /// Create a counting task with the given name.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            fired: AtomicUsize::new(0),
        })
    }

    /// Number of completed executions.
    pub fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobTask for CountingTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: &JobContext) -> Result<(), TaskError> {
        self.fired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A task that always fails with the given message.
pub struct FailingTask {
    name: String,
    message: String,
    attempts: AtomicUsize,
}

impl FailingTask {
    /// Create a failing task.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            message: message.into(),
            attempts: AtomicUsize::new(0),
        })
    }

    /// Number of times the task was invoked.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobTask for FailingTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _ctx: &JobContext) -> Result<(), TaskError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TaskError::ExecutionFailed(self.message.clone()))
    }
}

/// Event handler that records every event it sees.
pub struct RecordingHandler {
    events: Mutex<Vec<Event>>,
}

impl RecordingHandler {
    /// Create a recording handler.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    /// All events recorded so far.
    pub async fn events(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    /// Count recorded events matching a predicate.
    pub async fn count_where(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().await.iter().filter(|e| predicate(e)).count()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: &Event) {
        self.events.lock().await.push(event.clone());
    }
}

/// Poll a condition until it holds or the timeout elapses.
///
/// More reliable than fixed sleeps when execution timing varies.
///
/// # Panics
///
/// Panics with `description` if the timeout is reached first.
pub async fn wait_until(
    timeout: Duration,
    description: &str,
    mut condition: impl FnMut() -> bool,
) {
    let start = tokio::time::Instant::now();
    loop {
        if condition() {
            return;
        }
        if start.elapsed() > timeout {
            panic!("timeout waiting for: {}", description);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{JobId, RunId};
    use chrono::Utc;

    #[tokio::test]
    async fn test_counting_task_counts() {
        let task = CountingTask::new("count");
        let ctx = JobContext::new(JobId::new(1), RunId::new(), Utc::now());
        task.run(&ctx).await.unwrap();
        task.run(&ctx).await.unwrap();
        assert_eq!(task.fired(), 2);
    }

    #[tokio::test]
    async fn test_failing_task_fails_and_counts_attempts() {
        let task = FailingTask::new("fail", "nope");
        let ctx = JobContext::new(JobId::new(1), RunId::new(), Utc::now());
        assert!(task.run(&ctx).await.is_err());
        assert!(task.run(&ctx).await.is_err());
        assert_eq!(task.attempts(), 2);
    }

    #[tokio::test]
    async fn test_recording_handler_counts_by_predicate() {
        let handler = RecordingHandler::new();
        handler.handle(&Event::dispatch_dropped(JobId::new(1))).await;
        handler.handle(&Event::scheduler_started()).await;

        assert_eq!(handler.events().await.len(), 2);
        assert_eq!(
            handler
                .count_where(|e| matches!(e, Event::DispatchDropped { .. }))
                .await,
            1
        );
    }

    #[tokio::test]
    async fn test_wait_until_returns_when_condition_holds() {
        let mut calls = 0;
        wait_until(Duration::from_secs(1), "condition", || {
            calls += 1;
            calls >= 3
        })
        .await;
        assert!(calls >= 3);
    }
}
