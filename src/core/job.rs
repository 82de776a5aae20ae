//! Job definition and per-job scheduling state.
//!
//! A [`Job`] pairs a task with a schedule expression and carries the mutable
//! state the scheduler tracks for it: the next execution time and the last
//! time slot it fired in. Jobs are shared as `Arc<Job>` between the caller
//! and the registry; there is no separate owner to free them.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::{Arc, Mutex};

use super::expression::{Expression, ExpressionError};
use super::task::JobTask;
use super::types::JobId;

/// A schedulable unit of work.
pub struct Job {
    id: JobId,
    task: Arc<dyn JobTask>,
    state: Mutex<ScheduleState>,
}

#[derive(Default)]
struct ScheduleState {
    expression: Option<Expression>,
    next_execution: Option<DateTime<Utc>>,
    last_triggered_slot: Option<i64>,
}

impl Job {
    /// Create a job with no expression loaded yet.
    pub(crate) fn unloaded(id: JobId, task: Arc<dyn JobTask>) -> Self {
        Self {
            id,
            task,
            state: Mutex::new(ScheduleState::default()),
        }
    }

    /// The job's unique id.
    pub fn id(&self) -> JobId {
        self.id
    }

    /// The task's short name, used in logs.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// The task this job fires.
    pub fn task(&self) -> &Arc<dyn JobTask> {
        &self.task
    }

    /// Parse and load a schedule expression, replacing any previous one.
    ///
    /// On parse failure the previous expression is already discarded and the
    /// job is left unloaded; a subsequent `schedule()` will fail until a
    /// valid expression is loaded.
    pub fn load_expression(&self, text: &str) -> Result<(), ExpressionError> {
        let mut state = self.state.lock().expect("job state lock poisoned");
        state.expression = None;
        let expression = Expression::parse(text)?;
        state.expression = Some(expression);
        Ok(())
    }

    /// Load an already-parsed expression (e.g. one built with a timezone).
    pub fn set_expression(&self, expression: Expression) {
        let mut state = self.state.lock().expect("job state lock poisoned");
        state.expression = Some(expression);
    }

    /// Whether a valid expression is currently loaded.
    pub fn is_loaded(&self) -> bool {
        self.state
            .lock()
            .expect("job state lock poisoned")
            .expression
            .is_some()
    }

    /// The loaded expression's text, if any.
    pub fn expression_text(&self) -> Option<String> {
        self.state
            .lock()
            .expect("job state lock poisoned")
            .expression
            .as_ref()
            .map(|e| e.as_str().to_string())
    }

    /// The next time this job is due, if scheduled.
    pub fn next_execution(&self) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .expect("job state lock poisoned")
            .next_execution
    }

    /// Next occurrence strictly after `after`, or `None` if the job is
    /// unloaded or the expression is exhausted.
    pub(crate) fn compute_next_occurrence(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.state
            .lock()
            .expect("job state lock poisoned")
            .expression
            .as_ref()?
            .next_after(after)
    }

    /// Stamp a freshly computed due time and reset the debounce slot.
    pub(crate) fn reset_for_schedule(&self, next: DateTime<Utc>) {
        let mut state = self.state.lock().expect("job state lock poisoned");
        state.next_execution = Some(next);
        state.last_triggered_slot = None;
    }

    pub(crate) fn set_next_execution(&self, next: DateTime<Utc>) {
        self.state
            .lock()
            .expect("job state lock poisoned")
            .next_execution = Some(next);
    }

    pub(crate) fn clear_next_execution(&self) {
        self.state
            .lock()
            .expect("job state lock poisoned")
            .next_execution = None;
    }

    pub(crate) fn already_fired_in_slot(&self, slot: i64) -> bool {
        self.state
            .lock()
            .expect("job state lock poisoned")
            .last_triggered_slot
            == Some(slot)
    }

    pub(crate) fn mark_fired(&self, slot: i64) {
        self.state
            .lock()
            .expect("job state lock poisoned")
            .last_triggered_slot = Some(slot);
    }

    #[cfg(test)]
    pub(crate) fn last_triggered_slot(&self) -> Option<i64> {
        self.state
            .lock()
            .expect("job state lock poisoned")
            .last_triggered_slot
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock().expect("job state lock poisoned");
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("name", &self.task.name())
            .field(
                "expression",
                &state.expression.as_ref().map(|e| e.as_str()),
            )
            .field("next_execution", &state.next_execution)
            .finish()
    }
}
