//! Common test utilities shared across integration tests.

use minicron::testing::{CountingTask, wait_until};
use std::sync::Arc;
use std::time::Duration;

/// Wait until a counting task has fired at least `n` times.
///
/// Polls every 10ms; panics if the timeout is reached first.
pub async fn wait_for_fired(task: &Arc<CountingTask>, n: usize, timeout: Duration) {
    let task = Arc::clone(task);
    wait_until(timeout, &format!("task to fire {} times", n), move || {
        task.fired() >= n
    })
    .await;
}
