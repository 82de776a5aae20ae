//! Scheduler configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable knobs for a [`Cron`](crate::Cron) instance.
///
/// The defaults match the behavior of a small embedded deployment: a short
/// dispatch queue, a bounded drain per wakeup, and a soft five second
/// callback budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronConfig {
    /// Capacity of the bounded dispatch channel between the alarm path and
    /// the worker. A full channel drops dispatches rather than blocking.
    pub channel_capacity: usize,

    /// Maximum number of due jobs processed per alarm firing. Remaining
    /// overdue jobs are picked up on the immediately following wakeup.
    pub drain_limit: usize,

    /// Minimum delay the timer is ever armed with. Prevents zero-delay
    /// re-fire storms when a due time has already passed.
    pub min_delay: Duration,

    /// Width of the debounce slot. A job fires at most once per slot.
    pub debounce_granularity: Duration,

    /// Soft time budget for a single callback execution. Exceeding it emits
    /// a warning; the callback is never cancelled.
    pub callback_budget: Duration,
}

impl Default for CronConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 10,
            drain_limit: 16,
            min_delay: Duration::from_millis(1),
            debounce_granularity: Duration::from_secs(1),
            callback_budget: Duration::from_secs(5),
        }
    }
}

impl CronConfig {
    /// Debounce slot index for a unix timestamp.
    pub(crate) fn slot_of(&self, unix_seconds: i64) -> i64 {
        let width = self.debounce_granularity.as_secs().max(1) as i64;
        unix_seconds.div_euclid(width)
    }
}
