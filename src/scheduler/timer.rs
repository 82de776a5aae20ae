//! One-shot wakeup timer and the rearm protocol.
//!
//! The scheduler keeps exactly one pending alarm: the next due time of the
//! registry head. [`OneShotTimer`] guarantees single-alarm semantics by
//! aborting any previous arm before arming again; `rearm` is the single
//! point of truth for when the scheduler next wakes.

use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

use super::engine::{IDLE_ADVISORY, Inner};

/// A single-shot alarm backed by a sleeping tokio task.
pub(crate) struct OneShotTimer {
    armed: Mutex<Option<AbortHandle>>,
}

impl OneShotTimer {
    pub(crate) fn new() -> Self {
        Self {
            armed: Mutex::new(None),
        }
    }

    /// Arm the timer. Any previously pending alarm is fully disarmed first,
    /// so at most one alarm is ever outstanding.
    pub(crate) fn arm<F, Fut>(&self, delay: Duration, on_fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.armed.lock().expect("timer lock poisoned");
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire().await;
        });
        *slot = Some(handle.abort_handle());
    }

    /// Cancel any pending alarm.
    pub(crate) fn disarm(&self) {
        if let Some(handle) = self.armed.lock().expect("timer lock poisoned").take() {
            handle.abort();
        }
    }

    /// Whether an alarm is pending (armed and not yet fired).
    pub(crate) fn is_armed(&self) -> bool {
        self.armed
            .lock()
            .expect("timer lock poisoned")
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

impl Inner {
    /// Recompute the next wakeup from the registry head and arm the timer
    /// for it.
    ///
    /// This must be the last action of the alarm handler and of any
    /// scheduling call that may have changed the registry head. An empty
    /// registry disarms the timer; a head in the past is clamped to the
    /// minimum delay floor. The advisory seconds-until-next value is
    /// refreshed either way; the timer itself is only armed while the
    /// scheduler is running.
    pub(crate) fn rearm(self: &Arc<Self>) {
        self.rearms.fetch_add(1, Ordering::Relaxed);

        let head_at = self
            .registry
            .lock()
            .expect("registry lock poisoned")
            .peek_earliest()
            .map(|entry| entry.at);

        let Some(at) = head_at else {
            self.timer.disarm();
            self.advisory_seconds.store(IDLE_ADVISORY, Ordering::SeqCst);
            debug!("registry empty, timer disarmed");
            return;
        };

        let now = chrono::Utc::now();
        self.advisory_seconds
            .store((at - now).num_seconds(), Ordering::SeqCst);

        if !self.running.load(Ordering::SeqCst) {
            return;
        }

        let delay = (at - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
            .max(self.config.min_delay);

        let weak = Arc::downgrade(self);
        self.timer.arm(delay, move || async move {
            if let Some(inner) = weak.upgrade() {
                inner.on_alarm().await;
            }
        });
        trace!(delay_ms = delay.as_millis() as u64, "timer armed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn test_arm_fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = OneShotTimer::new();

        let fired_in_alarm = Arc::clone(&fired);
        timer.arm(Duration::from_secs(5), move || async move {
            fired_in_alarm.fetch_add(1, Ordering::SeqCst);
        });
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_pending_alarm() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = OneShotTimer::new();

        let first = Arc::clone(&fired);
        timer.arm(Duration::from_secs(1), move || async move {
            first.fetch_add(10, Ordering::SeqCst);
        });
        let second = Arc::clone(&fired);
        timer.arm(Duration::from_secs(2), move || async move {
            second.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        // Only the second arm fires; the first was fully disarmed.
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_cancels_pending_alarm() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = OneShotTimer::new();

        let fired_in_alarm = Arc::clone(&fired);
        timer.arm(Duration::from_secs(1), move || async move {
            fired_in_alarm.fetch_add(1, Ordering::SeqCst);
        });
        timer.disarm();
        assert!(!timer.is_armed());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
