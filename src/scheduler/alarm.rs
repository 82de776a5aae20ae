//! Alarm handling: the drain path that runs when the wakeup timer fires.
//!
//! The fire path is two-phase. Under the registry lock, every due job is
//! unlinked, debounced against its last triggered slot, and handed to the
//! dispatch channel with a non-blocking send. With the lock released, next
//! occurrences are recomputed and the jobs reinserted. The timer is rearmed
//! exactly once per firing, regardless of how many jobs were due.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

use super::engine::Inner;
use super::worker::Dispatch;
use crate::core::job::Job;
use crate::events::Event;

impl Inner {
    /// Timer fire entry point.
    pub(crate) async fn on_alarm(self: &Arc<Self>) {
        self.run_alarm_cycle(Utc::now()).await;
    }

    /// Drain all jobs due at `now`, dispatch them, reschedule them, and
    /// rearm the timer.
    ///
    /// At most `drain_limit` jobs are processed per cycle; anything still
    /// overdue is picked up on the immediately following wakeup, which the
    /// minimum delay floor keeps near-term. No lock is held across an await
    /// and no expression is recomputed while the registry is mid-drain.
    pub(crate) async fn run_alarm_cycle(self: &Arc<Self>, now: DateTime<Utc>) {
        let slot = self.config.slot_of(now.timestamp());
        let mut drained: Vec<Arc<Job>> = Vec::new();
        let mut deferred_events: Vec<Event> = Vec::new();

        {
            let tx = self
                .dispatch_tx
                .lock()
                .expect("dispatch channel lock poisoned")
                .clone();
            let mut registry = self.registry.lock().expect("registry lock poisoned");

            while drained.len() < self.config.drain_limit {
                let due = matches!(registry.peek_earliest(), Some(entry) if entry.at <= now);
                if !due {
                    break;
                }
                let entry = registry
                    .pop_earliest()
                    .expect("peeked registry entry must pop");
                let job = entry.job;

                if job.already_fired_in_slot(slot) {
                    // Same slot as an earlier firing: reschedule without a
                    // second dispatch.
                    debug!(job_id = %job.id(), slot, "job already fired this slot, skipping dispatch");
                } else {
                    job.mark_fired(slot);
                    match &tx {
                        Some(tx) => {
                            if tx
                                .try_send(Dispatch {
                                    job: Arc::clone(&job),
                                    fired_at: now,
                                })
                                .is_err()
                            {
                                debug!(job_id = %job.id(), "dispatch channel full, execution skipped this cycle");
                                deferred_events.push(Event::dispatch_dropped(job.id()));
                            }
                        }
                        None => {
                            debug!(job_id = %job.id(), "no dispatch channel, execution skipped");
                        }
                    }
                }
                drained.push(job);
            }
        }

        // Recompute next occurrences with the registry lock released.
        let mut reinserts = Vec::with_capacity(drained.len());
        for job in drained {
            match job.compute_next_occurrence(now) {
                Some(next) => {
                    job.set_next_execution(next);
                    reinserts.push((next, job));
                }
                None => {
                    warn!(
                        job_id = %job.id(),
                        name = job.name(),
                        "no upcoming occurrence, job left unscheduled"
                    );
                    job.clear_next_execution();
                }
            }
        }

        {
            let mut registry = self.registry.lock().expect("registry lock poisoned");
            for (next, job) in reinserts {
                if let Err(error) = registry.insert(next, job) {
                    warn!(error = %error, "failed to reinsert drained job");
                }
            }
        }

        self.rearm();

        for event in deferred_events {
            self.events.emit(event).await;
        }
    }
}
