//! Ordered job registry.
//!
//! The registry is the scheduler's single source of truth for what is
//! scheduled and when. Entries are kept ascending by due time with stable
//! insertion order on ties, so the earliest-due job is always at the head
//! and `peek_earliest` is O(1).
//!
//! The due time is stamped into the entry at insert; later writes to the
//! job's own state cannot perturb the ordering.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::core::job::Job;
use crate::core::types::JobId;

/// Errors from registry mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum RegistryError {
    /// A job with this id is already present. Callers remove before
    /// re-inserting.
    #[error("job {0} is already scheduled")]
    Duplicate(JobId),
}

/// One scheduled occurrence of a job.
#[derive(Clone)]
pub(crate) struct RegistryEntry {
    /// Due time this entry is ordered by.
    pub(crate) at: DateTime<Utc>,
    pub(crate) job: Arc<Job>,
}

/// Ordered collection of scheduled jobs, ascending by due time.
#[derive(Default)]
pub(crate) struct JobRegistry {
    entries: Vec<RegistryEntry>,
}

impl JobRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sorted insert. Ties keep insertion order, so an entry inserted for
    /// the same instant as the current head lands behind it.
    pub(crate) fn insert(
        &mut self,
        at: DateTime<Utc>,
        job: Arc<Job>,
    ) -> Result<(), RegistryError> {
        if self.contains(job.id()) {
            return Err(RegistryError::Duplicate(job.id()));
        }
        let position = self
            .entries
            .iter()
            .position(|entry| entry.at > at)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, RegistryEntry { at, job });
        Ok(())
    }

    /// Remove the entry for `id`. Returns whether one was present.
    pub(crate) fn remove(&mut self, id: JobId) -> bool {
        match self.entries.iter().position(|entry| entry.job.id() == id) {
            Some(position) => {
                self.entries.remove(position);
                true
            }
            None => false,
        }
    }

    /// The earliest-due entry, without removing it.
    pub(crate) fn peek_earliest(&self) -> Option<&RegistryEntry> {
        self.entries.first()
    }

    /// Remove and return the earliest-due entry.
    pub(crate) fn pop_earliest(&mut self) -> Option<RegistryEntry> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    pub(crate) fn contains(&self, id: JobId) -> bool {
        self.entries.iter().any(|entry| entry.job.id() == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
