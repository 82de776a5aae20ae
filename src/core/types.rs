//! Core identifier types for the scheduler.
//!
//! These types provide type-safe identifiers for jobs and for individual
//! callback executions (dispatches).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a job.
///
/// Ids are assigned monotonically by the scheduler and are never reused,
/// even across `stop()`/`start()` cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(u64);

/// Unique identifier for a single dispatched execution of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl JobId {
    /// Create a JobId from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl RunId {
    /// Generate a new random RunId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a RunId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_value_roundtrip() {
        let id = JobId::new(42);
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn test_job_id_display() {
        let id = JobId::new(7);
        assert_eq!(format!("{}", id), "7");
    }

    #[test]
    fn test_job_id_ordering() {
        assert!(JobId::new(1) < JobId::new(2));
        assert_eq!(JobId::new(3), JobId::new(3));
    }

    #[test]
    fn test_run_id_is_unique() {
        let run1 = RunId::new();
        let run2 = RunId::new();
        assert_ne!(run1, run2);
    }

    #[test]
    fn test_run_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let run_id = RunId::from_uuid(uuid);
        assert_eq!(run_id.as_uuid(), &uuid);
    }

    #[test]
    fn test_ids_are_hashable() {
        use std::collections::HashSet;

        let mut ids: HashSet<JobId> = HashSet::new();
        ids.insert(JobId::new(1));
        ids.insert(JobId::new(2));
        ids.insert(JobId::new(1));
        assert_eq!(ids.len(), 2);
    }
}
