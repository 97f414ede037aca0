//! Job lifecycle phases
//!
//! A job moves `Created -> Running -> Done`. There is no persisted
//! cancelled phase: a caller cancels by no longer advancing the job.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the lifecycle phase of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Job is stored and no chunk has been processed yet
    Created,

    /// At least one chunk has been processed and URLs remain queued
    Running,

    /// Queue is empty; every URL has a recorded outcome
    Done,
}

impl JobPhase {
    /// Returns true if no further work remains
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if a transition from `self` to `next` is allowed
    ///
    /// Staying in the same phase is allowed for every phase except `Done`,
    /// which only admits itself.
    pub fn can_transition_to(&self, next: JobPhase) -> bool {
        match (self, next) {
            (Self::Created, Self::Created | Self::Running | Self::Done) => true,
            (Self::Running, Self::Running | Self::Done) => true,
            (Self::Done, Self::Done) => true,
            _ => false,
        }
    }

    /// Converts the phase to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Done => "done",
        }
    }

    /// Parses a phase from its database string representation
    ///
    /// Returns None if the string doesn't match any known phase.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            _ => None,
        }
    }

    /// Returns all phases in lifecycle order
    pub fn all_phases() -> Vec<Self> {
        vec![Self::Created, Self::Running, Self::Done]
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
