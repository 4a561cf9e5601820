// src/types.rs

//! Shared name aliases and small value types.

use std::fmt;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Logical artifact name (the "LFN" of a replica).
pub type ArtifactName = String;

/// Identifier of an execution site (e.g. `"accelerator"`, `"cluster"`, `"local"`).
pub type SiteName = String;

/// Outcome of a dispatched task as reported by an executor backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Exit code of the failed process, or `-1` when none is available.
    Failed(i32),
}

impl TaskOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, TaskOutcome::Success)
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Success => write!(f, "success"),
            TaskOutcome::Failed(code) => write!(f, "failed (exit code {code})"),
        }
    }
}
