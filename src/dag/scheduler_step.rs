// src/dag/scheduler_step.rs

//! Result type for a single scheduler transition.

use crate::dag::task_info::{StateChange, TaskState};

/// Structured result of one accepted `mark_*` call.
///
/// The first change is always the transition that was requested; any
/// cascaded readiness or blocking follows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerStep {
    pub changes: Vec<StateChange>,
}

impl SchedulerStep {
    /// Tasks that became `Ready` as a result of this step.
    pub fn newly_ready(&self) -> impl Iterator<Item = &str> {
        self.entering(TaskState::Ready)
    }

    /// Tasks that became `Blocked` as a result of this step.
    pub fn newly_blocked(&self) -> impl Iterator<Item = &str> {
        self.entering(TaskState::Blocked)
    }

    fn entering(&self, state: TaskState) -> impl Iterator<Item = &str> {
        self.changes
            .iter()
            .filter(move |c| c.to == state)
            .map(|c| c.task.as_str())
    }
}
