// src/engine/mod.rs

//! Orchestration engine for hpcflow.
//!
//! The [`runtime`] event loop drives a [`SharedScheduler`](crate::dag::SharedScheduler):
//! - dispatches ready tasks to an executor backend
//! - feeds completion events back into the scheduler
//! - fails whatever is still running when shutdown is requested

use std::fmt;

use crate::dag::StateCounts;
use crate::types::{TaskName, TaskOutcome};

/// Runtime options for the event loop.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Maximum number of tasks in the `Running` state at once.
    pub max_parallel: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self { max_parallel: 4 }
    }
}

/// Events flowing into the runtime from executors and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A dispatched task finished with a concrete outcome.
    TaskCompleted {
        task: TaskName,
        outcome: TaskOutcome,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Final tally of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub counts: StateCounts,
    /// Whether the run stopped because of a shutdown request.
    pub interrupted: bool,
}

impl RunSummary {
    /// `true` when every task finished successfully.
    pub fn succeeded(&self) -> bool {
        !self.interrupted && self.counts.done == self.counts.total()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.counts;
        write!(
            f,
            "{} tasks: {} done, {} failed, {} blocked",
            c.total(),
            c.done,
            c.failed,
            c.blocked
        )?;
        let unfinished = c.pending + c.ready + c.running;
        if unfinished > 0 {
            write!(f, ", {unfinished} unfinished")?;
        }
        if self.interrupted {
            write!(f, " (interrupted)")?;
        }
        Ok(())
    }
}

pub mod runtime;

pub use runtime::Runtime;
