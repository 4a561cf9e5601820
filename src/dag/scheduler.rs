use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::graph::WorkflowGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{DispatchRequest, StateChange, TaskState};
use crate::errors::{Result, WorkflowError};
use crate::types::TaskName;

/// Per-state task counts, for progress reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub pending: usize,
    pub ready: usize,
    pub running: usize,
    pub done: usize,
    pub failed: usize,
    pub blocked: usize,
}

impl StateCounts {
    pub fn total(&self) -> usize {
        self.pending + self.ready + self.running + self.done + self.failed + self.blocked
    }
}

/// Scheduler view over a frozen [`WorkflowGraph`].
///
/// It is responsible for:
/// - tracking each task's [`TaskState`]
/// - exposing the tasks that are ready to run
/// - promoting dependents once all their predecessors are done
/// - blocking every transitive dependent of a failed task
///
/// Rejected calls leave every task's state untouched.
#[derive(Debug, Clone)]
pub struct SchedulerView {
    graph: Arc<WorkflowGraph>,
    states: HashMap<TaskName, TaskState>,
}

impl SchedulerView {
    /// Tasks without predecessors start `Ready`, all others `Pending`.
    pub fn new(graph: impl Into<Arc<WorkflowGraph>>) -> Self {
        let graph = graph.into();
        let states = graph
            .tasks()
            .map(|name| {
                let state = if graph.dependencies_of(name).is_empty() {
                    TaskState::Ready
                } else {
                    TaskState::Pending
                };
                (name.to_string(), state)
            })
            .collect();

        debug!(workflow = %graph.name(), tasks = graph.len(), "scheduler view created");
        Self { graph, states }
    }

    pub fn graph(&self) -> &Arc<WorkflowGraph> {
        &self.graph
    }

    /// Names of tasks that are currently `Ready`, in topological order.
    ///
    /// Does not change any state; call again to see the current set.
    pub fn poll_ready(&self) -> impl Iterator<Item = &str> + '_ {
        self.graph
            .topological_order()
            .iter()
            .filter(|name| self.states.get(name.as_str()) == Some(&TaskState::Ready))
            .map(|name| name.as_str())
    }

    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.states.get(task).copied()
    }

    /// Tasks currently in `state`, in topological order.
    pub fn tasks_in_state(&self, state: TaskState) -> Vec<TaskName> {
        self.graph
            .topological_order()
            .iter()
            .filter(|name| self.states.get(name.as_str()) == Some(&state))
            .cloned()
            .collect()
    }

    pub fn counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for state in self.states.values() {
            match state {
                TaskState::Pending => counts.pending += 1,
                TaskState::Ready => counts.ready += 1,
                TaskState::Running => counts.running += 1,
                TaskState::Done => counts.done += 1,
                TaskState::Failed => counts.failed += 1,
                TaskState::Blocked => counts.blocked += 1,
            }
        }
        counts
    }

    /// `true` once no task can make further progress: either every task is
    /// `Done`, or every task is `Done`, `Failed` or `Blocked`.
    pub fn is_complete(&self) -> bool {
        ReadOnlyStateManager::new(&self.graph, &self.states).all_terminal()
    }

    /// Executor hand-off for a task.
    pub fn dispatch_request(&self, task: &str) -> Result<DispatchRequest> {
        self.graph.dispatch_request(task)
    }

    /// `Ready → Running`.
    pub fn mark_running(&mut self, task: &str) -> Result<SchedulerStep> {
        let change = self.transition(task, TaskState::Ready, TaskState::Running)?;
        info!(task = %task, "task started");
        Ok(SchedulerStep {
            changes: vec![change],
        })
    }

    /// `Running → Done`, then promote dependents whose predecessors are all
    /// done.
    pub fn mark_done(&mut self, task: &str) -> Result<SchedulerStep> {
        let change = self.transition(task, TaskState::Running, TaskState::Done)?;
        info!(task = %task, "task done");

        let mut manager = StateManager::new(&self.graph, &mut self.states);
        let mut changes = vec![change];
        changes.extend(manager.promote_ready_dependents(task));

        Ok(SchedulerStep { changes })
    }

    /// `Running → Failed`, then block every transitive dependent.
    ///
    /// This is also how a running task is cancelled.
    pub fn mark_failed(&mut self, task: &str) -> Result<SchedulerStep> {
        let change = self.transition(task, TaskState::Running, TaskState::Failed)?;

        let mut manager = StateManager::new(&self.graph, &mut self.states);
        let blocked = manager.block_dependents(task);
        warn!(
            task = %task,
            blocked = blocked.len(),
            "task failed; blocking dependents"
        );

        let mut changes = vec![change];
        changes.extend(blocked);
        Ok(SchedulerStep { changes })
    }

    fn transition(&mut self, task: &str, expected: TaskState, to: TaskState) -> Result<StateChange> {
        let current = self
            .states
            .get_mut(task)
            .ok_or_else(|| WorkflowError::UnknownTask(task.to_string()))?;

        if *current != expected {
            return Err(WorkflowError::InvalidTransition {
                task: task.to_string(),
                from: *current,
                to,
            });
        }

        *current = to;
        Ok(StateChange {
            task: task.to_string(),
            from: expected,
            to,
        })
    }
}
