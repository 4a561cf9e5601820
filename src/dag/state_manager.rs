// src/dag/state_manager.rs

//! State transitions that cascade through the graph.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dag::WorkflowGraph;
use crate::dag::task_info::{StateChange, TaskState};
use crate::types::TaskName;

/// Applies readiness and blocking cascades to a task state map.
pub struct StateManager<'a> {
    graph: &'a WorkflowGraph,
    states: &'a mut HashMap<TaskName, TaskState>,
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a WorkflowGraph, states: &'a mut HashMap<TaskName, TaskState>) -> Self {
        Self { graph, states }
    }

    /// Promote every `Pending` dependent of `done_task` whose predecessors
    /// are now all `Done` to `Ready`.
    pub fn promote_ready_dependents(&mut self, done_task: &str) -> Vec<StateChange> {
        let candidates: Vec<TaskName> = self
            .graph
            .dependents_of(done_task)
            .iter()
            .filter(|name| self.states.get(name.as_str()) == Some(&TaskState::Pending))
            .filter(|name| ReadOnlyStateManager::new(self.graph, &*self.states).deps_done(name))
            .cloned()
            .collect();

        let mut changes = Vec::with_capacity(candidates.len());
        for name in candidates {
            debug!(task = %name, "all predecessors done; marking Ready");
            self.states.insert(name.clone(), TaskState::Ready);
            changes.push(StateChange {
                task: name,
                from: TaskState::Pending,
                to: TaskState::Ready,
            });
        }
        changes
    }

    /// Mark all transitive dependents of a failed task as `Blocked`.
    ///
    /// Only `Pending` and `Ready` tasks change; the failed task itself is
    /// left to the caller.
    pub fn block_dependents(&mut self, failed_task: &str) -> Vec<StateChange> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task).to_vec();
        let mut changes = Vec::new();

        while let Some(name) = stack.pop() {
            match self.states.get(&name).copied() {
                Some(from @ (TaskState::Pending | TaskState::Ready)) => {
                    debug!(
                        task = %name,
                        upstream = %failed_task,
                        "marking Blocked due to upstream failure"
                    );
                    self.states.insert(name.clone(), TaskState::Blocked);
                    stack.extend(self.graph.dependents_of(&name).iter().cloned());
                    changes.push(StateChange {
                        task: name,
                        from,
                        to: TaskState::Blocked,
                    });
                }
                Some(_) => {
                    // Already terminal; its own dependents were handled then.
                }
                None => {
                    warn!(task = %name, "node in graph not present in state map");
                }
            }
        }

        changes
    }
}

/// A read-only view over the state map for readiness and completion checks.
pub struct ReadOnlyStateManager<'a> {
    graph: &'a WorkflowGraph,
    states: &'a HashMap<TaskName, TaskState>,
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(graph: &'a WorkflowGraph, states: &'a HashMap<TaskName, TaskState>) -> Self {
        Self { graph, states }
    }

    /// Whether every predecessor of `task` is `Done`.
    pub fn deps_done(&self, task: &str) -> bool {
        self.graph
            .dependencies_of(task)
            .iter()
            .all(|dep| self.states.get(dep) == Some(&TaskState::Done))
    }

    pub fn all_terminal(&self) -> bool {
        self.states.values().all(|s| s.is_terminal())
    }
}
