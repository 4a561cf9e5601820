// src/dag/shared.rs

//! Thread-safe handle around a [`SchedulerView`].
//!
//! Workers running different ready tasks report completions concurrently, so
//! every `mark_*` call takes an exclusive lock while `poll_ready` only needs a
//! shared one.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::dag::WorkflowGraph;
use crate::dag::scheduler::{SchedulerView, StateCounts};
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::task_info::{DispatchRequest, StateChange, TaskState};
use crate::errors::Result;
use crate::types::TaskName;

type Listener = Box<dyn Fn(&StateChange) + Send + Sync>;

struct Inner {
    view: SchedulerView,
    listeners: Vec<Listener>,
}

/// Cloneable, lock-protected scheduler view.
#[derive(Clone)]
pub struct SharedScheduler {
    inner: Arc<RwLock<Inner>>,
}

impl fmt::Debug for SharedScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("SharedScheduler")
            .field("view", &inner.view)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl SharedScheduler {
    pub fn new(view: SchedulerView) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                view,
                listeners: Vec::new(),
            })),
        }
    }

    pub fn from_graph(graph: impl Into<Arc<WorkflowGraph>>) -> Self {
        Self::new(SchedulerView::new(graph))
    }

    /// Register a callback invoked after every accepted transition,
    /// including cascaded ones.
    ///
    /// Listeners run under the write lock and must not call back into the
    /// scheduler.
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&StateChange) + Send + Sync + 'static,
    {
        self.write().listeners.push(Box::new(listener));
    }

    /// Snapshot of the currently ready tasks, in topological order.
    pub fn poll_ready(&self) -> Vec<TaskName> {
        self.read().view.poll_ready().map(str::to_string).collect()
    }

    pub fn state_of(&self, task: &str) -> Option<TaskState> {
        self.read().view.state_of(task)
    }

    pub fn tasks_in_state(&self, state: TaskState) -> Vec<TaskName> {
        self.read().view.tasks_in_state(state)
    }

    pub fn counts(&self) -> StateCounts {
        self.read().view.counts()
    }

    pub fn is_complete(&self) -> bool {
        self.read().view.is_complete()
    }

    pub fn dispatch_request(&self, task: &str) -> Result<DispatchRequest> {
        self.read().view.dispatch_request(task)
    }

    pub fn graph(&self) -> Arc<WorkflowGraph> {
        Arc::clone(self.read().view.graph())
    }

    pub fn mark_running(&self, task: &str) -> Result<SchedulerStep> {
        self.apply(|view| view.mark_running(task))
    }

    pub fn mark_done(&self, task: &str) -> Result<SchedulerStep> {
        self.apply(|view| view.mark_done(task))
    }

    pub fn mark_failed(&self, task: &str) -> Result<SchedulerStep> {
        self.apply(|view| view.mark_failed(task))
    }

    /// Copy of the underlying view at this instant.
    pub fn snapshot(&self) -> SchedulerView {
        self.read().view.clone()
    }

    fn apply<F>(&self, op: F) -> Result<SchedulerStep>
    where
        F: FnOnce(&mut SchedulerView) -> Result<SchedulerStep>,
    {
        let mut inner = self.write();
        let step = op(&mut inner.view)?;
        for change in &step.changes {
            for listener in &inner.listeners {
                listener(change);
            }
        }
        Ok(step)
    }

    // Poisoned locks are recovered, not propagated.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
