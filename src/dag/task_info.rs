// src/dag/task_info.rs

//! Task declarations, per-task scheduling state and the dispatch hand-off.

use std::time::Duration;

use crate::types::{ArtifactName, SiteName, TaskName};

/// Opaque per-task metadata carried through the graph untouched.
///
/// The builder and scheduler never look inside; executors do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPayload {
    /// Logical transformation (executable) name.
    pub transformation: Option<String>,
    /// Resolved physical executable for the transformation, if known.
    pub executable: Option<String>,
    /// Site hosting `executable`.
    pub executable_site: Option<SiteName>,
    /// Container image the executable runs in.
    pub container: Option<String>,
    pub args: Vec<String>,
    /// Human-facing label for the job node.
    pub node_label: Option<String>,
    pub profile: ResourceProfile,
}

/// Per-transformation resource requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceProfile {
    pub cores: Option<u32>,
    /// Wall-clock limit; executors fail the task once it is exceeded.
    pub runtime: Option<Duration>,
    /// Wrapper command the executable is started under, e.g. `srun`.
    pub launcher: Option<String>,
    pub launcher_args: Vec<String>,
}

impl ResourceProfile {
    pub fn is_empty(&self) -> bool {
        self == &ResourceProfile::default()
    }
}

/// One declared output of a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub artifact: ArtifactName,
    pub stage_out: bool,
}

/// A task as registered with the [`GraphBuilder`](crate::dag::GraphBuilder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: TaskName,
    /// Consumed artifacts, in declaration order.
    pub inputs: Vec<ArtifactName>,
    pub outputs: Vec<OutputSpec>,
    /// Execution-site constraint; `None` means unconstrained.
    pub site: Option<SiteName>,
    /// Extra predecessors not implied by artifact flow.
    pub after: Vec<TaskName>,
    pub payload: TaskPayload,
}

impl TaskSpec {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            site: None,
            after: Vec::new(),
            payload: TaskPayload::default(),
        }
    }

    pub fn input(mut self, artifact: impl Into<ArtifactName>) -> Self {
        self.inputs.push(artifact.into());
        self
    }

    pub fn output(mut self, artifact: impl Into<ArtifactName>) -> Self {
        self.outputs.push(OutputSpec {
            artifact: artifact.into(),
            stage_out: false,
        });
        self
    }

    /// Declare an output that must be persisted after it is produced.
    pub fn staged_output(mut self, artifact: impl Into<ArtifactName>) -> Self {
        self.outputs.push(OutputSpec {
            artifact: artifact.into(),
            stage_out: true,
        });
        self
    }

    pub fn site(mut self, site: impl Into<SiteName>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn after(mut self, task: impl Into<TaskName>) -> Self {
        self.after.push(task.into());
        self
    }

    pub fn payload(mut self, payload: TaskPayload) -> Self {
        self.payload = payload;
        self
    }
}

/// Scheduling state of a task in a frozen graph.
///
/// `Pending → Ready → Running → {Done | Failed}`, and `Pending/Ready →
/// Blocked` when an ancestor fails. `Done`, `Failed` and `Blocked` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Waiting on at least one predecessor.
    Pending,
    Ready,
    Running,
    Done,
    Failed,
    /// Will never run because an ancestor failed.
    Blocked,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Done | TaskState::Failed | TaskState::Blocked)
    }
}

/// A single state transition, reported to listeners and in [`SchedulerStep`](crate::dag::SchedulerStep)s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub task: TaskName,
    pub from: TaskState,
    pub to: TaskState,
}

/// Where a task's input comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInput {
    pub artifact: ArtifactName,
    /// Registered physical location, if any.
    pub location: Option<String>,
    /// Site hosting `location`, if known.
    pub site: Option<SiteName>,
    /// Task producing the artifact, or `None` for pre-registered sources.
    pub producer: Option<TaskName>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutput {
    pub artifact: ArtifactName,
    pub stage_out: bool,
    /// Site a staged-out output is delivered to; `None` when not staged out
    /// or no output site is configured.
    pub destination: Option<SiteName>,
}

/// Everything an executor needs to run a ready task and report back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub task: TaskName,
    pub payload: TaskPayload,
    pub site: Option<SiteName>,
    pub inputs: Vec<ResolvedInput>,
    pub outputs: Vec<ResolvedOutput>,
}
