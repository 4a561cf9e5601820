// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Workflow description as read from a TOML file, before validation.
///
/// ```toml
/// [workflow]
/// name = "multisite-example"
/// sites = ["local", "accelerator", "cluster"]
///
/// [transformation.pretrain]
/// pfn = "bin/run_pretrain.sh"
///
/// [artifact."pre_training_input.txt"]
/// location = "input/pre_training_input.txt"
/// site = "local"
///
/// [task.pretrain]
/// inputs = ["pre_training_input.txt"]
/// outputs = [{ name = "pre_training_output.txt", stage_out = true }]
/// site = "accelerator"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkflowFile {
    pub workflow: WorkflowSection,

    /// Executables from `[transformation.<name>]`.
    #[serde(default)]
    pub transformation: BTreeMap<String, TransformationConfig>,

    /// Pre-registered artifacts from `[artifact.<lfn>]`.
    #[serde(default)]
    pub artifact: BTreeMap<String, ArtifactConfig>,

    /// All tasks from `[task.<name>]`.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// A workflow file that passed file-level validation.
///
/// Graph-level checks (producers, cycles, site constraints) happen when the
/// graph is frozen.
#[derive(Debug, Clone)]
pub struct WorkflowFile {
    pub workflow: WorkflowSection,
    pub transformation: BTreeMap<String, TransformationConfig>,
    pub artifact: BTreeMap<String, ArtifactConfig>,
    pub task: BTreeMap<String, TaskConfig>,
}

impl WorkflowFile {
    pub(crate) fn new_unchecked(raw: RawWorkflowFile) -> Self {
        Self {
            workflow: raw.workflow,
            transformation: raw.transformation,
            artifact: raw.artifact,
            task: raw.task,
        }
    }
}

/// `[workflow]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowSection {
    pub name: String,

    /// Execution sites tasks may be pinned to.
    pub sites: Vec<String>,

    /// Site that receives staged-out outputs.
    #[serde(default)]
    pub output_site: Option<String>,

    /// Maximum number of tasks running at once when driving the workflow.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

fn default_max_parallel() -> usize {
    4
}

/// `[transformation.<name>]` section.
///
/// ```toml
/// [transformation.pretrain]
/// pfn = "bin/run_pretrain.sh"
/// site = "local"
/// container = "cerebras"
/// cores = 1
/// runtime = 3600
/// launcher = "srun"
/// launcher_args = ["--kill-on-bad-exit"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransformationConfig {
    /// Physical file name of the executable.
    pub pfn: String,

    /// Container image the executable runs in.
    #[serde(default)]
    pub container: Option<String>,

    /// Site hosting `pfn`.
    #[serde(default)]
    pub site: Option<String>,

    /// Cores requested per invocation.
    #[serde(default)]
    pub cores: Option<u32>,

    /// Wall-clock limit in seconds.
    #[serde(default)]
    pub runtime: Option<u64>,

    /// Command the executable is wrapped in, e.g. `srun`.
    #[serde(default)]
    pub launcher: Option<String>,

    #[serde(default)]
    pub launcher_args: Vec<String>,
}

impl TransformationConfig {
    pub fn new(pfn: impl Into<String>) -> Self {
        Self {
            pfn: pfn.into(),
            ..Self::default()
        }
    }
}

/// `[artifact.<lfn>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactConfig {
    /// Physical location (path or URI). Inputs without one must be produced
    /// by some task.
    #[serde(default)]
    pub location: Option<String>,

    /// Site hosting `location`.
    #[serde(default)]
    pub site: Option<String>,

    #[serde(default)]
    pub stage_out: bool,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Transformation to run; defaults to the task name.
    #[serde(default)]
    pub transformation: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub node_label: Option<String>,

    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub outputs: Vec<OutputConfig>,

    /// Execution-site constraint.
    #[serde(default)]
    pub site: Option<String>,

    /// Extra predecessors not implied by artifact flow.
    #[serde(default)]
    pub after: Vec<String>,
}

impl TaskConfig {
    /// Effective transformation name for the task called `task_name`.
    pub fn effective_transformation<'a>(&'a self, task_name: &'a str) -> &'a str {
        self.transformation.as_deref().unwrap_or(task_name)
    }
}

/// A task output: either a bare artifact name or `{ name, stage_out }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OutputConfig {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        stage_out: bool,
    },
}

impl OutputConfig {
    pub fn name(&self) -> &str {
        match self {
            OutputConfig::Name(name) | OutputConfig::Detailed { name, .. } => name,
        }
    }

    pub fn stage_out(&self) -> bool {
        match self {
            OutputConfig::Name(_) => false,
            OutputConfig::Detailed { stage_out, .. } => *stage_out,
        }
    }
}
