use std::collections::BTreeMap;

use hpcflow::catalog::Artifact;
use hpcflow::config::{
    ArtifactConfig, OutputConfig, RawWorkflowFile, TaskConfig, TransformationConfig, WorkflowFile,
    WorkflowSection,
};
use hpcflow::dag::{GraphBuilder, GraphConfig, TaskSpec, WorkflowGraph};
use hpcflow::errors::Result;

/// Builder for `WorkflowFile` to simplify test setup.
///
/// Every task gets a transformation of the same name (running `true`)
/// unless one was registered explicitly.
pub struct WorkflowFileBuilder {
    file: RawWorkflowFile,
}

impl WorkflowFileBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            file: RawWorkflowFile {
                workflow: WorkflowSection {
                    name: name.to_string(),
                    sites: vec!["local".to_string()],
                    output_site: None,
                    max_parallel: 4,
                },
                transformation: BTreeMap::new(),
                artifact: BTreeMap::new(),
                task: BTreeMap::new(),
            },
        }
    }

    /// Replace the site list.
    pub fn sites(mut self, sites: &[&str]) -> Self {
        self.file.workflow.sites = sites.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn max_parallel(mut self, n: usize) -> Self {
        self.file.workflow.max_parallel = n;
        self
    }

    pub fn output_site(mut self, site: &str) -> Self {
        self.file.workflow.output_site = Some(site.to_string());
        self
    }

    pub fn with_transformation(self, name: &str, pfn: &str) -> Self {
        self.with_transformation_config(name, TransformationConfig::new(pfn))
    }

    /// Register a transformation with container, site or profile settings.
    pub fn with_transformation_config(mut self, name: &str, cfg: TransformationConfig) -> Self {
        self.file.transformation.insert(name.to_string(), cfg);
        self
    }

    pub fn with_artifact(mut self, name: &str, location: &str, site: Option<&str>) -> Self {
        self.file.artifact.insert(
            name.to_string(),
            ArtifactConfig {
                location: Some(location.to_string()),
                site: site.map(str::to_string),
                stage_out: false,
            },
        );
        self
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        let transformation = task.effective_transformation(name).to_string();
        self.file
            .transformation
            .entry(transformation)
            .or_insert_with(|| TransformationConfig::new("true"));
        self.file.task.insert(name.to_string(), task);
        self
    }

    /// The unvalidated file, for exercising validation errors.
    pub fn build_raw(self) -> RawWorkflowFile {
        self.file
    }

    pub fn build(self) -> WorkflowFile {
        WorkflowFile::try_from(self.file).expect("Failed to build valid workflow from builder")
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new() -> Self {
        Self {
            task: TaskConfig {
                transformation: None,
                args: vec![],
                node_label: None,
                inputs: vec![],
                outputs: vec![],
                site: None,
                after: vec![],
            },
        }
    }

    pub fn transformation(mut self, name: &str) -> Self {
        self.task.transformation = Some(name.to_string());
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.task.args.push(arg.to_string());
        self
    }

    pub fn node_label(mut self, label: &str) -> Self {
        self.task.node_label = Some(label.to_string());
        self
    }

    pub fn input(mut self, artifact: &str) -> Self {
        self.task.inputs.push(artifact.to_string());
        self
    }

    pub fn output(mut self, artifact: &str) -> Self {
        self.task.outputs.push(OutputConfig::Name(artifact.to_string()));
        self
    }

    pub fn staged_output(mut self, artifact: &str) -> Self {
        self.task.outputs.push(OutputConfig::Detailed {
            name: artifact.to_string(),
            stage_out: true,
        });
        self
    }

    pub fn site(mut self, site: &str) -> Self {
        self.task.site = Some(site.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

impl Default for TaskConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fresh builder for a workflow called `name` over `sites`.
pub fn graph_builder(name: &str, sites: &[&str]) -> GraphBuilder {
    let config = GraphConfig::new(name, sites.iter().copied())
        .expect("test graph needs at least one site");
    GraphBuilder::new(config)
}

/// Register `artifacts` (name, location) and `tasks`, then freeze.
pub fn freeze_graph(
    sites: &[&str],
    artifacts: &[(&str, &str)],
    tasks: Vec<TaskSpec>,
) -> Result<WorkflowGraph> {
    let mut builder = graph_builder("test", sites);
    for (name, location) in artifacts {
        builder.register_artifact(Artifact::new(*name).with_location(*location))?;
    }
    for task in tasks {
        builder.add_task(task)?;
    }
    builder.freeze()
}

/// Linear chain `t0 -> t1 -> ... -> t{n-1}` wired through artifacts
/// `f0 .. f{n}`, where `f0` is pre-registered.
pub fn chain_graph(n: usize) -> WorkflowGraph {
    let tasks = (0..n)
        .map(|i| {
            TaskSpec::new(format!("t{i}"))
                .input(format!("f{i}"))
                .output(format!("f{}", i + 1))
        })
        .collect();
    freeze_graph(&["local"], &[("f0", "/data/f0")], tasks).expect("chain graph is valid")
}
