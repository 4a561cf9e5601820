// src/config/assemble.rs

//! Turn a validated [`WorkflowFile`] into builder calls.

use std::time::Duration;

use tracing::debug;

use crate::catalog::Artifact;
use crate::config::model::{TransformationConfig, WorkflowFile};
use crate::dag::{
    GraphBuilder, GraphConfig, ResourceProfile, TaskPayload, TaskSpec, WorkflowGraph,
};
use crate::errors::Result;

impl WorkflowFile {
    /// Builder configuration: workflow name, configured sites and the
    /// output site.
    pub fn graph_config(&self) -> Result<GraphConfig> {
        let config = GraphConfig::new(
            self.workflow.name.clone(),
            self.workflow.sites.iter().cloned(),
        )?;
        match self.workflow.output_site {
            Some(ref site) => config.with_output_site(site.clone()),
            None => Ok(config),
        }
    }

    /// Register every artifact and task with a fresh, unfrozen builder.
    pub fn to_builder(&self) -> Result<GraphBuilder> {
        let mut builder = GraphBuilder::new(self.graph_config()?);

        for (name, cfg) in self.artifact.iter() {
            let mut artifact = Artifact::new(name.clone()).with_stage_out(cfg.stage_out);
            if let Some(ref location) = cfg.location {
                artifact = artifact.with_location(location.clone());
            }
            if let Some(ref site) = cfg.site {
                artifact = artifact.with_site(site.clone());
            }
            builder.register_artifact(artifact)?;
        }

        for (name, cfg) in self.task.iter() {
            let transformation = cfg.effective_transformation(name);
            let mut payload = TaskPayload {
                transformation: Some(transformation.to_string()),
                args: cfg.args.clone(),
                node_label: cfg.node_label.clone(),
                ..TaskPayload::default()
            };
            if let Some(tr) = self.transformation.get(transformation) {
                payload.executable = Some(tr.pfn.clone());
                payload.executable_site = tr.site.clone();
                payload.container = tr.container.clone();
                payload.profile = profile_of(tr);
            }

            let mut spec = TaskSpec::new(name.clone()).payload(payload);
            for input in &cfg.inputs {
                spec = spec.input(input.clone());
            }
            for output in &cfg.outputs {
                spec = if output.stage_out() {
                    spec.staged_output(output.name())
                } else {
                    spec.output(output.name())
                };
            }
            if let Some(ref site) = cfg.site {
                spec = spec.site(site.clone());
            }
            for pred in &cfg.after {
                spec = spec.after(pred.clone());
            }

            debug!(task = %name, transformation = %transformation, "assembling task");
            builder.add_task(spec)?;
        }

        Ok(builder)
    }

    /// Assemble and freeze the workflow graph.
    pub fn build_graph(&self) -> Result<WorkflowGraph> {
        self.to_builder()?.freeze()
    }
}

fn profile_of(tr: &TransformationConfig) -> ResourceProfile {
    ResourceProfile {
        cores: tr.cores,
        runtime: tr.runtime.map(Duration::from_secs),
        launcher: tr.launcher.clone(),
        launcher_args: tr.launcher_args.clone(),
    }
}
