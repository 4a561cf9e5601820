// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap};

use crate::catalog::{ArtifactRegistry, SiteResolver};
use crate::dag::builder::GraphConfig;
use crate::dag::task_info::{DispatchRequest, ResolvedInput, ResolvedOutput, TaskSpec};
use crate::errors::{Result, WorkflowError};
use crate::types::{ArtifactName, TaskName};

/// Internal node structure: the registered task plus its adjacency.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TaskNode {
    spec: TaskSpec,
    /// Full predecessor set (artifact producers and explicit predecessors).
    deps: Vec<TaskName>,
    /// Tasks that list this one among their predecessors.
    dependents: Vec<TaskName>,
}

/// A validated, immutable task graph.
///
/// Only [`GraphBuilder::freeze`](crate::dag::GraphBuilder::freeze) creates
/// one, so every `WorkflowGraph` is acyclic, has resolvable inputs and valid
/// site constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowGraph {
    config: GraphConfig,
    artifacts: ArtifactRegistry,
    nodes: BTreeMap<TaskName, TaskNode>,
    order: Vec<TaskName>,
    producers: HashMap<ArtifactName, TaskName>,
}

impl WorkflowGraph {
    pub(crate) fn new(
        config: GraphConfig,
        artifacts: ArtifactRegistry,
        tasks: BTreeMap<TaskName, TaskSpec>,
        mut deps: BTreeMap<TaskName, Vec<TaskName>>,
        order: Vec<TaskName>,
        producers: HashMap<ArtifactName, TaskName>,
    ) -> Self {
        let mut nodes: BTreeMap<TaskName, TaskNode> = tasks
            .into_iter()
            .map(|(name, spec)| {
                let node = TaskNode {
                    spec,
                    deps: deps.remove(&name).unwrap_or_default(),
                    dependents: Vec::new(),
                };
                (name, node)
            })
            .collect();

        // Second pass: populate dependents based on deps. Iterating in name
        // order keeps each dependents list sorted.
        let edges: Vec<(TaskName, TaskName)> = nodes
            .iter()
            .flat_map(|(name, node)| {
                node.deps
                    .iter()
                    .map(move |dep| (dep.clone(), name.clone()))
            })
            .collect();
        for (dep, dependent) in edges {
            if let Some(dep_node) = nodes.get_mut(&dep) {
                dep_node.dependents.push(dependent);
            }
        }

        Self {
            config,
            artifacts,
            nodes,
            order,
            producers,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn sites(&self) -> &SiteResolver {
        &self.config.sites
    }

    /// Site receiving staged-out outputs, if configured.
    pub fn output_site(&self) -> Option<&str> {
        self.config.output_site.as_deref()
    }

    pub fn artifacts(&self) -> &ArtifactRegistry {
        &self.artifacts
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// All task names, ordered by name.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    pub fn task(&self, name: &str) -> Option<&TaskSpec> {
        self.nodes.get(name).map(|n| &n.spec)
    }

    /// Task names in a topological order: every task appears after all of
    /// its predecessors.
    pub fn topological_order(&self) -> &[TaskName] {
        &self.order
    }

    /// Tasks with an empty predecessor set.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.deps.is_empty())
            .map(|(name, _)| name.as_str())
    }

    /// Immediate predecessors of a task.
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task.
    pub fn dependents_of(&self, name: &str) -> &[TaskName] {
        self.nodes
            .get(name)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }

    /// Task producing `artifact`, or `None` for pre-registered sources.
    pub fn producer_of(&self, artifact: &str) -> Option<&str> {
        self.producers.get(artifact).map(|s| s.as_str())
    }

    /// Build the executor hand-off for a task: payload, site and resolved
    /// inputs/outputs.
    pub fn dispatch_request(&self, name: &str) -> Result<DispatchRequest> {
        let node = self
            .nodes
            .get(name)
            .ok_or_else(|| WorkflowError::UnknownTask(name.to_string()))?;
        let spec = &node.spec;

        let inputs = spec
            .inputs
            .iter()
            .map(|artifact| {
                let registered = self.artifacts.get(artifact);
                ResolvedInput {
                    artifact: artifact.clone(),
                    location: registered.and_then(|a| a.location.clone()),
                    site: registered.and_then(|a| a.site.clone()),
                    producer: self.producers.get(artifact).cloned(),
                }
            })
            .collect();

        let outputs = spec
            .outputs
            .iter()
            .map(|out| {
                let stage_out = out.stage_out
                    || self
                        .artifacts
                        .get(&out.artifact)
                        .is_some_and(|a| a.stage_out);
                ResolvedOutput {
                    artifact: out.artifact.clone(),
                    stage_out,
                    destination: self
                        .config
                        .output_site
                        .clone()
                        .filter(|_| stage_out),
                }
            })
            .collect();

        Ok(DispatchRequest {
            task: spec.name.clone(),
            payload: spec.payload.clone(),
            site: spec.site.clone(),
            inputs,
            outputs,
        })
    }
}
