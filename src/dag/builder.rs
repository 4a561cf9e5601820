// src/dag/builder.rs

//! Incremental task graph construction and `freeze()` validation.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info};

use crate::catalog::{Artifact, ArtifactRegistry, SiteResolver};
use crate::dag::graph::WorkflowGraph;
use crate::dag::task_info::TaskSpec;
use crate::errors::{Result, WorkflowError};
use crate::types::{ArtifactName, SiteName, TaskName};

/// Explicit configuration handed to the builder at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphConfig {
    /// Workflow name, carried into the frozen graph for diagnostics.
    pub name: String,
    pub sites: SiteResolver,
    /// Site that receives staged-out outputs.
    pub output_site: Option<SiteName>,
}

impl GraphConfig {
    pub fn new<I, S>(name: impl Into<String>, sites: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            name: name.into(),
            sites: SiteResolver::new(sites)?,
            output_site: None,
        })
    }

    /// Route staged-out outputs to `site`, which must be configured.
    pub fn with_output_site(mut self, site: impl Into<SiteName>) -> Result<Self> {
        let site = site.into();
        if !self.sites.contains(&site) {
            return Err(WorkflowError::ConfigError(format!(
                "output site `{site}` is not a configured site"
            )));
        }
        self.output_site = Some(site);
        Ok(self)
    }
}

/// Accumulates artifacts and tasks, then validates them into a
/// [`WorkflowGraph`].
///
/// Tasks and artifacts may be registered in any order; references are only
/// checked by [`GraphBuilder::freeze`]. Once a freeze succeeds no further
/// registrations are accepted.
#[derive(Debug, Clone)]
pub struct GraphBuilder {
    config: GraphConfig,
    artifacts: ArtifactRegistry,
    tasks: BTreeMap<TaskName, TaskSpec>,
    /// Output artifact → producing task.
    producers: HashMap<ArtifactName, TaskName>,
    frozen: bool,
}

impl GraphBuilder {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            artifacts: ArtifactRegistry::new(),
            tasks: BTreeMap::new(),
            producers: HashMap::new(),
            frozen: false,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn artifacts(&self) -> &ArtifactRegistry {
        &self.artifacts
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Pre-register an artifact, typically an external input with a known
    /// physical location.
    pub fn register_artifact(&mut self, artifact: Artifact) -> Result<()> {
        self.ensure_not_frozen()?;
        self.artifacts.register(artifact)
    }

    /// Register a task.
    ///
    /// Rejects duplicate task names and outputs that already have a producer.
    /// A rejected call leaves the builder unchanged.
    pub fn add_task(&mut self, spec: TaskSpec) -> Result<()> {
        self.ensure_not_frozen()?;

        if self.tasks.contains_key(&spec.name) {
            return Err(WorkflowError::DuplicateTask(spec.name));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for out in &spec.outputs {
            if let Some(existing) = self.producers.get(&out.artifact) {
                return Err(WorkflowError::DuplicateProducer {
                    artifact: out.artifact.clone(),
                    existing: existing.clone(),
                    attempted: spec.name.clone(),
                });
            }
            if !seen.insert(out.artifact.as_str()) {
                return Err(WorkflowError::DuplicateProducer {
                    artifact: out.artifact.clone(),
                    existing: spec.name.clone(),
                    attempted: spec.name.clone(),
                });
            }
        }

        for out in &spec.outputs {
            self.producers
                .insert(out.artifact.clone(), spec.name.clone());
            self.artifacts.declare_output(&out.artifact, out.stage_out);
        }

        debug!(
            task = %spec.name,
            inputs = spec.inputs.len(),
            outputs = spec.outputs.len(),
            site = ?spec.site,
            "registered task"
        );
        self.tasks.insert(spec.name.clone(), spec);
        Ok(())
    }

    /// Validate the graph and fix it as immutable.
    ///
    /// Checks, in order: every input resolves to a producer or a registered
    /// location, explicit predecessors exist, the dependency relation is
    /// acyclic, and site constraints name configured sites. On error the
    /// builder stays unfrozen. Calling `freeze` again on an unchanged builder
    /// yields an identical graph.
    pub fn freeze(&mut self) -> Result<WorkflowGraph> {
        let deps = self.resolve_predecessors()?;
        let order = self.topological_order(&deps)?;
        self.validate_sites()?;

        if !self.frozen {
            info!(
                workflow = %self.config.name,
                tasks = self.tasks.len(),
                artifacts = self.artifacts.len(),
                "task graph frozen"
            );
        }
        self.frozen = true;

        Ok(WorkflowGraph::new(
            self.config.clone(),
            self.artifacts.clone(),
            self.tasks.clone(),
            deps,
            order,
            self.producers.clone(),
        ))
    }

    fn ensure_not_frozen(&self) -> Result<()> {
        if self.frozen {
            return Err(WorkflowError::GraphFrozen);
        }
        Ok(())
    }

    /// Predecessor set per task: producers of its inputs plus its explicit
    /// predecessors, each sorted by name.
    fn resolve_predecessors(&self) -> Result<BTreeMap<TaskName, Vec<TaskName>>> {
        let mut deps = BTreeMap::new();

        for (name, spec) in &self.tasks {
            let mut preds: BTreeSet<TaskName> = BTreeSet::new();

            for input in &spec.inputs {
                if let Some(producer) = self.producers.get(input) {
                    preds.insert(producer.clone());
                    continue;
                }
                let has_source = self
                    .artifacts
                    .get(input)
                    .is_some_and(|a| a.location.is_some());
                if !has_source {
                    return Err(WorkflowError::UnresolvedInput {
                        task: name.clone(),
                        artifact: input.clone(),
                    });
                }
            }

            for pred in &spec.after {
                if !self.tasks.contains_key(pred) {
                    return Err(WorkflowError::UnknownPredecessor {
                        task: name.clone(),
                        predecessor: pred.clone(),
                    });
                }
                preds.insert(pred.clone());
            }

            deps.insert(name.clone(), preds.into_iter().collect());
        }

        Ok(deps)
    }

    fn topological_order(
        &self,
        deps: &BTreeMap<TaskName, Vec<TaskName>>,
    ) -> Result<Vec<TaskName>> {
        // Edge direction: predecessor -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in self.tasks.keys() {
            graph.add_node(name.as_str());
        }
        for (name, preds) in deps {
            for pred in preds {
                graph.add_edge(pred.as_str(), name.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
            Err(cycle) => {
                let path = cycle_through(&graph, cycle.node_id());
                debug!(?path, "dependency cycle found");
                Err(WorkflowError::Cycle(path))
            }
        }
    }

    fn validate_sites(&self) -> Result<()> {
        for (name, spec) in &self.tasks {
            self.config.sites.validate(name, spec.site.as_deref())?;
        }
        Ok(())
    }
}

/// Shortest cycle passing through `start`, as the list of nodes visited
/// before returning to `start`.
fn cycle_through<'a>(graph: &DiGraphMap<&'a str, ()>, start: &'a str) -> Vec<TaskName> {
    let mut parent: HashMap<&'a str, &'a str> = HashMap::new();
    let mut queue: VecDeque<&'a str> = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for next in graph.neighbors_directed(node, Direction::Outgoing) {
            if next == start {
                let mut path = vec![node.to_string()];
                let mut cur = node;
                while let Some(&p) = parent.get(cur) {
                    path.push(p.to_string());
                    cur = p;
                }
                path.reverse();
                return path;
            }
            if !parent.contains_key(next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }

    vec![start.to_string()]
}
