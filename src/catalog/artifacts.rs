// src/catalog/artifacts.rs

//! Artifact registry: the replica catalog of a workflow.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::errors::{Result, WorkflowError};
use crate::types::{ArtifactName, SiteName};

/// A named data item consumed or produced by tasks.
///
/// Once registered its location never changes; a later registration can
/// only add what is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: ArtifactName,
    /// Physical location (URI or path). `None` for artifacts that only exist
    /// once a task produces them.
    pub location: Option<String>,
    /// Site hosting `location`, if known.
    pub site: Option<SiteName>,
    /// Whether the artifact must be persisted after being produced.
    pub stage_out: bool,
}

impl Artifact {
    pub fn new(name: impl Into<ArtifactName>) -> Self {
        Self {
            name: name.into(),
            location: None,
            site: None,
            stage_out: false,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_site(mut self, site: impl Into<SiteName>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn with_stage_out(mut self, stage_out: bool) -> Self {
        self.stage_out = stage_out;
        self
    }
}

/// Tracks artifacts by logical name.
///
/// Artifacts only known because a task declared them as an output are
/// *implicit* until [`ArtifactRegistry::register`] names them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactRegistry {
    artifacts: BTreeMap<ArtifactName, Artifact>,
    implicit: BTreeSet<ArtifactName>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact.
    ///
    /// Registering a known name merges into the existing entry: a missing
    /// location or site is filled in and `stage_out` flags are OR-ed. Two
    /// different locations are a [`WorkflowError::DuplicateArtifact`] and
    /// leave the entry untouched.
    pub fn register(&mut self, artifact: Artifact) -> Result<()> {
        let Some(existing) = self.artifacts.get_mut(&artifact.name) else {
            debug!(
                artifact = %artifact.name,
                location = ?artifact.location,
                stage_out = artifact.stage_out,
                "registered artifact"
            );
            self.artifacts.insert(artifact.name.clone(), artifact);
            return Ok(());
        };

        if let (Some(current), Some(attempted)) = (&existing.location, &artifact.location) {
            if current != attempted {
                return Err(WorkflowError::DuplicateArtifact {
                    name: artifact.name,
                    existing: existing.location.clone(),
                    attempted: artifact.location,
                });
            }
        }

        if self.implicit.remove(&artifact.name) {
            debug!(
                artifact = %artifact.name,
                location = ?artifact.location,
                "explicit registration of a declared output"
            );
        } else {
            debug!(artifact = %artifact.name, "artifact already registered; merged");
        }
        if existing.location.is_none() {
            existing.location = artifact.location;
        }
        if existing.site.is_none() {
            existing.site = artifact.site;
        }
        existing.stage_out |= artifact.stage_out;
        Ok(())
    }

    /// Record `name` as the output of some task.
    ///
    /// Creates an implicit, location-less artifact if the name is unknown;
    /// otherwise only merges the stage-out flag. Never fails.
    pub fn declare_output(&mut self, name: &str, stage_out: bool) {
        if let Some(existing) = self.artifacts.get_mut(name) {
            existing.stage_out |= stage_out;
            return;
        }
        debug!(artifact = %name, stage_out, "declared output artifact");
        self.artifacts.insert(
            name.to_string(),
            Artifact::new(name).with_stage_out(stage_out),
        );
        self.implicit.insert(name.to_string());
    }

    /// Whether `name` is only known as a task output.
    pub fn is_implicit(&self, name: &str) -> bool {
        self.implicit.contains(name)
    }

    /// Physical location of a registered artifact (`None` if it has none).
    pub fn resolve(&self, name: &str) -> Result<Option<&str>> {
        self.artifacts
            .get(name)
            .map(|a| a.location.as_deref())
            .ok_or_else(|| WorkflowError::UnknownArtifact(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    /// All artifacts, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
