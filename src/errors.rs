// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Every contract violation in the builder and scheduler view maps to one
//! variant here; nothing is retried internally.

use thiserror::Error;

use crate::dag::TaskState;
use crate::types::{ArtifactName, SiteName, TaskName};

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(
        "artifact '{name}' already registered with location {existing:?} (attempted {attempted:?})"
    )]
    DuplicateArtifact {
        name: ArtifactName,
        existing: Option<String>,
        attempted: Option<String>,
    },

    #[error("unknown artifact '{0}'")]
    UnknownArtifact(ArtifactName),

    #[error("task '{0}' is already defined")]
    DuplicateTask(TaskName),

    #[error("artifact '{artifact}' is produced by both '{existing}' and '{attempted}'")]
    DuplicateProducer {
        artifact: ArtifactName,
        existing: TaskName,
        attempted: TaskName,
    },

    #[error(
        "task '{task}' consumes artifact '{artifact}', which has no producer and no registered location"
    )]
    UnresolvedInput { task: TaskName, artifact: ArtifactName },

    #[error("task '{task}' lists unknown predecessor '{predecessor}'")]
    UnknownPredecessor { task: TaskName, predecessor: TaskName },

    #[error("cycle detected in task graph: {}", format_cycle(.0))]
    Cycle(Vec<TaskName>),

    #[error("task '{task}' is pinned to unknown site '{site}'")]
    InvalidSite { task: TaskName, site: SiteName },

    #[error("graph is frozen; no further tasks or artifacts may be added")]
    GraphFrozen,

    #[error("task '{task}' cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        task: TaskName,
        from: TaskState,
        to: TaskState,
    },

    #[error("unknown task '{0}'")]
    UnknownTask(TaskName),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Render a cycle as `a -> b -> c -> a`.
fn format_cycle(path: &[TaskName]) -> String {
    let mut rendered = path.join(" -> ");
    if let Some(first) = path.first() {
        rendered.push_str(" -> ");
        rendered.push_str(first);
    }
    rendered
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WorkflowError>;
