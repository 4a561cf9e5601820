// src/config/mod.rs

//! Workflow file loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a workflow file from disk (`loader.rs`).
//! - Validate file-level invariants like known sites (`validate.rs`).
//! - Feed the file into the graph builder (`assemble.rs`).

pub mod assemble;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ArtifactConfig, OutputConfig, RawWorkflowFile, TaskConfig, TransformationConfig,
    WorkflowFile, WorkflowSection,
};
pub use validate::validate_config;
