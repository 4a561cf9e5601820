// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{RawWorkflowFile, WorkflowFile};
use crate::errors::Result;

/// Load a workflow file from a given path and return the raw `RawWorkflowFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawWorkflowFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawWorkflowFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a workflow file from path and run file-level validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` defaults).
/// - Checks sites, transformations and replica sites.
/// - Resolves relative artifact locations and executable paths against the
///   directory containing the file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<WorkflowFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let mut config = WorkflowFile::try_from(raw_config)?;
    resolve_relative_paths(&mut config, &base_dir(path));
    Ok(config)
}

/// Default workflow file path: `Workflow.toml` in the current directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Workflow.toml")
}

/// Directory that relative paths in the file are resolved against.
///
/// A bare filename like "Workflow.toml" (parent = "") resolves against the
/// current working directory.
pub fn base_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Rewrite relative local paths (no URI scheme) to live under `base`.
pub fn resolve_relative_paths(config: &mut WorkflowFile, base: &Path) {
    for (name, artifact) in config.artifact.iter_mut() {
        if let Some(location) = artifact.location.as_mut() {
            if let Some(resolved) = resolve_local(location, base) {
                debug!(artifact = %name, location = %resolved, "resolved artifact location");
                *location = resolved;
            }
        }
    }

    for (name, tr) in config.transformation.iter_mut() {
        if let Some(resolved) = resolve_local(&tr.pfn, base) {
            debug!(transformation = %name, pfn = %resolved, "resolved executable path");
            tr.pfn = resolved;
        }
    }
}

fn resolve_local(location: &str, base: &Path) -> Option<String> {
    if location.contains("://") || Path::new(location).is_absolute() {
        return None;
    }
    Some(base.join(location).to_string_lossy().into_owned())
}
