// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{RawWorkflowFile, WorkflowFile};
use crate::errors::{Result, WorkflowError};

impl TryFrom<RawWorkflowFile> for WorkflowFile {
    type Error = crate::errors::WorkflowError;

    fn try_from(raw: RawWorkflowFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(WorkflowFile::new_unchecked(raw))
    }
}

/// File-level checks that do not need the task graph.
pub fn validate_config(cfg: &RawWorkflowFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_workflow_section(cfg)?;
    validate_replica_sites(cfg)?;
    validate_transformations(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawWorkflowFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(WorkflowError::ConfigError(
            "workflow must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_workflow_section(cfg: &RawWorkflowFile) -> Result<()> {
    let wf = &cfg.workflow;

    if wf.name.trim().is_empty() {
        return Err(WorkflowError::ConfigError(
            "[workflow].name must not be empty".to_string(),
        ));
    }

    if wf.sites.is_empty() {
        return Err(WorkflowError::ConfigError(
            "[workflow].sites must list at least one execution site".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for site in &wf.sites {
        if !seen.insert(site.as_str()) {
            return Err(WorkflowError::ConfigError(format!(
                "[workflow].sites lists '{}' more than once",
                site
            )));
        }
    }

    if let Some(ref output_site) = wf.output_site {
        if !seen.contains(output_site.as_str()) {
            return Err(WorkflowError::ConfigError(format!(
                "[workflow].output_site '{}' is not one of the configured sites",
                output_site
            )));
        }
    }

    if wf.max_parallel == 0 {
        return Err(WorkflowError::ConfigError(
            "[workflow].max_parallel must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_replica_sites(cfg: &RawWorkflowFile) -> Result<()> {
    let is_known = |site: &str| cfg.workflow.sites.iter().any(|s| s == site);

    for (name, artifact) in cfg.artifact.iter() {
        if let Some(ref site) = artifact.site {
            if !is_known(site.as_str()) {
                return Err(WorkflowError::ConfigError(format!(
                    "artifact '{}' refers to unknown site '{}'",
                    name, site
                )));
            }
        }
    }

    for (name, tr) in cfg.transformation.iter() {
        if let Some(ref site) = tr.site {
            if !is_known(site.as_str()) {
                return Err(WorkflowError::ConfigError(format!(
                    "transformation '{}' refers to unknown site '{}'",
                    name, site
                )));
            }
        }
    }

    Ok(())
}

fn validate_transformations(cfg: &RawWorkflowFile) -> Result<()> {
    for (name, tr) in cfg.transformation.iter() {
        if tr.cores == Some(0) {
            return Err(WorkflowError::ConfigError(format!(
                "transformation '{}' requests 0 cores",
                name
            )));
        }
        if tr.runtime == Some(0) {
            return Err(WorkflowError::ConfigError(format!(
                "transformation '{}' has a runtime of 0 seconds",
                name
            )));
        }
        if tr.launcher.is_none() && !tr.launcher_args.is_empty() {
            return Err(WorkflowError::ConfigError(format!(
                "transformation '{}' sets launcher_args without a launcher",
                name
            )));
        }
    }

    for (name, task) in cfg.task.iter() {
        let transformation = task.effective_transformation(name);
        if !cfg.transformation.contains_key(transformation) {
            return Err(WorkflowError::ConfigError(format!(
                "task '{}' uses unknown transformation '{}'",
                name, transformation
            )));
        }
    }
    Ok(())
}
