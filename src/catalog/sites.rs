// src/catalog/sites.rs

//! Site affinity resolution.

use std::collections::BTreeSet;

use crate::errors::{Result, WorkflowError};
use crate::types::SiteName;

/// The configured set of execution sites a task may be pinned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteResolver {
    sites: BTreeSet<SiteName>,
}

impl SiteResolver {
    /// Build a resolver from a non-empty set of site identifiers.
    pub fn new<I, S>(sites: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<SiteName>,
    {
        let sites: BTreeSet<SiteName> = sites.into_iter().map(Into::into).collect();
        if sites.is_empty() {
            return Err(WorkflowError::ConfigError(
                "at least one execution site must be configured".to_string(),
            ));
        }
        Ok(Self { sites })
    }

    /// Return `site` unchanged if it is unconstrained or a configured site.
    ///
    /// `task` is only used to name the offender in the error.
    pub fn validate<'s>(&self, task: &str, site: Option<&'s str>) -> Result<Option<&'s str>> {
        match site {
            None => Ok(None),
            Some(s) if self.sites.contains(s) => Ok(Some(s)),
            Some(s) => Err(WorkflowError::InvalidSite {
                task: task.to_string(),
                site: s.to_string(),
            }),
        }
    }

    pub fn contains(&self, site: &str) -> bool {
        self.sites.contains(site)
    }

    /// Configured sites in sorted order.
    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.sites.iter().map(|s| s.as_str())
    }
}
