// src/catalog/mod.rs

//! Leaf catalogs consulted by the graph builder.
//!
//! - [`artifacts`] tracks declared artifacts (logical name → physical
//!   location, stage-out flag).
//! - [`sites`] validates site constraints against the configured set of
//!   execution sites.

pub mod artifacts;
pub mod sites;

pub use artifacts::{Artifact, ArtifactRegistry};
pub use sites::SiteResolver;
