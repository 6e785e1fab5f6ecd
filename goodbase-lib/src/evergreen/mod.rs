//! The CI backend port and its Evergreen implementation
//!
//! [`CiBackend`] is everything the search needs from a CI system: the newest-first stream of
//! revisions with their builds, the task results of a build, the module revisions a commit ran
//! with, and where the project's configuration file lives. [`Client`] implements it on top of the
//! Evergreen REST API.

mod client;
mod config;
mod models;
mod project_config;

pub use client::{ApiResult, Client};
pub use config::{DEFAULT_EVERGREEN_CONFIG, EvergreenConfig, expand_home};
pub use models::{BuildVariantStatus, Manifest, ManifestModule, Project, Task, Version};
pub use project_config::module_locations;

use crate::Result;
use camino::Utf8PathBuf;
use core::future::Future;
use futures::stream::BoxStream;
use std::collections::BTreeMap;

/// A revision of a project together with the builds that ran on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionDescriptor {
    pub revision: String,

    /// Build variant name to build id
    pub builds: BTreeMap<String, String>,
}

impl RevisionDescriptor {
    #[must_use]
    pub fn new(revision: impl Into<String>, builds: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            revision: revision.into(),
            builds: builds.into_iter().collect(),
        }
    }
}

/// The outcome of one task of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub name: String,
    pub succeeded: bool,
    pub dispatched: bool,
}

impl TaskResult {
    #[must_use]
    pub fn new(name: impl Into<String>, succeeded: bool, dispatched: bool) -> Self {
        Self {
            name: name.into(),
            succeeded,
            dispatched,
        }
    }
}

/// Read access to a CI system.
pub trait CiBackend: Send + Sync {
    /// Revisions of the project, newest first. Pages are fetched as the stream is consumed.
    fn revisions<'a>(&'a self, project: &'a str) -> BoxStream<'a, Result<RevisionDescriptor>>;

    /// Task results of a build.
    fn build_tasks(&self, build_id: &str) -> impl Future<Output = Result<Vec<TaskResult>>> + Send;

    /// Module name to module revision for a commit. Projects without modules yield an empty map.
    fn module_revisions(&self, project: &str, revision: &str) -> impl Future<Output = Result<BTreeMap<String, String>>> + Send;

    /// Path of the project's CI configuration file, relative to the repository root.
    fn project_config_path(&self, project: &str) -> impl Future<Output = Result<Utf8PathBuf>> + Send;
}
