//! Evergreen REST API payloads, limited to the fields we use.

use super::{RevisionDescriptor, TaskResult};
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    pub version_id: String,
    pub revision: String,
    #[serde(default)]
    pub build_variants_status: Option<Vec<BuildVariantStatus>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildVariantStatus {
    pub build_variant: String,
    pub build_id: String,
}

impl From<Version> for RevisionDescriptor {
    fn from(version: Version) -> Self {
        Self::new(
            version.revision,
            version
                .build_variants_status
                .unwrap_or_default()
                .into_iter()
                .map(|status| (status.build_variant, status.build_id)),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub display_name: String,
    pub status: String,
}

impl Task {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    #[must_use]
    pub fn is_undispatched(&self) -> bool {
        self.status == "undispatched"
    }
}

impl From<Task> for TaskResult {
    fn from(task: Task) -> Self {
        let succeeded = task.is_success();
        let dispatched = !task.is_undispatched();
        Self::new(task.display_name, succeeded, dispatched)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub modules: Option<BTreeMap<String, ManifestModule>>,
}

impl Manifest {
    /// Module name to module revision.
    #[must_use]
    pub fn module_revisions(self) -> BTreeMap<String, String> {
        self.modules
            .unwrap_or_default()
            .into_iter()
            .map(|(name, module)| (name, module.revision))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestModule {
    pub revision: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub identifier: String,
    #[serde(default)]
    pub remote_path: String,
}
