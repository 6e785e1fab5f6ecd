use super::LOG_TARGET;
use crate::Result;
use crate::criteria::{BuildCheck, BuildStatus};
use crate::evergreen::{CiBackend, RevisionDescriptor};
use core::future::Future;
use futures_util::future::join_all;
use ohno::{EnrichableExt, IntoAppError};
use tokio::sync::Semaphore;

/// Maximum number of build task lists fetched at the same time.
pub const MAX_CONCURRENT_FETCHES: usize = 16;

/// Decides whether a single revision is good enough.
pub trait RevisionEvaluator: Send + Sync {
    fn evaluate(&self, revision: &RevisionDescriptor) -> impl Future<Output = Result<bool>> + Send;
}

/// Evaluates a revision by checking the task results of its builds against a set of rules.
#[derive(Debug)]
pub struct BuildEvaluator<'a, B> {
    backend: &'a B,
    checks: &'a [BuildCheck],
    semaphore: Semaphore,
}

impl<'a, B: CiBackend> BuildEvaluator<'a, B> {
    #[must_use]
    pub fn new(backend: &'a B, checks: &'a [BuildCheck]) -> Self {
        Self::with_concurrency(backend, checks, MAX_CONCURRENT_FETCHES)
    }

    #[must_use]
    pub fn with_concurrency(backend: &'a B, checks: &'a [BuildCheck], max_concurrent: usize) -> Self {
        Self {
            backend,
            checks,
            semaphore: Semaphore::new(max_concurrent.max(1)),
        }
    }

    /// Builds of the revision that at least one rule applies to, as `(variant, build id)` pairs.
    pub fn applicable_builds<'r>(&self, revision: &'r RevisionDescriptor) -> Vec<(&'r str, &'r str)> {
        revision
            .builds
            .iter()
            .filter(|(variant, _)| self.checks.iter().any(|check| check.applies_to(variant)))
            .map(|(variant, build_id)| (variant.as_str(), build_id.as_str()))
            .collect()
    }

    /// Fetch the task results of every applicable build and summarize each one.
    ///
    /// Fetches run concurrently up to the concurrency ceiling. Any failed fetch fails the whole
    /// call once all fetches have completed.
    pub async fn build_statuses(&self, revision: &RevisionDescriptor) -> Result<Vec<BuildStatus>> {
        let builds = self.applicable_builds(revision);
        log::debug!(
            target: LOG_TARGET,
            "Checking {} of {} builds for '{}'",
            builds.len(),
            revision.builds.len(),
            revision.revision
        );

        let results = join_all(builds.into_iter().map(|(variant, build_id)| self.build_status(variant, build_id))).await;
        results.into_iter().collect()
    }

    async fn build_status(&self, variant: &str, build_id: &str) -> Result<BuildStatus> {
        let _permit = self.semaphore.acquire().await.into_app_err("build fetch limiter closed")?;

        let tasks = self
            .backend
            .build_tasks(build_id)
            .await
            .map_err(|e| e.enrich_with(|| format!("fetching tasks of build '{build_id}' ({variant})")))?;

        Ok(BuildStatus::from_tasks(variant, &tasks))
    }
}

impl<B: CiBackend> RevisionEvaluator for BuildEvaluator<'_, B> {
    /// A revision matches when every applicable build satisfies every rule.
    async fn evaluate(&self, revision: &RevisionDescriptor) -> Result<bool> {
        let statuses = self.build_statuses(revision).await?;

        let failed = statuses
            .iter()
            .find(|status| !self.checks.iter().all(|check| check.evaluate(status)));

        if let Some(status) = failed {
            log::debug!(target: LOG_TARGET, "'{}' rejected by build '{}'", revision.revision, status.build_name());
            return Ok(false);
        }

        Ok(true)
    }
}
