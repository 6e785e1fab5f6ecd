//! Version control port and its `git` implementation

mod git;

pub use git::Git;

use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use clap::ValueEnum;
use core::future::Future;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub(crate) const LOG_TARGET: &str = "       git";

/// What to do with a working copy once a revision has been found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Deserialize, Serialize, Display, EnumString)]
#[value(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GitAction {
    /// Check out the revision, optionally on a new branch
    #[default]
    Checkout,

    /// Rebase the current branch onto the revision
    Rebase,

    /// Merge the revision into the current branch
    Merge,

    /// Leave the working copy alone
    None,
}

/// Operations on a local working copy.
pub trait Vcs: Send + Sync {
    /// Fetch from the `origin` remote.
    fn fetch(&self, directory: &Utf8Path) -> impl Future<Output = Result<()>> + Send;

    /// Check out a revision, creating `branch` at it when given.
    fn checkout(&self, revision: &str, directory: &Utf8Path, branch: Option<&str>) -> impl Future<Output = Result<()>> + Send;

    fn rebase(&self, revision: &str, directory: &Utf8Path) -> impl Future<Output = Result<()>> + Send;

    fn merge(&self, revision: &str, directory: &Utf8Path) -> impl Future<Output = Result<()>> + Send;
}

/// Bring the working copy in `directory` to `revision` using `action`.
///
/// The remote is fetched first so that the revision is known locally. [`GitAction::None`] does
/// nothing, not even the fetch.
pub async fn perform_action<V: Vcs>(
    vcs: &V,
    action: GitAction,
    revision: &str,
    directory: &Utf8Path,
    branch: Option<&str>,
) -> Result<()> {
    if action == GitAction::None {
        return Ok(());
    }

    log::debug!(target: LOG_TARGET, "Performing '{action}' to '{revision}' in '{directory}'");
    vcs.fetch(directory).await?;

    match action {
        GitAction::Checkout => vcs.checkout(revision, directory, branch).await,
        GitAction::Rebase => vcs.rebase(revision, directory).await,
        GitAction::Merge => vcs.merge(revision, directory).await,
        GitAction::None => Ok(()),
    }
}

/// Resolve an optional directory against the working directory.
#[must_use]
pub fn resolve_directory(working_dir: &Utf8Path, directory: Option<&Utf8Path>) -> Utf8PathBuf {
    match directory {
        None => working_dir.to_path_buf(),
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => working_dir.join(dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingVcs {
        calls: Mutex<Vec<String>>,
        fail_fetch: bool,
    }

    impl RecordingVcs {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Vcs for RecordingVcs {
        async fn fetch(&self, directory: &Utf8Path) -> Result<()> {
            self.record(format!("fetch {directory}"));
            if self.fail_fetch {
                ohno::bail!("no remote");
            }
            Ok(())
        }

        async fn checkout(&self, revision: &str, directory: &Utf8Path, branch: Option<&str>) -> Result<()> {
            self.record(format!("checkout {revision} {directory} {}", branch.unwrap_or("-")));
            Ok(())
        }

        async fn rebase(&self, revision: &str, directory: &Utf8Path) -> Result<()> {
            self.record(format!("rebase {revision} {directory}"));
            Ok(())
        }

        async fn merge(&self, revision: &str, directory: &Utf8Path) -> Result<()> {
            self.record(format!("merge {revision} {directory}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_none_does_nothing() {
        let vcs = RecordingVcs::default();
        perform_action(&vcs, GitAction::None, "abc", Utf8Path::new("/repo"), None).await.unwrap();

        assert!(vcs.calls().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_fetches_first() {
        let vcs = RecordingVcs::default();
        perform_action(&vcs, GitAction::Checkout, "abc", Utf8Path::new("/repo"), Some("topic"))
            .await
            .unwrap();

        assert_eq!(vcs.calls(), ["fetch /repo", "checkout abc /repo topic"]);
    }

    #[tokio::test]
    async fn test_rebase_and_merge() {
        let vcs = RecordingVcs::default();
        perform_action(&vcs, GitAction::Rebase, "abc", Utf8Path::new("/repo"), Some("ignored"))
            .await
            .unwrap();
        perform_action(&vcs, GitAction::Merge, "def", Utf8Path::new("/repo"), None).await.unwrap();

        assert_eq!(vcs.calls(), ["fetch /repo", "rebase abc /repo", "fetch /repo", "merge def /repo"]);
    }

    #[tokio::test]
    async fn test_failed_fetch_stops_action() {
        let vcs = RecordingVcs {
            fail_fetch: true,
            ..RecordingVcs::default()
        };

        let result = perform_action(&vcs, GitAction::Merge, "abc", Utf8Path::new("/repo"), None).await;

        assert!(result.is_err());
        assert_eq!(vcs.calls(), ["fetch /repo"]);
    }

    #[test]
    fn test_resolve_directory() {
        let cwd = Utf8Path::new("/work/mongo");

        assert_eq!(resolve_directory(cwd, None), "/work/mongo");
        assert_eq!(
            resolve_directory(cwd, Some(Utf8Path::new("src/mongo/db/modules/enterprise"))),
            "/work/mongo/src/mongo/db/modules/enterprise"
        );
        assert_eq!(resolve_directory(cwd, Some(Utf8Path::new("/elsewhere"))), "/elsewhere");
    }

    #[test]
    fn test_git_action_names() {
        assert_eq!(GitAction::default(), GitAction::Checkout);
        assert_eq!(GitAction::Rebase.to_string(), "rebase");
        assert_eq!(<GitAction as FromStr>::from_str("none").unwrap(), GitAction::None);
    }
}
