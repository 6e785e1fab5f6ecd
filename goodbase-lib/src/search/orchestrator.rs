use super::{BuildEvaluator, LOG_TARGET, Progress, RevisionSearch, SearchLimits, SearchOutcome};
use crate::Result;
use crate::criteria::BuildCheck;
use crate::evergreen::{CiBackend, module_locations};
use crate::vcs::{GitAction, Vcs, perform_action, resolve_directory};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;

/// Key of the primary working copy in [`RevisionInformation::errors`].
pub const PRIMARY_TARGET: &str = "BASE";

/// The revision a search settled on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionInformation {
    pub revision: String,

    /// Module name to the module revision that was tested with `revision`
    pub module_revisions: BTreeMap<String, String>,

    /// Working copy (module name or [`PRIMARY_TARGET`]) to the error its transition hit
    pub errors: BTreeMap<String, String>,
}

/// How working copies are moved to the found revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionOptions {
    pub action: GitAction,

    /// Branch created by a checkout
    pub branch: Option<String>,
}

/// Runs a revision search and applies its result to the local working copies.
#[derive(Debug)]
pub struct Orchestrator<'a, B, V> {
    backend: &'a B,
    vcs: &'a V,
    working_dir: Utf8PathBuf,
    limits: SearchLimits,
    transition: TransitionOptions,
    progress: &'a dyn Progress,
}

impl<'a, B: CiBackend, V: Vcs> Orchestrator<'a, B, V> {
    #[must_use]
    pub fn new(
        backend: &'a B,
        vcs: &'a V,
        working_dir: impl Into<Utf8PathBuf>,
        limits: SearchLimits,
        transition: TransitionOptions,
        progress: &'a dyn Progress,
    ) -> Self {
        Self {
            backend,
            vcs,
            working_dir: working_dir.into(),
            limits,
            transition,
            progress,
        }
    }

    /// Find the newest revision of `project` that satisfies `checks` and move the working
    /// copies to it.
    ///
    /// Returns `None` when no revision qualifies. Transition failures do not fail the call;
    /// they are reported per working copy in [`RevisionInformation::errors`].
    pub async fn find_and_transition(&self, project: &str, checks: &[BuildCheck]) -> Result<Option<RevisionInformation>> {
        let evaluator = BuildEvaluator::new(self.backend, checks);
        let search = RevisionSearch::new(&self.limits, self.progress);

        let revision = match search.run(project, &evaluator, self.backend.revisions(project)).await? {
            SearchOutcome::Matched(revision) => revision,
            SearchOutcome::Exhausted => {
                log::debug!(target: LOG_TARGET, "No more revisions of '{project}' to check");
                return Ok(None);
            }
            SearchOutcome::Stopped(reason) => {
                log::info!(target: LOG_TARGET, "Stopped searching '{project}': {reason}");
                return Ok(None);
            }
        };

        let module_revisions = self.backend.module_revisions(project, &revision).await?;
        let errors = self.transition(project, &revision, &module_revisions).await?;

        Ok(Some(RevisionInformation {
            revision,
            module_revisions,
            errors,
        }))
    }

    async fn transition(
        &self,
        project: &str,
        revision: &str,
        module_revisions: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();
        if self.transition.action == GitAction::None {
            return Ok(errors);
        }

        self.transition_one(PRIMARY_TARGET, revision, &self.working_dir, &mut errors).await;

        if module_revisions.is_empty() {
            return Ok(errors);
        }

        let config_file = self.backend.project_config_path(project).await?;
        let locations = module_locations(&resolve_directory(&self.working_dir, Some(&config_file)))?;

        for (module, module_revision) in module_revisions {
            let Some(location) = locations.get(module) else {
                log::debug!(target: LOG_TARGET, "Module '{module}' is not declared in '{config_file}', skipping");
                continue;
            };

            let directory = resolve_directory(&self.working_dir, Some(location));
            if !directory.is_dir() {
                log::debug!(target: LOG_TARGET, "Module '{module}' is not checked out at '{directory}', skipping");
                continue;
            }

            self.transition_one(module, module_revision, &directory, &mut errors).await;
        }

        Ok(errors)
    }

    async fn transition_one(&self, target: &str, revision: &str, directory: &Utf8Path, errors: &mut BTreeMap<String, String>) {
        let action = self.transition.action;
        if let Err(e) = perform_action(self.vcs, action, revision, directory, self.transition.branch.as_deref()).await {
            log::warn!(target: LOG_TARGET, "Could not {action} '{revision}' in '{directory}': {e:#}");
            let _ = errors.insert(
                target.to_string(),
                format!("Encountered error performing '{action}' on '{revision}'"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::BuildCheckDef;
    use crate::evergreen::{RevisionDescriptor, TaskResult};
    use crate::search::NoProgress;
    use futures::stream::{self, BoxStream, StreamExt};
    use std::fs;
    use std::sync::Mutex;

    struct FakeBackend {
        revisions: Vec<(String, Vec<TaskResult>)>,
        modules: BTreeMap<String, String>,
    }

    impl CiBackend for FakeBackend {
        fn revisions<'a>(&'a self, _project: &'a str) -> BoxStream<'a, Result<RevisionDescriptor>> {
            stream::iter(
                self.revisions
                    .iter()
                    .map(|(revision, _)| Ok(RevisionDescriptor::new(revision.clone(), [("linux-required".to_string(), revision.clone())]))),
            )
            .boxed()
        }

        async fn build_tasks(&self, build_id: &str) -> Result<Vec<TaskResult>> {
            Ok(self
                .revisions
                .iter()
                .find(|(revision, _)| revision == build_id)
                .map(|(_, tasks)| tasks.clone())
                .unwrap_or_default())
        }

        async fn module_revisions(&self, _project: &str, _revision: &str) -> Result<BTreeMap<String, String>> {
            Ok(self.modules.clone())
        }

        async fn project_config_path(&self, _project: &str) -> Result<Utf8PathBuf> {
            Ok(Utf8PathBuf::from("etc/evergreen.yml"))
        }
    }

    #[derive(Default)]
    struct FakeVcs {
        failing_dirs: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeVcs {
        fn check(&self, call: String, directory: &Utf8Path) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.failing_dirs.iter().any(|dir| directory.as_str().ends_with(dir.as_str())) {
                ohno::bail!("merge conflict");
            }
            Ok(())
        }
    }

    impl Vcs for FakeVcs {
        async fn fetch(&self, _directory: &Utf8Path) -> Result<()> {
            Ok(())
        }

        async fn checkout(&self, revision: &str, directory: &Utf8Path, _branch: Option<&str>) -> Result<()> {
            self.check(format!("checkout {revision}"), directory)
        }

        async fn rebase(&self, revision: &str, directory: &Utf8Path) -> Result<()> {
            self.check(format!("rebase {revision}"), directory)
        }

        async fn merge(&self, revision: &str, directory: &Utf8Path) -> Result<()> {
            self.check(format!("merge {revision}"), directory)
        }
    }

    fn tasks(passing: bool) -> Vec<TaskResult> {
        vec![TaskResult::new("compile", passing, true)]
    }

    fn checks() -> Vec<BuildCheck> {
        vec![
            BuildCheck::new(BuildCheckDef {
                build_variant_name_patterns: vec![".*-required".to_string()],
                success_threshold: Some(0.95),
                ..BuildCheckDef::default()
            })
            .unwrap(),
        ]
    }

    fn backend(modules: &[(&str, &str)]) -> FakeBackend {
        FakeBackend {
            revisions: vec![
                ("rev0".to_string(), tasks(false)),
                ("rev1".to_string(), tasks(true)),
                ("rev2".to_string(), tasks(true)),
            ],
            modules: modules.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
        }
    }

    fn write_project_config(root: &Utf8Path) {
        fs::create_dir_all(root.join("etc")).unwrap();
        fs::write(
            root.join("etc").join("evergreen.yml"),
            "modules:\n- name: enterprise\n  prefix: src/modules\n- name: wiredtiger\n  prefix: src/third_party\n",
        )
        .unwrap();
        fs::create_dir_all(root.join("src").join("modules").join("enterprise")).unwrap();
    }

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, root)
    }

    #[tokio::test]
    async fn test_no_transition_requested() {
        let backend = backend(&[("enterprise", "ent1")]);
        let vcs = FakeVcs::default();
        let transition = TransitionOptions {
            action: GitAction::None,
            branch: None,
        };
        let orchestrator = Orchestrator::new(&backend, &vcs, "/repo", SearchLimits::default(), transition, &NoProgress);

        let info = orchestrator.find_and_transition("mongodb-mongo-master", &checks()).await.unwrap().unwrap();

        assert_eq!(info.revision, "rev1");
        assert_eq!(info.module_revisions["enterprise"], "ent1");
        assert!(info.errors.is_empty());
        assert!(vcs.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_match() {
        let backend = backend(&[]);
        let vcs = FakeVcs::default();
        let limits = SearchLimits {
            max_lookback: 0,
            ..SearchLimits::default()
        };
        let orchestrator = Orchestrator::new(&backend, &vcs, "/repo", limits, TransitionOptions::default(), &NoProgress);

        let info = orchestrator.find_and_transition("mongodb-mongo-master", &checks()).await.unwrap();

        assert_eq!(info, None);
        assert!(vcs.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_transitions_primary_and_present_modules() {
        let (_tmp, root) = temp_root();
        write_project_config(&root);

        let backend = backend(&[("enterprise", "ent1"), ("wiredtiger", "wt1"), ("undeclared", "x1")]);
        let vcs = FakeVcs::default();
        let orchestrator = Orchestrator::new(&backend, &vcs, root.clone(), SearchLimits::default(), TransitionOptions::default(), &NoProgress);

        let info = orchestrator.find_and_transition("mongodb-mongo-master", &checks()).await.unwrap().unwrap();

        // wiredtiger is declared but not checked out, so only the primary copy and enterprise move
        assert_eq!(*vcs.calls.lock().unwrap(), ["checkout rev1", "checkout ent1"]);
        assert!(info.errors.is_empty());
    }

    #[tokio::test]
    #[cfg_attr(miri, ignore = "Miri cannot call GetTempPathW")]
    async fn test_failures_are_collected_per_target() {
        let (_tmp, root) = temp_root();
        write_project_config(&root);

        let backend = backend(&[("enterprise", "ent1")]);
        let vcs = FakeVcs {
            failing_dirs: vec![root.to_string(), "enterprise".to_string()],
            ..FakeVcs::default()
        };
        let transition = TransitionOptions {
            action: GitAction::Rebase,
            branch: None,
        };
        let orchestrator = Orchestrator::new(&backend, &vcs, root.clone(), SearchLimits::default(), transition, &NoProgress);

        let info = orchestrator.find_and_transition("mongodb-mongo-master", &checks()).await.unwrap().unwrap();

        assert_eq!(vcs.calls.lock().unwrap().len(), 2);
        assert_eq!(info.errors.len(), 2);
        assert_eq!(info.errors[PRIMARY_TARGET], "Encountered error performing 'rebase' on 'rev1'");
        assert_eq!(info.errors["enterprise"], "Encountered error performing 'rebase' on 'ent1'");
    }
}
