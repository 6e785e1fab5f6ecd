use crate::evergreen::TaskResult;
use std::collections::HashSet;

/// A summary of the task results of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStatus {
    build_name: String,
    successful_tasks: HashSet<String>,
    inactive_tasks: HashSet<String>,
    all_tasks: HashSet<String>,
}

impl BuildStatus {
    #[must_use]
    pub fn new(
        build_name: impl Into<String>,
        successful_tasks: HashSet<String>,
        inactive_tasks: HashSet<String>,
        all_tasks: HashSet<String>,
    ) -> Self {
        Self {
            build_name: build_name.into(),
            successful_tasks,
            inactive_tasks,
            all_tasks,
        }
    }

    /// Reduce the fetched task list of a build into a status summary.
    #[must_use]
    pub fn from_tasks<'a>(build_name: impl Into<String>, tasks: impl IntoIterator<Item = &'a TaskResult>) -> Self {
        let mut successful_tasks = HashSet::new();
        let mut inactive_tasks = HashSet::new();
        let mut all_tasks = HashSet::new();

        for task in tasks {
            if task.succeeded {
                let _ = successful_tasks.insert(task.name.clone());
            }

            if !task.dispatched {
                let _ = inactive_tasks.insert(task.name.clone());
            }

            let _ = all_tasks.insert(task.name.clone());
        }

        Self::new(build_name, successful_tasks, inactive_tasks, all_tasks)
    }

    #[must_use]
    pub fn build_name(&self) -> &str {
        &self.build_name
    }

    #[must_use]
    pub const fn successful_tasks(&self) -> &HashSet<String> {
        &self.successful_tasks
    }

    #[must_use]
    pub const fn inactive_tasks(&self) -> &HashSet<String> {
        &self.inactive_tasks
    }

    #[must_use]
    pub const fn all_tasks(&self) -> &HashSet<String> {
        &self.all_tasks
    }

    /// Fraction of tasks that succeeded, or `None` for a build without tasks.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "task counts are far below 2^52")]
    pub fn success_pct(&self) -> Option<f64> {
        if self.all_tasks.is_empty() {
            return None;
        }

        Some(self.successful_tasks.len() as f64 / self.all_tasks.len() as f64)
    }

    /// Fraction of tasks that were dispatched, or `None` for a build without tasks.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "task counts are far below 2^52")]
    pub fn active_pct(&self) -> Option<f64> {
        if self.all_tasks.is_empty() {
            return None;
        }

        Some(1.0 - self.inactive_tasks.len() as f64 / self.all_tasks.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(prefix: &str, count: usize) -> HashSet<String> {
        (0..count).map(|i| format!("{prefix}{i}")).collect()
    }

    #[test]
    #[expect(clippy::cast_precision_loss, reason = "small test counts")]
    fn test_success_pct_matches_ratio() {
        for n in 1..=12 {
            for k in 0..=n {
                let all = names("task_", n);
                let successful = names("task_", k);
                let status = BuildStatus::new("bv", successful, HashSet::new(), all);
                assert_eq!(status.success_pct(), Some(k as f64 / n as f64));
            }
        }
    }

    #[test]
    #[expect(clippy::cast_precision_loss, reason = "small test counts")]
    fn test_active_pct_matches_ratio() {
        for n in 1..=12 {
            for k in 0..=n {
                let all = names("task_", n);
                let inactive = names("task_", k);
                let status = BuildStatus::new("bv", HashSet::new(), inactive, all);
                assert_eq!(status.active_pct(), Some(1.0 - k as f64 / n as f64));
            }
        }
    }

    #[test]
    fn test_percentages_undefined_without_tasks() {
        let status = BuildStatus::new("bv", HashSet::new(), HashSet::new(), HashSet::new());
        assert_eq!(status.success_pct(), None);
        assert_eq!(status.active_pct(), None);
    }

    #[test]
    fn test_from_tasks_classifies_results() {
        let tasks = [
            TaskResult::new("compile", true, true),
            TaskResult::new("lint", false, true),
            TaskResult::new("jstests", false, false),
        ];

        let status = BuildStatus::from_tasks("linux-required", &tasks);

        assert_eq!(status.build_name(), "linux-required");
        assert_eq!(status.all_tasks().len(), 3);
        assert!(status.successful_tasks().contains("compile"));
        assert_eq!(status.successful_tasks().len(), 1);
        assert!(status.inactive_tasks().contains("jstests"));
        assert_eq!(status.inactive_tasks().len(), 1);
    }
}
