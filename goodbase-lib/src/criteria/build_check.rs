use super::{BuildStatus, CriteriaError, LOG_TARGET};
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Build variants checked when no `--build-variant` is given.
pub const DEFAULT_BUILD_VARIANT_PATTERN: &str = ".*-required";

/// Success threshold used when no other criteria are given.
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 0.95;

/// The plain, persisted form of a [`BuildCheck`].
///
/// Unset fields are left out when written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildCheckDef {
    /// Regular expressions selecting the build variants this rule applies to
    #[serde(alias = "build_variant_regex")]
    pub build_variant_name_patterns: Vec<String>,

    /// Fraction of tasks that need to have succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<f64>,

    /// Fraction of tasks that need to have run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_threshold: Option<f64>,

    /// Tasks that need to have succeeded, when present in a build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful_tasks: Option<BTreeSet<String>>,

    /// Tasks that need to have run, when present in a build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tasks: Option<BTreeSet<String>>,
}

/// A rule that decides whether a build is good enough to base work on.
///
/// A rule only constrains builds whose variant name fully matches one of its patterns. A rule
/// without thresholds and task sets accepts every build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "BuildCheckDef", into = "BuildCheckDef")]
pub struct BuildCheck {
    def: BuildCheckDef,
    matcher: RegexSet,
}

impl BuildCheck {
    /// Compile a rule from its plain form.
    ///
    /// # Errors
    ///
    /// Fails if there are no patterns, a pattern is not a valid regular expression, or a
    /// threshold is outside of `0..=1`.
    pub fn new(def: BuildCheckDef) -> Result<Self, CriteriaError> {
        if def.build_variant_name_patterns.is_empty() {
            return Err(CriteriaError::NoPatterns);
        }

        validate_threshold("success_threshold", def.success_threshold)?;
        validate_threshold("run_threshold", def.run_threshold)?;

        let matcher = RegexSet::new(def.build_variant_name_patterns.iter().map(|p| format!("^(?:{p})$")))
            .map_err(CriteriaError::InvalidPattern)?;

        Ok(Self { def, matcher })
    }

    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.def.build_variant_name_patterns
    }

    #[must_use]
    pub const fn success_threshold(&self) -> Option<f64> {
        self.def.success_threshold
    }

    #[must_use]
    pub const fn run_threshold(&self) -> Option<f64> {
        self.def.run_threshold
    }

    #[must_use]
    pub const fn successful_tasks(&self) -> Option<&BTreeSet<String>> {
        self.def.successful_tasks.as_ref()
    }

    #[must_use]
    pub const fn active_tasks(&self) -> Option<&BTreeSet<String>> {
        self.def.active_tasks.as_ref()
    }

    /// Whether this rule applies to the given build variant.
    #[must_use]
    pub fn applies_to(&self, build_variant: &str) -> bool {
        self.matcher.is_match(build_variant)
    }

    /// Check a build against this rule.
    ///
    /// Builds this rule does not apply to always pass. Required tasks that are not part of the
    /// build are ignored.
    #[must_use]
    pub fn evaluate(&self, status: &BuildStatus) -> bool {
        if !self.applies_to(status.build_name()) {
            return true;
        }

        if let Some(threshold) = self.def.success_threshold
            && !status.success_pct().is_some_and(|pct| pct >= threshold)
        {
            log::debug!(target: LOG_TARGET, "'{}' is below the success threshold of {threshold}", status.build_name());
            return false;
        }

        if let Some(threshold) = self.def.run_threshold
            && !status.active_pct().is_some_and(|pct| pct >= threshold)
        {
            log::debug!(target: LOG_TARGET, "'{}' is below the run threshold of {threshold}", status.build_name());
            return false;
        }

        if let Some(required) = &self.def.successful_tasks
            && let Some(task) = required
                .iter()
                .find(|task| status.all_tasks().contains(*task) && !status.successful_tasks().contains(*task))
        {
            log::debug!(target: LOG_TARGET, "'{}' has not passed task '{task}'", status.build_name());
            return false;
        }

        if let Some(required) = &self.def.active_tasks
            && let Some(task) = required
                .iter()
                .find(|task| status.all_tasks().contains(*task) && status.inactive_tasks().contains(*task))
        {
            log::debug!(target: LOG_TARGET, "'{}' has not run task '{task}'", status.build_name());
            return false;
        }

        true
    }
}

impl PartialEq for BuildCheck {
    fn eq(&self, other: &Self) -> bool {
        self.def == other.def
    }
}

impl TryFrom<BuildCheckDef> for BuildCheck {
    type Error = CriteriaError;

    fn try_from(def: BuildCheckDef) -> Result<Self, Self::Error> {
        Self::new(def)
    }
}

impl From<BuildCheck> for BuildCheckDef {
    fn from(check: BuildCheck) -> Self {
        check.def
    }
}

fn validate_threshold(name: &'static str, value: Option<f64>) -> Result<(), CriteriaError> {
    match value {
        Some(value) if !(0.0..=1.0).contains(&value) => Err(CriteriaError::InvalidThreshold { name, value }),
        _ => Ok(()),
    }
}
