use super::{BuildCheck, CriteriaError};
use serde::{Deserialize, Serialize};

/// A named set of rules that can be reused across invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriteriaGroup {
    name: String,

    #[serde(default)]
    rules: Vec<BuildCheck>,
}

impl CriteriaGroup {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn rules(&self) -> &[BuildCheck] {
        &self.rules
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Add a rule to this group.
    ///
    /// Rules are keyed by their build variant patterns. If rules with the same patterns already
    /// exist, they are replaced when `override_existing` is set and a conflict is reported
    /// otherwise, leaving the group untouched.
    pub fn add(&mut self, check: BuildCheck, override_existing: bool) -> Result<(), CriteriaError> {
        let conflicting = self.rules.iter().any(|rule| rule.patterns() == check.patterns());
        if conflicting && !override_existing {
            return Err(CriteriaError::Conflict {
                group: self.name.clone(),
                patterns: check.patterns().to_vec(),
            });
        }

        self.rules.retain(|rule| rule.patterns() != check.patterns());
        self.rules.push(check);
        Ok(())
    }
}
