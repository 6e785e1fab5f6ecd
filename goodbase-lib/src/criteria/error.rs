/// Failures of criteria construction, lookup, and merging.
#[derive(Debug, thiserror::Error)]
pub enum CriteriaError {
    /// A rule with the same build variant patterns already exists in the group.
    #[error("criteria group '{group}' already has a rule for build variants {patterns:?}, use `--override` to override it")]
    Conflict { group: String, patterns: Vec<String> },

    /// The named group does not exist or holds no rules.
    #[error("no criteria found named '{0}'")]
    NotFound(String),

    /// A build variant pattern is not a valid regular expression.
    #[error("invalid build variant pattern")]
    InvalidPattern(#[source] regex::Error),

    /// A rule was given an empty list of build variant patterns.
    #[error("a rule needs at least one build variant pattern")]
    NoPatterns,

    /// A threshold is outside of the 0..=1 range.
    #[error("{name} must be between 0 and 1, got {value}")]
    InvalidThreshold { name: &'static str, value: f64 },
}
