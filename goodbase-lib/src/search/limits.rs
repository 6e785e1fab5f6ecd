use super::LOG_TARGET;
use core::fmt::{Display, Formatter};
use core::time::Duration;

/// Number of revisions past the newest one that are scanned by default.
pub const DEFAULT_MAX_LOOKBACK: usize = 50;

/// Bounds on how far back a search goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchLimits {
    /// Highest revision index that is still evaluated (0 is the newest revision)
    pub max_lookback: usize,

    /// Stop at the first revision whose identifier starts with this prefix
    pub commit_limit: Option<String>,

    /// Stop once the search has been running for longer than this
    pub timeout: Option<Duration>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_lookback: DEFAULT_MAX_LOOKBACK,
            commit_limit: None,
            timeout: None,
        }
    }
}

/// Why a search ended without a match before running out of revisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Lookback { index: usize, max_lookback: usize },
    CommitLimit { revision: String },
    Timeout { elapsed: Duration },
}

impl Display for StopReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Lookback { max_lookback, .. } => write!(f, "searched past the lookback limit of {max_lookback} revisions"),
            Self::CommitLimit { revision } => write!(f, "reached the commit limit at '{revision}'"),
            Self::Timeout { elapsed } => write!(f, "timed out after {:.1}s", elapsed.as_secs_f64()),
        }
    }
}

impl SearchLimits {
    /// Check whether the revision at `index` may still be evaluated.
    ///
    /// Returns the reason to stop, or `None` to carry on.
    #[must_use]
    pub fn limit_hit(&self, index: usize, revision: &str, elapsed: Duration) -> Option<StopReason> {
        if index > self.max_lookback {
            log::debug!(target: LOG_TARGET, "Exceeded max lookback: {index} > {}", self.max_lookback);
            return Some(StopReason::Lookback {
                index,
                max_lookback: self.max_lookback,
            });
        }

        if let Some(limit) = &self.commit_limit
            && revision.starts_with(limit.as_str())
        {
            log::debug!(target: LOG_TARGET, "Reached commit limit '{limit}' at '{revision}'");
            return Some(StopReason::CommitLimit {
                revision: revision.to_string(),
            });
        }

        if let Some(timeout) = self.timeout
            && elapsed > timeout
        {
            log::debug!(target: LOG_TARGET, "Exceeded timeout: {:.1}s > {}s", elapsed.as_secs_f64(), timeout.as_secs());
            return Some(StopReason::Timeout { elapsed });
        }

        None
    }
}
