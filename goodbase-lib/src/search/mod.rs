//! Finding the most recent revision whose builds satisfy a set of rules
//!
//! [`RevisionSearch`] walks a project's revisions newest first, handing each one to a
//! [`RevisionEvaluator`] until one matches or one of the [`SearchLimits`] stops the scan.
//! [`BuildEvaluator`] is the evaluator used in practice: it fetches the task results of every
//! build a rule applies to, concurrently, and requires every build to pass every rule.
//! [`Orchestrator`] runs the search and then moves the local working copies to the result.

mod evaluator;
mod limits;
mod orchestrator;
mod progress;
mod revision_search;

pub use evaluator::{BuildEvaluator, MAX_CONCURRENT_FETCHES, RevisionEvaluator};
pub use limits::{DEFAULT_MAX_LOOKBACK, SearchLimits, StopReason};
pub use orchestrator::{Orchestrator, PRIMARY_TARGET, RevisionInformation, TransitionOptions};
pub use progress::{NoProgress, Progress};
pub use revision_search::{RevisionSearch, SearchOutcome};

pub(crate) const LOG_TARGET: &str = "    search";
