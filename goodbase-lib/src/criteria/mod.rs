//! Build criteria and their persistence
//!
//! A [`BuildCheck`] is a single rule: a set of build variant patterns that decide which builds
//! the rule applies to, plus optional pass/run thresholds and required task sets. Rules are
//! evaluated against a [`BuildStatus`], the per-build summary of task results.
//!
//! Rules can be saved under a name in a [`CriteriaGroup`]. All groups live in a single
//! [`CriteriaStore`] document that is read and rewritten as a whole. Adding a rule whose
//! pattern list already exists in a group is a conflict unless an override is requested.

mod build_check;
mod build_status;
mod error;
mod group;
mod store;

pub use build_check::{BuildCheck, BuildCheckDef, DEFAULT_BUILD_VARIANT_PATTERN, DEFAULT_SUCCESS_THRESHOLD};
pub use build_status::BuildStatus;
pub use error::CriteriaError;
pub use group::CriteriaGroup;
pub use store::{CONFIG_FILE_NAME, CriteriaStore};

pub(crate) const LOG_TARGET: &str = "  criteria";
