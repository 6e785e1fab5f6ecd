//! Command-line interface and orchestration for git-co-evg-base
//!
//! This module parses the command line, sets up logging, and routes each invocation to exactly
//! one action.
//!
//! # Actions
//!
//! - **list** (`--list-criteria`): print every saved criteria group as a table
//! - **save** (`--save-criteria NAME`): add the rule built from the criteria flags to a group
//! - **export** (`--export-criteria NAME... --export-file PATH`): write selected groups to a file
//! - **import** (`--import-criteria PATH`): merge the groups of a file into the saved criteria
//! - **search** (default): find the newest revision whose builds meet the criteria, move the
//!   local working copies to it, and report it
//!
//! Failures a user can act on (bad criteria, conflicts, missing exports) are reported on the
//! host's error stream followed by an exit with status 1. Everything else is returned as an error.
//!
//! All interaction with the outside world goes through [`Host`], so the commands can be driven
//! end to end in tests.

mod common;
mod criteria;
pub(crate) mod host;
mod progress_reporter;
mod run;
mod search;

pub use common::{ColorMode, LogLevel};
pub use host::Host;
pub use progress_reporter::ProgressReporter;
pub use run::{Args, DEFAULT_EVG_PROJECT, run};
pub use search::search_with;
