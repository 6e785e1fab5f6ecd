//! Rendering of search results and saved criteria
//!
//! Search results are rendered either as colored plaintext for people or as a flat YAML or JSON
//! mapping for scripts. The mapping holds each module's revision followed by the
//! `stable_revision` key. Saved criteria are listed as one table per group.

mod console;
mod structured;

pub use console::{generate_criteria, generate_not_found, generate_revision, generate_transition_errors};
pub use structured::{generate_json, generate_yaml};

use clap::ValueEnum;
use strum::{Display, EnumString};

/// How a found revision is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Display, EnumString)]
#[value(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// Colored text meant for a terminal
    #[default]
    Plaintext,

    /// A YAML mapping of module revisions and `stable_revision`
    Yaml,

    /// A JSON object of module revisions and `stable_revision`
    Json,
}

impl OutputFormat {
    /// Whether the output is meant to be parsed rather than read.
    #[must_use]
    pub const fn is_machine_readable(self) -> bool {
        !matches!(self, Self::Plaintext)
    }
}
