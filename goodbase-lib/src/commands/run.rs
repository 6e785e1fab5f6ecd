//! Command dispatch logic for git-co-evg-base

use super::common::{ColorMode, LogLevel, init_logging};
use super::{criteria, search};
use crate::criteria::CriteriaStore;
use crate::evergreen::DEFAULT_EVERGREEN_CONFIG;
use crate::reports::OutputFormat;
use crate::search::DEFAULT_MAX_LOOKBACK;
use crate::vcs::GitAction;
use crate::{Host, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Project searched when none is given.
pub const DEFAULT_EVG_PROJECT: &str = "mongodb-mongo-master";

#[derive(Parser, Debug)]
#[command(name = "git-co-evg-base", author, version, long_about = None, display_name = "git co-evg-base")]
#[command(about = "Find and check out a recent commit whose Evergreen builds meet your criteria")]
#[command(styles = CLAP_STYLES)]
pub struct Args {
    /// Fraction of tasks in each matching build that must have succeeded
    #[arg(long, value_name = "FRACTION", help_heading = "Criteria")]
    pub pass_threshold: Option<f64>,

    /// Fraction of tasks in each matching build that must have run
    #[arg(long, value_name = "FRACTION", help_heading = "Criteria")]
    pub run_threshold: Option<f64>,

    /// A task that must have succeeded in each matching build (can be repeated)
    #[arg(long = "passing-task", value_name = "TASK", help_heading = "Criteria")]
    pub passing_tasks: Vec<String>,

    /// A task that must have run in each matching build (can be repeated)
    #[arg(long = "run-task", value_name = "TASK", help_heading = "Criteria")]
    pub run_tasks: Vec<String>,

    /// Regex selecting the build variants the criteria apply to (can be repeated) [default: .*-required]
    #[arg(long = "build-variant", value_name = "REGEX", help_heading = "Criteria")]
    pub build_variants: Vec<String>,

    /// File holding Evergreen credentials
    #[arg(long, value_name = "PATH", default_value = DEFAULT_EVERGREEN_CONFIG, help_heading = "Evergreen")]
    pub evg_config_file: Utf8PathBuf,

    /// Evergreen project to search
    #[arg(long, value_name = "PROJECT", default_value = DEFAULT_EVG_PROJECT, help_heading = "Evergreen")]
    pub evg_project: String,

    /// Number of commits to check before giving up
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_MAX_LOOKBACK, help_heading = "Search")]
    pub commit_lookback: usize,

    /// Number of seconds to search before giving up
    #[arg(long, value_name = "SECONDS", help_heading = "Search")]
    pub timeout_secs: Option<u64>,

    /// Oldest commit to check before giving up
    #[arg(long, value_name = "REVISION", help_heading = "Search")]
    pub commit_limit: Option<String>,

    /// Git operation used to move the working copies to the found revision
    #[arg(long, value_name = "OPERATION", default_value_t = GitAction::Checkout, help_heading = "Git")]
    pub git_operation: GitAction,

    /// Name of a branch to create when checking out
    #[arg(long, short = 'b', value_name = "NAME", help_heading = "Git")]
    pub branch: Option<String>,

    /// Save the criteria given on the command line under a name
    #[arg(long, value_name = "NAME", help_heading = "Saved Criteria")]
    pub save_criteria: Option<String>,

    /// Search using previously saved criteria
    #[arg(long, value_name = "NAME", help_heading = "Saved Criteria")]
    pub use_criteria: Option<String>,

    /// Display all saved criteria
    #[arg(long, help_heading = "Saved Criteria")]
    pub list_criteria: bool,

    /// Replace saved rules that cover the same build variants
    #[arg(long = "override", help_heading = "Saved Criteria")]
    pub override_existing: bool,

    /// Name of saved criteria to export (can be repeated)
    #[arg(long, value_name = "NAME", help_heading = "Saved Criteria")]
    pub export_criteria: Vec<String>,

    /// File to export criteria to
    #[arg(long, value_name = "PATH", help_heading = "Saved Criteria")]
    pub export_file: Option<Utf8PathBuf>,

    /// File to import criteria from
    #[arg(long, value_name = "PATH", help_heading = "Saved Criteria")]
    pub import_criteria: Option<Utf8PathBuf>,

    /// File where criteria are saved [default: git_co_evg_base.yml in the user configuration directory]
    #[arg(long, value_name = "PATH", help_heading = "Saved Criteria")]
    pub criteria_file: Option<Utf8PathBuf>,

    /// Format used to report the found revision
    #[arg(long, value_name = "FORMAT", default_value_t = OutputFormat::Plaintext, help_heading = "Output")]
    pub output_format: OutputFormat,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto", help_heading = "Output")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none", help_heading = "Output")]
    pub log_level: LogLevel,

    /// Shortcut for `--log-level debug`
    #[arg(long, short = 'v', help_heading = "Output")]
    pub verbose: bool,
}

impl Args {
    /// The criteria file to read and write.
    pub fn criteria_file(&self) -> Result<Utf8PathBuf> {
        self.criteria_file.clone().map_or_else(CriteriaStore::default_location, Ok)
    }

    pub(crate) const fn effective_log_level(&self) -> LogLevel {
        if self.verbose { LogLevel::Debug } else { self.log_level }
    }
}

/// Dispatch command-line arguments to the appropriate handler
///
/// Only one action runs per invocation. Listing wins over saving, saving over exporting,
/// exporting over importing, and a search runs when none of those was requested.
///
/// # Arguments
///
/// * `args` - An iterator of command-line arguments (typically from `std::env::args()`)
///
/// # Errors
///
/// Returns an error if the executed action fails in a way it does not report itself
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let args = Args::parse_from(args);
    init_logging(args.effective_log_level());

    if args.list_criteria {
        criteria::list_criteria(host, &args)
    } else if let Some(name) = &args.save_criteria {
        criteria::save_criteria(host, &args, name)
    } else if !args.export_criteria.is_empty() {
        criteria::export_criteria(host, &args)
    } else if let Some(path) = &args.import_criteria {
        criteria::import_criteria(host, &args, path)
    } else {
        search::search(host, &args).await
    }
}
