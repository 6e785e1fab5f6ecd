use super::common::LogLevel;
use super::run::Args;
use super::{Host, ProgressReporter, criteria};
use crate::Result;
use crate::criteria::BuildCheck;
use crate::evergreen::{CiBackend, Client, EvergreenConfig};
use crate::reports::{OutputFormat, generate_json, generate_not_found, generate_revision, generate_transition_errors, generate_yaml};
use crate::search::{NoProgress, Orchestrator, Progress, RevisionInformation, SearchLimits, TransitionOptions};
use crate::vcs::{Git, Vcs};
use core::time::Duration;
use ohno::EnrichableExt;
use std::io::{IsTerminal, Write, stderr, stdout};

/// How long a search runs before its progress bar shows up.
const PROGRESS_DELAY: Duration = Duration::from_millis(300);

/// Search the Evergreen project for a revision meeting the criteria and move the working copies to it.
pub async fn search<H: Host>(host: &mut H, args: &Args) -> Result<()> {
    let Some(checks) = criteria::search_criteria(host, args) else {
        return Ok(());
    };

    let config = EvergreenConfig::load(&args.evg_config_file)?;
    let client = Client::new(&config)?;
    search_with(host, args, &client, &Git::default(), &checks).await
}

/// Run a search against explicit backend and VCS implementations and report its outcome.
pub async fn search_with<H, B, V>(host: &mut H, args: &Args, backend: &B, vcs: &V, checks: &[BuildCheck]) -> Result<()>
where
    H: Host,
    B: CiBackend,
    V: Vcs,
{
    let limits = search_limits(args);
    let transition = TransitionOptions {
        action: args.git_operation,
        branch: args.branch.clone(),
    };

    let progress: Box<dyn Progress> = if args.output_format.is_machine_readable() {
        Box::new(NoProgress)
    } else {
        // logging and a progress bar fight over stderr
        let delay = if args.effective_log_level() == LogLevel::None {
            PROGRESS_DELAY
        } else {
            Duration::from_hours(365 * 24)
        };

        Box::new(ProgressReporter::new(delay, args.color.use_colors(stderr().is_terminal())))
    };

    let orchestrator = Orchestrator::new(backend, vcs, host.working_dir()?, limits, transition, progress.as_ref());
    let found = orchestrator
        .find_and_transition(&args.evg_project, checks)
        .await
        .map_err(|e| e.enrich_with(|| format!("searching for a revision of '{}'", args.evg_project)))?;
    match found {
        Some(info) => report_revision(host, args, &info),
        None => {
            let mut output = String::new();
            if args.output_format.is_machine_readable() {
                generate_not_found(args.color.use_colors(stderr().is_terminal()), &mut output)?;
                let _ = write!(host.error(), "{output}");
            } else {
                generate_not_found(args.color.use_colors(stdout().is_terminal()), &mut output)?;
                let _ = write!(host.output(), "{output}");
            }

            host.exit(1);
            Ok(())
        }
    }
}

fn search_limits(args: &Args) -> SearchLimits {
    SearchLimits {
        max_lookback: args.commit_lookback,
        commit_limit: args.commit_limit.clone(),
        // zero means no timeout
        timeout: args.timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs),
    }
}

fn report_revision<H: Host>(host: &mut H, args: &Args, info: &RevisionInformation) -> Result<()> {
    let mut output = String::new();
    match args.output_format {
        OutputFormat::Plaintext => {
            let use_colors = args.color.use_colors(stdout().is_terminal());
            generate_revision(info, use_colors, &mut output)?;
            generate_transition_errors(&info.errors, use_colors, &mut output)?;
        }
        OutputFormat::Yaml => generate_yaml(info, &mut output)?,
        OutputFormat::Json => generate_json(info, &mut output)?,
    }

    let _ = write!(host.output(), "{output}");

    // keep structured stdout parseable
    if args.output_format.is_machine_readable() && !info.errors.is_empty() {
        let mut errors = String::new();
        generate_transition_errors(&info.errors, args.color.use_colors(stderr().is_terminal()), &mut errors)?;
        let _ = write!(host.error(), "{errors}");
    }

    Ok(())
}
