//! Handlers for the saved-criteria actions: list, save, export, import, and use.

use super::Host;
use super::run::Args;
use crate::Result;
use crate::criteria::{BuildCheck, BuildCheckDef, CriteriaError, CriteriaStore, DEFAULT_BUILD_VARIANT_PATTERN, DEFAULT_SUCCESS_THRESHOLD};
use crate::reports::generate_criteria;
use camino::Utf8Path;
use owo_colors::OwoColorize;
use std::collections::BTreeSet;
use std::io::{IsTerminal, Write, stderr, stdout};

const LOG_TARGET: &str = "  criteria";

/// Build the rule described by the criteria flags.
///
/// Without any variant pattern the rule covers `.*-required`; without any threshold or task it
/// requires a 95% success rate.
pub fn build_check(args: &Args) -> Result<BuildCheck, CriteriaError> {
    let build_variant_name_patterns = if args.build_variants.is_empty() {
        vec![DEFAULT_BUILD_VARIANT_PATTERN.to_string()]
    } else {
        args.build_variants.clone()
    };

    let unconstrained =
        args.pass_threshold.is_none() && args.run_threshold.is_none() && args.passing_tasks.is_empty() && args.run_tasks.is_empty();

    BuildCheck::new(BuildCheckDef {
        build_variant_name_patterns,
        success_threshold: if unconstrained { Some(DEFAULT_SUCCESS_THRESHOLD) } else { args.pass_threshold },
        run_threshold: args.run_threshold,
        successful_tasks: task_set(&args.passing_tasks),
        active_tasks: task_set(&args.run_tasks),
    })
}

fn task_set(tasks: &[String]) -> Option<BTreeSet<String>> {
    (!tasks.is_empty()).then(|| tasks.iter().cloned().collect())
}

pub fn list_criteria<H: Host>(host: &mut H, args: &Args) -> Result<()> {
    let store = match args.criteria_file().and_then(|path| CriteriaStore::load(&path)) {
        Ok(store) => store,
        Err(e) => {
            report_failure(host, args, "Could not read saved criteria", &e);
            return Ok(());
        }
    };

    let mut output = String::new();
    generate_criteria(store.groups(), args.color.use_colors(stdout().is_terminal()), &mut output)?;
    let _ = write!(host.output(), "{output}");
    Ok(())
}

pub fn save_criteria<H: Host>(host: &mut H, args: &Args, name: &str) -> Result<()> {
    if let Err(e) = save_criteria_inner(args, name) {
        report_failure(host, args, &format!("Could not save: {name}"), &e);
    }

    Ok(())
}

fn save_criteria_inner(args: &Args, name: &str) -> Result<()> {
    let check = build_check(args)?;
    let path = args.criteria_file()?;

    let mut store = CriteriaStore::load(&path)?;
    store.add_criteria(name, check, args.override_existing)?;
    store.write_document(&path)?;

    log::info!(target: LOG_TARGET, "Saved criteria '{name}' to '{path}'");
    Ok(())
}

pub fn export_criteria<H: Host>(host: &mut H, args: &Args) -> Result<()> {
    let Some(export_file) = &args.export_file else {
        let message = "Export file needs to be specified with `--export-file`";
        let use_colors = args.color.use_colors(stderr().is_terminal());
        if use_colors {
            let _ = writeln!(host.error(), "{}", message.red());
        } else {
            let _ = writeln!(host.error(), "{message}");
        }

        host.exit(1);
        return Ok(());
    };

    if let Err(e) = export_criteria_inner(args, export_file) {
        report_failure(host, args, &format!("Could not export to: {export_file}"), &e);
    }

    Ok(())
}

fn export_criteria_inner(args: &Args, export_file: &Utf8Path) -> Result<()> {
    let store = CriteriaStore::load(&args.criteria_file()?)?;
    let exported = store.export(args.export_criteria.iter().map(String::as_str));

    for name in &args.export_criteria {
        if exported.groups().iter().all(|group| group.name() != name) {
            log::warn!(target: LOG_TARGET, "No saved criteria named '{name}' to export");
        }
    }

    exported.write_document(export_file)
}

pub fn import_criteria<H: Host>(host: &mut H, args: &Args, import_file: &Utf8Path) -> Result<()> {
    if let Err(e) = import_criteria_inner(args, import_file) {
        report_failure(host, args, &format!("Could not import from: {import_file}"), &e);
    }

    Ok(())
}

fn import_criteria_inner(args: &Args, import_file: &Utf8Path) -> Result<()> {
    let incoming = CriteriaStore::read_document(import_file)?;
    let path = args.criteria_file()?;

    let mut store = CriteriaStore::load(&path)?;
    store.import(&incoming, args.override_existing)?;
    store.write_document(&path)?;

    log::info!(target: LOG_TARGET, "Imported {} criteria group(s) from '{import_file}'", incoming.groups().len());
    Ok(())
}

/// The rules a search should apply: the saved group named by `--use-criteria`, or the rule
/// built from the criteria flags.
///
/// Returns `None` after reporting the problem when the rules cannot be obtained.
pub fn search_criteria<H: Host>(host: &mut H, args: &Args) -> Option<Vec<BuildCheck>> {
    let (heading, outcome) = if let Some(name) = &args.use_criteria {
        let outcome = args
            .criteria_file()
            .and_then(|path| CriteriaStore::load(&path))
            .and_then(|store| Ok(store.lookup(name)?.to_vec()));
        (format!("Could not use: {name}"), outcome)
    } else {
        ("Invalid criteria".to_string(), build_check(args).map(|check| vec![check]).map_err(ohno::AppError::from))
    };

    match outcome {
        Ok(checks) => {
            log::debug!(target: LOG_TARGET, "Searching with criteria {checks:?}");
            Some(checks)
        }
        Err(e) => {
            report_failure(host, args, &heading, &e);
            None
        }
    }
}

/// Print a red heading and its cause to the error stream, then exit with status 1.
fn report_failure<H: Host>(host: &mut H, args: &Args, heading: &str, cause: &ohno::AppError) {
    let cause = format!("{cause:#}");
    let use_colors = args.color.use_colors(stderr().is_terminal());

    if use_colors {
        let _ = writeln!(host.error(), "{}\n{}", heading.red(), cause.red());
    } else {
        let _ = writeln!(host.error(), "{heading}\n{cause}");
    }

    host.exit(1);
}
