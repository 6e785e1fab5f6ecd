use crate::Result;
use crate::criteria::{BuildCheck, CriteriaGroup};
use crate::search::RevisionInformation;
use core::fmt::Write;
use owo_colors::OwoColorize;
use std::collections::{BTreeMap, BTreeSet};

const CRITERIA_HEADERS: [&str; 5] = ["Build Variant Patterns", "Success %", "Run %", "Successful Tasks", "Active Tasks"];

pub fn generate_revision<W: Write>(info: &RevisionInformation, use_colors: bool, writer: &mut W) -> Result<()> {
    let line = format!("Found revision: {}", info.revision);
    if use_colors {
        writeln!(writer, "{}", line.green())?;
    } else {
        writeln!(writer, "{line}")?;
    }

    for (module, revision) in &info.module_revisions {
        writeln!(writer, "\t{module}: {revision}")?;
    }

    Ok(())
}

pub fn generate_transition_errors<W: Write>(errors: &BTreeMap<String, String>, use_colors: bool, writer: &mut W) -> Result<()> {
    if errors.is_empty() {
        return Ok(());
    }

    let heading = format!("Encountered {} errors performing git operations", errors.len());
    if use_colors {
        writeln!(writer, "{}", heading.yellow().bold())?;
    } else {
        writeln!(writer, "{heading}")?;
    }

    writeln!(writer, "Conflicts may need to be manually resolved.")?;
    for (target, message) in errors {
        writeln!(writer, "\t{target}: {message}")?;
    }

    Ok(())
}

pub fn generate_not_found<W: Write>(use_colors: bool, writer: &mut W) -> Result<()> {
    if use_colors {
        writeln!(writer, "{}", "No revision found".red())?;
    } else {
        writeln!(writer, "No revision found")?;
    }

    Ok(())
}

/// List saved criteria, one table per group.
pub fn generate_criteria<W: Write>(groups: &[CriteriaGroup], use_colors: bool, writer: &mut W) -> Result<()> {
    if groups.is_empty() {
        writeln!(writer, "No saved criteria")?;
        return Ok(());
    }

    for (index, group) in groups.iter().enumerate() {
        if index > 0 {
            writeln!(writer)?;
        }

        if use_colors {
            writeln!(writer, "{}", group.name().bold())?;
        } else {
            writeln!(writer, "{}", group.name())?;
        }

        let rows: Vec<[String; 5]> = group.rules().iter().map(rule_row).collect();
        write_table(&rows, writer)?;
    }

    Ok(())
}

fn rule_row(rule: &BuildCheck) -> [String; 5] {
    [
        rule.patterns().join(", "),
        format_pct(rule.success_threshold()),
        format_pct(rule.run_threshold()),
        format_tasks(rule.successful_tasks()),
        format_tasks(rule.active_tasks()),
    ]
}

fn format_pct(threshold: Option<f64>) -> String {
    threshold.map_or_else(String::new, |t| format!("{:.1}", t * 100.0))
}

fn format_tasks(tasks: Option<&BTreeSet<String>>) -> String {
    tasks.map_or_else(String::new, |tasks| tasks.iter().map(String::as_str).collect::<Vec<_>>().join(", "))
}

fn write_table<W: Write>(rows: &[[String; 5]], writer: &mut W) -> Result<()> {
    let mut widths = CRITERIA_HEADERS.map(str::len);
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    write_row(CRITERIA_HEADERS.as_slice(), &widths, writer)?;
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    write_row(separator.as_slice(), &widths, writer)?;
    for row in rows {
        write_row(row.as_slice(), &widths, writer)?;
    }

    Ok(())
}

fn write_row<W: Write>(cells: &[impl AsRef<str>], widths: &[usize; 5], writer: &mut W) -> Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join(" | ");

    writeln!(writer, "  {}", line.trim_end())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::BuildCheckDef;

    fn info() -> RevisionInformation {
        RevisionInformation {
            revision: "abc123".to_string(),
            module_revisions: [
                ("enterprise".to_string(), "ent1".to_string()),
                ("wtdevelop".to_string(), "wt1".to_string()),
            ]
            .into_iter()
            .collect(),
            errors: BTreeMap::new(),
        }
    }

    fn rule(def: BuildCheckDef) -> BuildCheck {
        BuildCheck::new(def).unwrap()
    }

    fn task_set(tasks: &[&str]) -> Option<BTreeSet<String>> {
        Some(tasks.iter().map(ToString::to_string).collect())
    }

    #[test]
    fn test_revision_no_colors() {
        let mut output = String::new();
        generate_revision(&info(), false, &mut output).unwrap();
        insta::assert_snapshot!(output);
    }

    #[test]
    fn test_revision_colored() {
        let mut output = String::new();
        generate_revision(&info(), true, &mut output).unwrap();

        assert!(output.contains("\u{1b}["));
        assert!(output.contains("Found revision: abc123"));
    }

    #[test]
    fn test_transition_errors() {
        let errors: BTreeMap<String, String> = [
            ("BASE".to_string(), "Encountered error performing 'merge' on 'abc123'".to_string()),
            ("enterprise".to_string(), "Encountered error performing 'merge' on 'ent1'".to_string()),
        ]
        .into_iter()
        .collect();

        let mut output = String::new();
        generate_transition_errors(&errors, false, &mut output).unwrap();
        insta::assert_snapshot!(output);
    }

    #[test]
    fn test_no_transition_errors_prints_nothing() {
        let mut output = String::new();
        generate_transition_errors(&BTreeMap::new(), true, &mut output).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_not_found() {
        let mut output = String::new();
        generate_not_found(false, &mut output).unwrap();
        assert_eq!(output, "No revision found\n");
    }

    #[test]
    fn test_criteria_table() {
        let mut nightly = CriteriaGroup::new("nightly");
        nightly
            .add(
                rule(BuildCheckDef {
                    build_variant_name_patterns: vec![".*-required".to_string(), "windows".to_string()],
                    success_threshold: Some(0.95),
                    successful_tasks: task_set(&["lint", "compile"]),
                    ..BuildCheckDef::default()
                }),
                false,
            )
            .unwrap();
        nightly
            .add(
                rule(BuildCheckDef {
                    build_variant_name_patterns: vec!["^linux".to_string()],
                    run_threshold: Some(0.9),
                    active_tasks: task_set(&["jsCore"]),
                    ..BuildCheckDef::default()
                }),
                false,
            )
            .unwrap();

        let mut release = CriteriaGroup::new("release");
        release
            .add(
                rule(BuildCheckDef {
                    build_variant_name_patterns: vec!["^rhel.*".to_string()],
                    success_threshold: Some(1.0),
                    ..BuildCheckDef::default()
                }),
                false,
            )
            .unwrap();

        let mut output = String::new();
        generate_criteria(&[nightly, release], false, &mut output).unwrap();
        insta::assert_snapshot!(output);
    }

    #[test]
    fn test_no_criteria() {
        let mut output = String::new();
        generate_criteria(&[], false, &mut output).unwrap();
        assert_eq!(output, "No saved criteria\n");
    }
}
