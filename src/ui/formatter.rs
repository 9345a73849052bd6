//! Formatting functions for UI output.
//!
//! Everything printed to the terminal goes through here, styled with `console`.
//! The `format_*` functions return plain text so they can be tested.

use console::style;

use crate::domain::Increment;
use crate::error::Result;
use crate::release_notes::CommitLog;
use crate::task::{StageOutcome, StageReport};
use crate::version::Version;
use crate::warning::ReleaseWarning;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("✖").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a release warning to the user.
pub fn display_warning(warning: &ReleaseWarning) {
    eprintln!("\n{} {}", style("Warning:").yellow().bold(), warning);
}

/// One line per stage that ran, was skipped or failed. Disabled stages stay silent.
pub fn display_stage(report: &StageReport) {
    let title = report.stage.title();
    match &report.outcome {
        StageOutcome::Completed => println!("  {} {}", style("✔").green(), title),
        StageOutcome::Skipped(reason) => println!(
            "  {} {} {}",
            style("↓").yellow(),
            title,
            style(format!("[{}]", reason)).dim()
        ),
        StageOutcome::Failed(_) => println!("  {} {}", style("✖").red(), style(title).red()),
        StageOutcome::Disabled => {}
    }
}

/// Header shown before asking for a version.
pub fn format_release_header(name: &str, current_version: &str, draft_only: bool) -> String {
    if draft_only {
        format!(
            "Create a release draft on GitHub for {} (current: {})",
            name, current_version
        )
    } else {
        format!(
            "Publish a new version of {} (current: {})",
            name, current_version
        )
    }
}

pub fn display_release_header(name: &str, current_version: &str, draft_only: bool) {
    println!(
        "\n{}\n",
        style(format_release_header(name, current_version, draft_only)).bold()
    );
}

/// Commits since the last release, the compared range and the target registry.
pub fn format_commit_log(log: &CommitLog, registry_url: &str) -> String {
    let history = log
        .notes
        .commits
        .iter()
        .map(|commit| format!("- {}  {}", commit.message, commit.hash))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Commits:\n{}\n\nCommit Range:\n{}\n\nRegistry:\n{}",
        history, log.commit_range, registry_url
    )
}

pub fn display_commit_log(log: &CommitLog, registry_url: &str) {
    println!("{}\n", format_commit_log(log, registry_url));
}

/// Split `new` on dots and flag the parts worth highlighting against `old`:
/// the first changed part and every part carrying a prerelease.
pub fn version_diff(old: &str, new: &str) -> Vec<(String, bool)> {
    let old_parts: Vec<&str> = old.split('.').collect();
    let mut changed = false;

    new.split('.')
        .enumerate()
        .map(|(i, part)| {
            let highlight = if !changed && old_parts.get(i) != Some(&part) {
                changed = true;
                true
            } else {
                part.find('-').map(|at| at >= 1).unwrap_or(false)
            };
            (part.to_string(), highlight)
        })
        .collect()
}

/// `current` incremented by `increment`, with the changed part highlighted.
pub fn pretty_version_diff(current: &Version, increment: Increment) -> Result<String> {
    let new = current.increment(increment)?;
    let separator = style(".").dim().to_string();

    Ok(version_diff(&current.to_string(), &new.to_string())
        .into_iter()
        .map(|(part, highlight)| {
            if highlight {
                style(part).cyan().dim().to_string()
            } else {
                style(part).dim().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(&separator))
}

pub fn display_published(name: &str, version: &str) {
    println!("\n {} {} published 🎉", name, style(version).bold());
}
