//! User interface module - interaction (prompts) and formatting.
//!
//! Separates concerns:
//! - `formatter` - Output formatting
//! - `mock` - Scripted answers for tests
//! - This module - The [`Prompter`] seam and the release prompts built on it

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use crate::error::{LionpError, Result};
use crate::version::{self, Version, SEMVER_INCREMENTS};

pub mod formatter;
pub mod mock;

// Re-export formatter functions for convenience
pub use formatter::{
    display_commit_log, display_error, display_published, display_release_header, display_stage,
    display_status, display_success, display_warning, pretty_version_diff,
};
pub use mock::ScriptedPrompter;

/// Label of the free-form choice in selection lists
pub const OTHER_CHOICE: &str = "Other (specify)";

/// Everything the tool asks the user goes through here.
pub trait Prompter: Send + Sync {
    /// Index of the chosen item
    fn select(&self, message: &str, items: &[String], default: usize) -> Result<usize>;

    fn input(&self, message: &str) -> Result<String>;

    fn confirm(&self, message: &str, default: bool) -> Result<bool>;
}

/// Terminal prompts. Escape or Ctrl-C while prompting cancels the release.
#[derive(Debug, Default)]
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn select(&self, message: &str, items: &[String], default: usize) -> Result<usize> {
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .items(items)
            .default(default)
            .interact_opt()?
            .ok_or(LionpError::Cancelled)
    }

    fn input(&self, message: &str) -> Result<String> {
        Ok(Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .allow_empty(true)
            .interact_text()?)
    }

    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .default(default)
            .interact_opt()?
            .ok_or(LionpError::Cancelled)
    }
}

/// Why a custom version cannot be used, if it cannot
pub fn check_custom_version(current: &Version, input: &str) -> Option<String> {
    if !version::is_valid_input(input) {
        return Some(
            "Please specify a valid semver, for example, `1.2.3`. See https://semver.org"
                .to_string(),
        );
    }
    match current.new_version_from(input) {
        Ok(new) if !current.is_lower_than_or_equal_to(&new) => None,
        _ => Some(format!("Version must be greater than {}", current)),
    }
}

/// Why a custom dist-tag cannot be used, if it cannot
pub fn check_dist_tag(tag: &str) -> Option<String> {
    if tag.is_empty() {
        return Some("Please specify a tag, for example, `next`.".to_string());
    }
    if tag.eq_ignore_ascii_case("latest") {
        return Some(
            "It's not possible to publish pre-releases under the `latest` tag. Please specify something else, for example, `next`."
                .to_string(),
        );
    }
    None
}

/// Ask `message` until `check` accepts the answer.
fn input_until_valid(
    prompter: &dyn Prompter,
    message: &str,
    check: impl Fn(&str) -> Option<String>,
) -> Result<String> {
    loop {
        let answer = prompter.input(message)?.trim().to_string();
        match check(&answer) {
            None => return Ok(answer),
            Some(problem) => display_error(&problem),
        }
    }
}

/// Pick the next version from the increments or enter one.
///
/// Returns the new version, never a keyword.
pub fn select_version(prompter: &dyn Prompter, current: &Version) -> Result<String> {
    let mut items = SEMVER_INCREMENTS
        .iter()
        .map(|increment| {
            pretty_version_diff(current, *increment)
                .map(|diff| format!("{:<10} {}", increment.as_str(), diff))
        })
        .collect::<Result<Vec<_>>>()?;
    items.push(OTHER_CHOICE.to_string());

    let choice = prompter.select(
        "Select semver increment or specify new version",
        &items,
        0,
    )?;

    let input = match SEMVER_INCREMENTS.get(choice) {
        Some(increment) => increment.as_str().to_string(),
        None => input_until_valid(prompter, "Version", |answer| {
            check_custom_version(current, answer)
        })?,
    };
    Ok(current.new_version_from(&input)?.to_string())
}

/// Pick the dist-tag for a prerelease from the registry's existing tags.
pub fn select_dist_tag(prompter: &dyn Prompter, existing: &[String]) -> Result<String> {
    let mut items = existing.to_vec();
    items.push(OTHER_CHOICE.to_string());

    let choice = prompter.select(
        "How should this pre-release version be tagged in npm?",
        &items,
        0,
    )?;

    match existing.get(choice) {
        Some(tag) => Ok(tag.clone()),
        None => input_until_valid(prompter, "Tag", check_dist_tag),
    }
}
