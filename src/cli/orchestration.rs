//! The release workflow behind the command line
//!
//! Resolves options, shows the commit log, asks what to release and runs the
//! pipeline. Everything external comes in through [`Collaborators`], so the
//! whole flow can be driven by the in-memory mocks.

use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

use crate::config::{PartialConfig, ReleaseOptions, Settings};
use crate::domain::PackageManifest;
use crate::error::{LionpError, Result};
use crate::release_notes::{self, CommitLog};
use crate::task::{
    Collaborators, ExitAction, ExitCoordinator, ReleaseContext, ReleasePipeline, RollbackOutcome,
    StageReport,
};
use crate::ui::{self, Prompter};
use crate::version::{self, Version};
use crate::warning::ReleaseWarning;

/// Arguments for the release workflow
///
/// Mirrors the CLI args without depending on clap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseWorkflowArgs {
    /// Positional version argument
    pub version: Option<String>,

    /// Command-line flags, layered over the config file
    pub flags: PartialConfig,
}

/// What a finished release did
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseSummary {
    pub name: String,
    pub version: String,
    pub tag: String,
    pub preview: bool,
    pub draft_only: bool,
    pub warnings: Vec<ReleaseWarning>,
    pub reports: Vec<StageReport>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowResult {
    Released(ReleaseSummary),
    /// The user answered no to a confirmation
    Declined,
}

/// Exit coordinator of the release in progress, shared with the interrupt handler
pub type ExitSlot = Arc<Mutex<Option<Arc<ExitCoordinator>>>>;

fn lock_slot(slot: &ExitSlot) -> MutexGuard<'_, Option<Arc<ExitCoordinator>>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// Main release workflow
///
/// 1. Merge defaults, config file and flags into [`ReleaseOptions`]
/// 2. Print the commits since the last release
/// 3. Ask for confirmations, the version and the dist-tag as needed
/// 4. Run the stages, rolling back a failed publish
pub fn run_release(
    args: ReleaseWorkflowArgs,
    collaborators: Collaborators,
    manifest: PackageManifest,
    file_config: &PartialConfig,
    exit_slot: &ExitSlot,
) -> Result<WorkflowResult> {
    version::validate(&manifest.version)?;

    let settings = Settings::defaults(&manifest)
        .apply(file_config)
        .apply(&args.flags);
    let configured_version = settings.version.clone();
    let mut options = ReleaseOptions::resolve(
        settings,
        &manifest,
        collaborators.git.as_ref(),
        collaborators.registry.as_ref(),
    )?;
    debug!("resolved options: {:?}", options);

    let draft_only = options.release_draft_only;
    let given_version = if draft_only {
        Some(manifest.version.clone())
    } else {
        args.version.or(configured_version)
    };

    let warnings = collect_warnings(&options, &manifest);

    let tag_prefix = collaborators.package_manager.tag_version_prefix();
    let registry_url = collaborators.package_manager.registry_url(&manifest)?;
    let commit_log = release_notes::collect_commit_log(
        collaborators.git.as_ref(),
        options.repo_url.as_deref(),
        !draft_only,
        &options.branch,
        &tag_prefix,
    )?;

    ui::display_release_header(&manifest.name, &manifest.version, draft_only);
    ui::display_commit_log(&commit_log, &registry_url);

    let prompter = collaborators.prompter.as_ref();
    if !confirm_release(prompter, &commit_log, &options, &manifest)? {
        return Ok(WorkflowResult::Declined);
    }

    let input = match given_version {
        Some(input) => input,
        None => {
            let current = Version::parse(&manifest.version)?;
            let new_version = ui::select_version(prompter, &current)?;
            if options.run_publish
                && options.tag.is_none()
                && !manifest.private
                && version::needs_dist_tag(&manifest.version, &new_version)
            {
                let existing = collaborators.registry.prerelease_tags(&manifest.name)?;
                options.tag = Some(ui::select_dist_tag(prompter, &existing)?);
            }
            new_version
        }
    };

    let preview = options.preview;
    let mut ctx = ReleaseContext::new(options, manifest, input, collaborators);
    ctx.release_notes = Some(commit_log.notes);
    ctx.warnings = warnings;

    let exit = Arc::new(ctx.exit_coordinator());
    *lock_slot(exit_slot) = Some(exit.clone());

    println!();
    let result = ReleasePipeline::standard().run(&mut ctx, ui::display_stage);

    report_exit(&exit.on_exit());
    *lock_slot(exit_slot) = None;
    let reports = result?;

    Ok(WorkflowResult::Released(ReleaseSummary {
        name: ctx.manifest.name.clone(),
        version: ctx.new_version()?,
        tag: ctx.tag()?.name,
        preview,
        draft_only,
        warnings: ctx.warnings,
        reports,
    }))
}

fn collect_warnings(options: &ReleaseOptions, manifest: &PackageManifest) -> Vec<ReleaseWarning> {
    let mut warnings = Vec::new();
    if options.run_publish && manifest.files.is_none() && !manifest.has_npmignore() {
        warnings.push(ReleaseWarning::NoFilesAllowList);
    }
    if options.availability.unknown {
        warnings.push(ReleaseWarning::AvailabilityUnknown {
            package_name: manifest.name.clone(),
        });
    }
    warnings
}

/// Ask every confirmation the situation calls for; false if one is declined.
fn confirm_release(
    prompter: &dyn Prompter,
    log: &CommitLog,
    options: &ReleaseOptions,
    manifest: &PackageManifest,
) -> Result<bool> {
    if options.release_draft_only
        && log.has_unreleased_commits
        && !prompter.confirm(
            "Unreleased commits found. They won't be included in the release draft. Continue?",
            false,
        )?
    {
        return Ok(false);
    }

    if !options.release_draft_only
        && !log.has_commits
        && !prompter.confirm("No commits found since previous release, continue?", false)?
    {
        return Ok(false);
    }

    if options.availability.unknown
        && options.run_publish
        && manifest.is_scoped()
        && !prompter.confirm(
            &format!(
                "Failed to check availability of scoped repo name {}. Do you want to try and publish it anyway?",
                manifest.name
            ),
            false,
        )?
    {
        return Ok(false);
    }

    Ok(true)
}

/// Tell the user what the exit hook did
pub fn report_exit(action: &ExitAction) {
    match action {
        ExitAction::Clean | ExitAction::RolledBack(RollbackOutcome::AlreadyRun) => {}
        ExitAction::RolledBack(outcome @ RollbackOutcome::Failed(_)) => {
            ui::display_error(&outcome.to_string())
        }
        ExitAction::RolledBack(outcome) => ui::display_success(&outcome.to_string()),
        ExitAction::Aborted => ui::display_error("Aborted!"),
    }
}

/// Run the exit hook of the release in progress on Ctrl-C, then exit with 0.
pub fn install_interrupt_handler(exit_slot: ExitSlot) -> Result<()> {
    ctrlc::set_handler(move || {
        let coordinator = lock_slot(&exit_slot).clone();
        match coordinator {
            Some(coordinator) => report_exit(&coordinator.on_exit()),
            None => report_exit(&ExitAction::Aborted),
        }
        std::process::exit(0);
    })
    .map_err(|e| LionpError::external(format!("Could not install the interrupt handler: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;
    use crate::github::RecordingOpener;
    use crate::package_manager::MockPackageManager;
    use crate::registry::MockRegistry;
    use crate::ui::ScriptedPrompter;

    struct Setup {
        git: Arc<MockRepository>,
        registry: Arc<MockRegistry>,
        prompter: Arc<ScriptedPrompter>,
        manifest: PackageManifest,
    }

    impl Setup {
        fn new(git: MockRepository, registry: MockRegistry, prompter: ScriptedPrompter) -> Self {
            Setup {
                git: Arc::new(git),
                registry: Arc::new(registry),
                prompter: Arc::new(prompter),
                manifest: PackageManifest::parse(
                    r#"{"name": "@scope/pkg", "version": "1.0.0", "files": ["dist"]}"#,
                )
                .unwrap(),
            }
        }

        fn run(&self, args: ReleaseWorkflowArgs) -> Result<WorkflowResult> {
            let collaborators = Collaborators {
                git: self.git.clone(),
                registry: self.registry.clone(),
                package_manager: Arc::new(MockPackageManager::new("1.0.0").linked_to(self.git.clone())),
                prompter: self.prompter.clone(),
                opener: Arc::new(RecordingOpener::new()),
            };
            run_release(
                args,
                collaborators,
                self.manifest.clone(),
                &PartialConfig::default(),
                &ExitSlot::default(),
            )
        }
    }

    fn released_repo() -> MockRepository {
        MockRepository::new()
            .with_commit("aaaaaaa", "1.0.0")
            .with_tag("v1.0.0")
            .with_commit("bbbbbbb", "Fix typo")
    }

    #[test]
    fn test_declining_without_commits() {
        let setup = Setup::new(
            MockRepository::new().with_commit("aaaaaaa", "1.0.0").with_tag("v1.0.0"),
            MockRegistry::new(),
            ScriptedPrompter::new().answer_confirm(false),
        );
        let result = setup
            .run(ReleaseWorkflowArgs {
                version: Some("patch".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(result, WorkflowResult::Declined);
        assert_eq!(
            setup.prompter.prompts(),
            vec!["No commits found since previous release, continue?"]
        );
        assert!(setup.registry.published().is_empty());
    }

    #[test]
    fn test_scoped_name_with_unknown_availability_is_confirmed() {
        let setup = Setup::new(
            released_repo(),
            MockRegistry::new().with_availability(false, true),
            ScriptedPrompter::new().answer_confirm(false),
        );
        let result = setup
            .run(ReleaseWorkflowArgs {
                version: Some("patch".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(result, WorkflowResult::Declined);
        assert!(setup.prompter.prompts()[0].starts_with("Failed to check availability of scoped repo name @scope/pkg."));
    }

    #[test]
    fn test_interactive_prerelease_asks_for_dist_tag() {
        let setup = Setup::new(
            released_repo(),
            MockRegistry::new().with_dist_tags(&["beta"]),
            ScriptedPrompter::new()
                // prepatch
                .answer_select(3)
                .answer_select(0),
        );
        let result = setup.run(ReleaseWorkflowArgs::default()).unwrap();

        let summary = match result {
            WorkflowResult::Released(summary) => summary,
            other => panic!("unexpected result: {:?}", other),
        };
        assert_eq!(summary.version, "1.0.1-0");
        assert_eq!(summary.tag, "v1.0.1-0");
        assert_eq!(
            setup.registry.published()[0].tag.as_deref(),
            Some("beta")
        );
    }

    #[test]
    fn test_warnings_are_collected() {
        let setup = Setup::new(
            released_repo(),
            MockRegistry::new().with_availability(false, true),
            ScriptedPrompter::new().answer_confirm(true),
        );
        let result = setup
            .run(ReleaseWorkflowArgs {
                version: Some("minor".to_string()),
                ..Default::default()
            })
            .unwrap();
        match result {
            WorkflowResult::Released(summary) => {
                assert_eq!(
                    summary.warnings,
                    vec![ReleaseWarning::AvailabilityUnknown {
                        package_name: "@scope/pkg".to_string()
                    }]
                );
                assert!(!summary.preview);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
