//! The standard release stages.

use log::debug;

use crate::error::{LionpError, Result};
use crate::github;
use crate::package_manager::version_command_preview;
use crate::registry::{enable_2fa_args, with_otp_retry};
use crate::release_notes;
use crate::task::exit::PublishStatus;
use crate::task::{prerequisite, ReleaseContext, Stage, TaskStep};
use crate::version;
use crate::warning::ReleaseWarning;

/// Marker GitHub puts in the rejection of a push to a protected branch
const BRANCH_PROTECTION_MARKER: &str = "GH006";

pub fn standard_steps() -> Vec<TaskStep> {
    vec![
        TaskStep {
            stage: Stage::PrerequisiteCheck,
            enabled: not_draft_only,
            skip: never,
            action: prerequisite::run_checks,
        },
        TaskStep {
            stage: Stage::GitCheck,
            enabled: not_draft_only,
            skip: never,
            action: check_git,
        },
        TaskStep {
            stage: Stage::Cleanup,
            enabled: |ctx| not_draft_only(ctx) && ctx.options.cleanup,
            skip: never,
            action: cleanup,
        },
        TaskStep {
            stage: Stage::Test,
            enabled: |ctx| not_draft_only(ctx) && ctx.options.tests,
            skip: never,
            action: |ctx| {
                let script = ctx.options.test_script.clone();
                ctx.collaborators.package_manager.run_script(&script)
            },
        },
        TaskStep {
            stage: Stage::VersionBump,
            enabled: not_draft_only,
            skip: preview_version_bump,
            action: bump_version,
        },
        TaskStep {
            stage: Stage::Build,
            enabled: |ctx| not_draft_only(ctx) && ctx.options.run_build,
            skip: never,
            action: build,
        },
        TaskStep {
            stage: Stage::Publish,
            enabled: |ctx| not_draft_only(ctx) && ctx.options.run_publish,
            skip: preview_publish,
            action: publish,
        },
        TaskStep {
            stage: Stage::Enable2FA,
            enabled: two_factor_applies,
            skip: preview_enable_2fa,
            action: enable_2fa,
        },
        TaskStep {
            stage: Stage::PushTags,
            enabled: not_draft_only,
            skip: skip_push,
            action: push_tags,
        },
        TaskStep {
            stage: Stage::ReleaseDraft,
            enabled: |ctx| ctx.options.release_draft && ctx.is_on_github(),
            skip: |ctx| {
                Ok(ctx.options.preview.then(|| {
                    "[Preview] GitHub Releases draft will not be opened in preview mode.".to_string()
                }))
            },
            action: create_release_draft,
        },
    ]
}

fn not_draft_only(ctx: &ReleaseContext) -> bool {
    !ctx.options.release_draft_only
}

fn never(_: &ReleaseContext) -> Result<Option<String>> {
    Ok(None)
}

fn preview_skip(ctx: &ReleaseContext, command: String) -> Option<String> {
    ctx.options
        .preview
        .then(|| format!("[Preview] Command not executed: {}.", command))
}

fn check_git(ctx: &mut ReleaseContext) -> Result<()> {
    let git = &ctx.collaborators.git;

    if !ctx.options.any_branch {
        let branch = &ctx.options.branch;
        if git.current_branch()? != *branch {
            return Err(LionpError::precondition(format!(
                "Not on `{}` branch. Use --any-branch to publish anyway, or set a different release branch using --branch.",
                branch
            )));
        }
    }

    if !git.is_working_tree_clean()? {
        return Err(LionpError::precondition(
            "Unclean working tree. Commit or stash changes first.",
        ));
    }

    if git.has_diverged_from_remote()? {
        return Err(LionpError::precondition(
            "Remote history differs. Please pull changes.",
        ));
    }
    Ok(())
}

fn cleanup(ctx: &mut ReleaseContext) -> Result<()> {
    let package_manager = &ctx.collaborators.package_manager;
    // without a lockfile a fresh install is the only way to be reproducible
    if !package_manager.has_lockfile() {
        package_manager.remove_dependencies()?;
    }
    package_manager.install()
}

fn preview_version_bump(ctx: &ReleaseContext) -> Result<Option<String>> {
    if !ctx.options.preview {
        return Ok(None);
    }
    let command = version_command_preview(
        ctx.collaborators.package_manager.name(),
        &ctx.new_version()?,
        ctx.options.message.as_deref(),
    );
    Ok(preview_skip(ctx, command))
}

fn bump_version(ctx: &mut ReleaseContext) -> Result<()> {
    let new_version = ctx.new_version()?;
    ctx.collaborators
        .package_manager
        .bump_version(&new_version, ctx.options.message.as_deref())?;
    ctx.version_bumped = true;
    Ok(())
}

fn build(ctx: &mut ReleaseContext) -> Result<()> {
    let script = ctx.options.build_script.clone();
    ctx.collaborators
        .package_manager
        .run_script(&script)
        .map_err(|e| {
            LionpError::external_with_stderr(
                format!("Build failed: {}", e),
                e.stderr().unwrap_or_default(),
            )
        })
}

fn preview_publish(ctx: &ReleaseContext) -> Result<Option<String>> {
    let command = ctx.collaborators.registry.publish_command(&ctx.publish_args());
    Ok(preview_skip(ctx, command))
}

fn publish(ctx: &mut ReleaseContext) -> Result<()> {
    let registry = ctx.collaborators.registry.clone();
    let prompter = ctx.collaborators.prompter.clone();
    let mut args = ctx.publish_args();

    let result = with_otp_retry(prompter.as_ref(), ctx.otp.clone(), |otp| {
        args.otp = otp.map(str::to_string);
        registry.publish(&args)
    });

    match result {
        Ok(otp) => {
            ctx.otp = otp;
            ctx.published = true;
            ctx.publish_status.set(PublishStatus::Success);
            Ok(())
        }
        Err(e) => {
            ctx.publish_status.set(PublishStatus::Failed);
            Err(LionpError::external_with_stderr(
                format!("Error publishing package:\n{}", e),
                e.stderr().unwrap_or_default(),
            ))
        }
    }
}

fn two_factor_applies(ctx: &ReleaseContext) -> bool {
    not_draft_only(ctx)
        && ctx.options.run_publish
        && (ctx.published || ctx.options.preview)
        && ctx.options.two_factor
        && ctx.options.availability.known_available()
        && !ctx.manifest.private
        && ctx.manifest.external_registry().is_none()
}

fn preview_enable_2fa(ctx: &ReleaseContext) -> Result<Option<String>> {
    let args = enable_2fa_args(&ctx.manifest.name, ctx.otp.as_deref());
    Ok(preview_skip(ctx, format!("npm {}", args.join(" "))))
}

fn enable_2fa(ctx: &mut ReleaseContext) -> Result<()> {
    let registry = ctx.collaborators.registry.clone();
    let prompter = ctx.collaborators.prompter.clone();
    let name = ctx.manifest.name.clone();

    ctx.otp = with_otp_retry(prompter.as_ref(), ctx.otp.clone(), |otp| {
        registry.enable_2fa(&name, otp)
    })?;
    Ok(())
}

fn skip_push(ctx: &ReleaseContext) -> Result<Option<String>> {
    if !ctx.collaborators.git.has_upstream()? {
        return Ok(Some("Upstream branch not found; not pushing.".to_string()));
    }
    if ctx.options.preview {
        return Ok(preview_skip(ctx, "git push --follow-tags".to_string()));
    }
    if ctx.options.run_publish && ctx.publish_status.get() == PublishStatus::Failed {
        return Ok(Some(
            "Couldn't publish package to npm; not pushing.".to_string(),
        ));
    }
    Ok(None)
}

/// Push commits and tags; on a protected GitHub branch push the tags alone.
fn push_tags(ctx: &mut ReleaseContext) -> Result<()> {
    let git = ctx.collaborators.git.clone();
    match git.push(true) {
        Ok(()) => Ok(()),
        Err(e)
            if ctx.is_on_github()
                && e.stderr()
                    .map(|stderr| stderr.contains(BRANCH_PROTECTION_MARKER))
                    .unwrap_or(false) =>
        {
            debug!("push rejected by branch protection, pushing tags only");
            git.push(false)?;
            ctx.warnings.push(ReleaseWarning::BranchProtection);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

fn create_release_draft(ctx: &mut ReleaseContext) -> Result<()> {
    let repo_url = match ctx.options.repo_url.clone() {
        Some(url) => url,
        None => return Ok(()),
    };
    let tag = ctx.tag()?;
    let new_version = ctx.new_version()?;

    let body = if ctx.options.git_cliff {
        release_notes::git_cliff_notes(&ctx.manifest.root)?
    } else {
        let notes = match &ctx.release_notes {
            Some(notes) => notes.clone(),
            None => {
                release_notes::collect_commit_log(
                    ctx.collaborators.git.as_ref(),
                    Some(&repo_url),
                    !ctx.options.release_draft_only,
                    &ctx.options.branch,
                    &ctx.tag_prefix,
                )?
                .notes
            }
        };
        notes.render(&tag.name)
    };

    let url = github::new_release_url(
        &repo_url,
        &tag.name,
        &body,
        version::is_prerelease(&new_version),
    );
    ctx.collaborators.opener.open(&url)
}
