//! Checks run before anything is changed.
//!
//! The registry and tool checks only matter when publishing. The version
//! checks always run, so `--no-publish` still refuses a bad version.

use log::debug;

use crate::domain::Increment;
use crate::error::{LionpError, Result};
use crate::task::ReleaseContext;
use crate::version::{self, GIT_VERSION_RANGE, NPM_VERSION_RANGE};

pub struct Check {
    pub title: &'static str,
    enabled: fn(&ReleaseContext) -> bool,
    run: fn(&mut ReleaseContext) -> Result<()>,
}

fn publishing(ctx: &ReleaseContext) -> bool {
    ctx.options.run_publish
}

fn always(_: &ReleaseContext) -> bool {
    true
}

pub fn checks() -> [Check; 8] {
    [
        Check {
            title: "Ping npm registry",
            enabled: |ctx| {
                publishing(ctx) && !ctx.manifest.private && ctx.manifest.external_registry().is_none()
            },
            run: |ctx| ctx.collaborators.registry.check_connectivity(),
        },
        Check {
            title: "Check npm version",
            enabled: publishing,
            run: |ctx| {
                let installed = ctx.collaborators.registry.version()?;
                version::verify_requirement_satisfied("npm", &installed, NPM_VERSION_RANGE)
            },
        },
        Check {
            title: "Verify user is authenticated",
            enabled: |ctx| publishing(ctx) && !ctx.manifest.private,
            run: verify_write_permission,
        },
        Check {
            title: "Check git version",
            enabled: publishing,
            run: |ctx| {
                let installed = ctx.collaborators.git.version()?;
                version::verify_requirement_satisfied("git", &installed, GIT_VERSION_RANGE)
            },
        },
        Check {
            title: "Check git remote",
            enabled: publishing,
            run: |ctx| ctx.collaborators.git.verify_remote(),
        },
        Check {
            title: "Validate version",
            enabled: always,
            run: validate_version,
        },
        Check {
            title: "Check for pre-release version",
            enabled: always,
            run: check_prerelease_tag,
        },
        Check {
            title: "Check git tag existence",
            enabled: always,
            run: check_tag_is_new,
        },
    ]
}

pub fn run_checks(ctx: &mut ReleaseContext) -> Result<()> {
    for check in checks() {
        if !(check.enabled)(ctx) {
            continue;
        }
        debug!("prerequisite: {}", check.title);
        (check.run)(ctx)?;
    }
    Ok(())
}

fn verify_write_permission(ctx: &mut ReleaseContext) -> Result<()> {
    let registry = ctx.manifest.external_registry();
    let username = ctx.collaborators.registry.whoami(registry)?;

    let collaborators = match ctx
        .collaborators
        .registry
        .list_collaborators(&ctx.manifest.name, registry)?
    {
        Some(collaborators) => collaborators,
        // never published: anyone may claim it
        None => return Ok(()),
    };

    let can_write = collaborators
        .get(&username)
        .map(|permission| permission.contains("write"))
        .unwrap_or(false);
    if !can_write {
        return Err(LionpError::precondition(
            "You do not have write permissions required to publish this package.",
        ));
    }
    Ok(())
}

fn validate_version(ctx: &mut ReleaseContext) -> Result<()> {
    if !version::is_valid_input(&ctx.input) {
        return Err(LionpError::InvalidIncrement {
            input: ctx.input.clone(),
            allowed: Increment::keyword_list(),
        });
    }

    let new_version = version::get_new_version_from(&ctx.current_version, &ctx.input)?;
    if version::is_lower_than_or_equal_to(&ctx.current_version, &new_version)? {
        return Err(LionpError::precondition(format!(
            "New version `{}` should be higher than current version `{}`",
            new_version, ctx.current_version
        )));
    }

    ctx.new_version = Some(new_version);
    Ok(())
}

/// Prereleases, and releases leaving one, must not land on `latest` by accident.
fn check_prerelease_tag(ctx: &mut ReleaseContext) -> Result<()> {
    let new_version = ctx.new_version()?;
    if !ctx.manifest.private
        && version::needs_dist_tag(&ctx.current_version, &new_version)
        && ctx.options.tag.is_none()
    {
        return Err(LionpError::precondition(
            "You must specify a dist-tag using --tag when publishing a pre-release version. \
             This prevents accidentally tagging unstable versions as \"latest\". \
             https://docs.npmjs.com/cli/dist-tag",
        ));
    }
    Ok(())
}

fn check_tag_is_new(ctx: &mut ReleaseContext) -> Result<()> {
    let git = ctx.collaborators.git.clone();
    git.fetch()?;

    let tag = ctx.tag()?;
    if git.tag_exists(&tag.name)? {
        return Err(LionpError::precondition(format!(
            "Git tag `{}` already exists.",
            tag
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::stages::tests::{context, Fixture};

    #[test]
    fn test_all_checks_pass() {
        let fixture = Fixture::new("1.0.0");
        let mut ctx = context(&fixture, "patch", |_| {});
        run_checks(&mut ctx).unwrap();
        assert_eq!(ctx.new_version.as_deref(), Some("1.0.1"));
        assert_eq!(
            fixture.registry.calls(),
            vec!["npm ping", "npm whoami", "npm access ls-collaborators pkg"]
        );
        assert_eq!(fixture.git.calls(), vec!["git fetch"]);
    }

    #[test]
    fn test_invalid_input() {
        let fixture = Fixture::new("1.0.0");
        let mut ctx = context(&fixture, "1.0.0.0", |_| {});
        let err = run_checks(&mut ctx).unwrap_err();
        assert!(matches!(err, LionpError::InvalidIncrement { .. }));
    }

    #[test]
    fn test_version_must_increase() {
        let fixture = Fixture::new("1.0.0");
        let mut ctx = context(&fixture, "0.9.0", |_| {});
        assert_eq!(
            run_checks(&mut ctx).unwrap_err().to_string(),
            "New version `0.9.0` should be higher than current version `1.0.0`"
        );
    }

    #[test]
    fn test_prerelease_requires_tag() {
        let fixture = Fixture::new("1.0.0");
        let mut ctx = context(&fixture, "prerelease", |_| {});
        let err = run_checks(&mut ctx).unwrap_err();
        assert!(err.to_string().starts_with("You must specify a dist-tag"));

        let mut ctx = context(&fixture, "prerelease", |o| o.tag = Some("next".to_string()));
        assert!(run_checks(&mut ctx).is_ok());
    }

    #[test]
    fn test_leaving_prerelease_requires_tag() {
        let fixture = Fixture::new("1.0.0-beta");
        let mut ctx = context(&fixture, "major", |_| {});
        let err = run_checks(&mut ctx).unwrap_err();
        assert!(err.is_precondition());
        assert!(fixture.package_manager.calls().is_empty());
    }

    #[test]
    fn test_missing_write_permission() {
        let fixture = Fixture::with_registry(
            "1.0.0",
            crate::registry::MockRegistry::new().with_collaborator("someone-else", "read-write"),
        );
        let mut ctx = context(&fixture, "patch", |_| {});
        assert_eq!(
            run_checks(&mut ctx).unwrap_err().to_string(),
            "You do not have write permissions required to publish this package."
        );
    }

    #[test]
    fn test_existing_tag() {
        let fixture = Fixture::new("1.0.0");
        fixture.git.record_version_commit("v1.0.1", "1.0.1");
        let mut ctx = context(&fixture, "patch", |_| {});
        assert_eq!(
            run_checks(&mut ctx).unwrap_err().to_string(),
            "Git tag `v1.0.1` already exists."
        );
    }

    #[test]
    fn test_no_publish_skips_registry_checks() {
        let fixture = Fixture::with_registry("1.0.0", crate::registry::MockRegistry::new().unreachable());
        let mut ctx = context(&fixture, "minor", |o| o.run_publish = false);
        run_checks(&mut ctx).unwrap();
        assert!(fixture.registry.calls().is_empty());
    }
}
