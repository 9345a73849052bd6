use std::sync::Arc;

use crate::config::ReleaseOptions;
use crate::domain::{PackageManifest, Tag};
use crate::error::Result;
use crate::git::VersionControl;
use crate::github::ReleaseDraftOpener;
use crate::package_manager::PackageManager;
use crate::registry::{PublishArgs, Registry};
use crate::release_notes::ReleaseNotes;
use crate::task::exit::{ExitCoordinator, PublishStatus, PublishStatusHandle};
use crate::task::rollback::RollbackHandler;
use crate::ui::Prompter;
use crate::version;
use crate::warning::ReleaseWarning;

/// The external tools a release talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub git: Arc<dyn VersionControl>,
    pub registry: Arc<dyn Registry>,
    pub package_manager: Arc<dyn PackageManager>,
    pub prompter: Arc<dyn Prompter>,
    pub opener: Arc<dyn ReleaseDraftOpener>,
}

/// State shared by the stages of one release.
pub struct ReleaseContext {
    pub options: ReleaseOptions,
    pub manifest: PackageManifest,
    /// Increment keyword or explicit version
    pub input: String,
    pub current_version: String,
    /// Set once the version input has been validated
    pub new_version: Option<String>,
    pub tag_prefix: String,
    /// Last one-time password the registry accepted
    pub otp: Option<String>,
    pub publish_status: PublishStatusHandle,
    pub warnings: Vec<ReleaseWarning>,
    pub release_notes: Option<ReleaseNotes>,
    pub collaborators: Collaborators,
    pub rollback: Arc<RollbackHandler>,
    pub version_bumped: bool,
    pub published: bool,
}

impl ReleaseContext {
    pub fn new(
        options: ReleaseOptions,
        manifest: PackageManifest,
        input: impl Into<String>,
        collaborators: Collaborators,
    ) -> Self {
        let tag_prefix = collaborators.package_manager.tag_version_prefix();
        let current_version = manifest.version.clone();
        // nothing to publish counts as published
        let publish_status = PublishStatusHandle::new(if options.run_publish {
            PublishStatus::Unknown
        } else {
            PublishStatus::Success
        });
        let rollback = Arc::new(RollbackHandler::new(
            collaborators.git.clone(),
            collaborators.package_manager.clone(),
            current_version.as_str(),
            tag_prefix.as_str(),
        ));
        let new_version = options
            .release_draft_only
            .then(|| current_version.clone());

        ReleaseContext {
            options,
            manifest,
            input: input.into(),
            current_version,
            new_version,
            tag_prefix,
            otp: None,
            publish_status,
            warnings: Vec::new(),
            release_notes: None,
            collaborators,
            rollback,
            version_bumped: false,
            published: false,
        }
    }

    /// The version being released, computed from the input if not yet validated
    pub fn new_version(&self) -> Result<String> {
        match &self.new_version {
            Some(version) => Ok(version.clone()),
            None => version::get_new_version_from(&self.current_version, &self.input),
        }
    }

    pub fn tag(&self) -> Result<Tag> {
        Ok(Tag::for_version(&self.tag_prefix, &self.new_version()?))
    }

    pub fn publish_args(&self) -> PublishArgs {
        PublishArgs {
            tag: self.options.tag.clone(),
            otp: self.otp.clone(),
            public_access: self.options.publish_scoped,
        }
    }

    pub fn exit_coordinator(&self) -> ExitCoordinator {
        ExitCoordinator::new(
            self.publish_status.clone(),
            self.options.preview,
            self.rollback.clone(),
        )
    }

    pub fn is_on_github(&self) -> bool {
        self.options
            .repo_url
            .as_deref()
            .map(crate::github::is_github)
            .unwrap_or(false)
    }
}
