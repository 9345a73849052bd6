//! The release as an ordered list of stages.
//!
//! Every stage is a [`TaskStep`] with its own `enabled` and `skip`
//! predicates, so the list is built once and never edited. Predicates are
//! evaluated when the stage is reached, against the state earlier stages
//! left in the [`ReleaseContext`].

use std::fmt;

pub mod context;
pub mod exit;
pub mod pipeline;
pub mod prerequisite;
pub mod rollback;
pub mod stages;

pub use context::{Collaborators, ReleaseContext};
pub use exit::{ExitAction, ExitCoordinator, PublishStatus, PublishStatusHandle};
pub use pipeline::ReleasePipeline;
pub use rollback::{RollbackHandler, RollbackOutcome};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PrerequisiteCheck,
    GitCheck,
    Cleanup,
    Test,
    VersionBump,
    Build,
    Publish,
    Enable2FA,
    PushTags,
    ReleaseDraft,
}

impl Stage {
    pub const ALL: [Stage; 10] = [
        Stage::PrerequisiteCheck,
        Stage::GitCheck,
        Stage::Cleanup,
        Stage::Test,
        Stage::VersionBump,
        Stage::Build,
        Stage::Publish,
        Stage::Enable2FA,
        Stage::PushTags,
        Stage::ReleaseDraft,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Stage::PrerequisiteCheck => "Prerequisite check",
            Stage::GitCheck => "Git",
            Stage::Cleanup => "Cleanup",
            Stage::Test => "Running tests",
            Stage::VersionBump => "Bumping version",
            Stage::Build => "Running build",
            Stage::Publish => "Publishing package",
            Stage::Enable2FA => "Enabling two-factor authentication",
            Stage::PushTags => "Pushing tags",
            Stage::ReleaseDraft => "Creating release draft on GitHub",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    Completed,
    /// Reached but not run; the reason is shown to the user
    Skipped(String),
    /// Not part of this release
    Disabled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
}

impl StageReport {
    pub fn new(stage: Stage, outcome: StageOutcome) -> Self {
        StageReport { stage, outcome }
    }
}

/// A stage descriptor.
pub struct TaskStep {
    pub stage: Stage,
    pub enabled: fn(&ReleaseContext) -> bool,
    /// `Some(reason)` skips the action
    pub skip: fn(&ReleaseContext) -> Result<Option<String>>,
    pub action: fn(&mut ReleaseContext) -> Result<()>,
}

impl fmt::Debug for TaskStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStep").field("stage", &self.stage).finish()
    }
}
