//! What to do when the process ends, normally or on an interrupt.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::task::rollback::{RollbackHandler, RollbackOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    Unknown,
    Success,
    Failed,
}

impl PublishStatus {
    fn to_u8(self) -> u8 {
        match self {
            PublishStatus::Unknown => 0,
            PublishStatus::Success => 1,
            PublishStatus::Failed => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => PublishStatus::Success,
            2 => PublishStatus::Failed,
            _ => PublishStatus::Unknown,
        }
    }
}

/// Shared publish status.
///
/// Written by the publish stage; read by the push stage and on exit, which
/// may happen on the interrupt handler's thread.
#[derive(Debug, Clone)]
pub struct PublishStatusHandle(Arc<AtomicU8>);

impl PublishStatusHandle {
    pub fn new(initial: PublishStatus) -> Self {
        PublishStatusHandle(Arc::new(AtomicU8::new(initial.to_u8())))
    }

    pub fn get(&self) -> PublishStatus {
        PublishStatus::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, status: PublishStatus) {
        self.0.store(status.to_u8(), Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExitAction {
    /// Nothing to report
    Clean,
    RolledBack(RollbackOutcome),
    /// Stopped before the outcome of the publish was known
    Aborted,
}

#[derive(Debug)]
pub struct ExitCoordinator {
    status: PublishStatusHandle,
    preview: bool,
    rollback: Arc<RollbackHandler>,
}

impl ExitCoordinator {
    pub fn new(status: PublishStatusHandle, preview: bool, rollback: Arc<RollbackHandler>) -> Self {
        ExitCoordinator {
            status,
            preview,
            rollback,
        }
    }

    /// Runs the rollback when the publish failed; blocks until it is done.
    pub fn on_exit(&self) -> ExitAction {
        if self.preview {
            return ExitAction::Clean;
        }
        match self.status.get() {
            PublishStatus::Failed => ExitAction::RolledBack(self.rollback.run()),
            PublishStatus::Success => ExitAction::Clean,
            PublishStatus::Unknown => ExitAction::Aborted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;
    use crate::package_manager::{MockPackageManager, PackageManager};

    fn coordinator(status: PublishStatus, preview: bool) -> (ExitCoordinator, Arc<MockRepository>) {
        let git = Arc::new(MockRepository::new().with_commit("aaaaaaa", "init"));
        let pm = Arc::new(MockPackageManager::new("1.0.0").linked_to(git.clone()));
        pm.bump_version("1.0.1", None).unwrap();

        let rollback = Arc::new(RollbackHandler::new(git.clone(), pm, "1.0.0", "v"));
        (
            ExitCoordinator::new(PublishStatusHandle::new(status), preview, rollback),
            git,
        )
    }

    #[test]
    fn test_status_handle_is_shared() {
        let handle = PublishStatusHandle::new(PublishStatus::Unknown);
        let clone = handle.clone();
        clone.set(PublishStatus::Failed);
        assert_eq!(handle.get(), PublishStatus::Failed);
    }

    #[test]
    fn test_failed_publish_rolls_back() {
        let (exit, git) = coordinator(PublishStatus::Failed, false);
        assert!(matches!(
            exit.on_exit(),
            ExitAction::RolledBack(RollbackOutcome::RolledBack { .. })
        ));
        assert!(git.state().tags.is_empty());

        assert_eq!(
            exit.on_exit(),
            ExitAction::RolledBack(RollbackOutcome::AlreadyRun)
        );
    }

    #[test]
    fn test_success_and_preview_are_clean() {
        let (exit, _) = coordinator(PublishStatus::Success, false);
        assert_eq!(exit.on_exit(), ExitAction::Clean);

        let (exit, git) = coordinator(PublishStatus::Failed, true);
        assert_eq!(exit.on_exit(), ExitAction::Clean);
        assert_eq!(git.state().tags, vec!["v1.0.1"]);
    }

    #[test]
    fn test_unknown_status_is_aborted() {
        let (exit, _) = coordinator(PublishStatus::Unknown, false);
        assert_eq!(exit.on_exit(), ExitAction::Aborted);
    }
}
