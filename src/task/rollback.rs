use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::domain::Tag;
use crate::error::Result;
use crate::git::VersionControl;
use crate::package_manager::PackageManager;
use crate::ui::formatter::display_status;

#[derive(Debug, Clone, PartialEq)]
pub enum RollbackOutcome {
    /// The version tag and commit were removed
    RolledBack { tag: String },
    /// The latest tag is not the bump this run made
    Unchanged,
    /// Reported, never raised
    Failed(String),
    AlreadyRun,
}

impl fmt::Display for RollbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackOutcome::RolledBack { .. } | RollbackOutcome::Unchanged => {
                write!(f, "The project was rolled back to its previous state.")
            }
            RollbackOutcome::Failed(error) => write!(
                f,
                "Couldn't roll back because of the following error:\n{}",
                error
            ),
            RollbackOutcome::AlreadyRun => write!(f, "The project was already rolled back."),
        }
    }
}

/// Undoes a version bump at most once, whoever asks first.
///
/// A caller arriving while the rollback is in progress blocks until it has
/// finished, so the interrupt handler never exits mid-rollback.
pub struct RollbackHandler {
    in_progress: Mutex<()>,
    has_run: AtomicBool,
    git: Arc<dyn VersionControl>,
    package_manager: Arc<dyn PackageManager>,
    previous_version: String,
    tag_prefix: String,
}

impl RollbackHandler {
    pub fn new(
        git: Arc<dyn VersionControl>,
        package_manager: Arc<dyn PackageManager>,
        previous_version: impl Into<String>,
        tag_prefix: impl Into<String>,
    ) -> Self {
        RollbackHandler {
            in_progress: Mutex::new(()),
            has_run: AtomicBool::new(false),
            git,
            package_manager,
            previous_version: previous_version.into(),
            tag_prefix: tag_prefix.into(),
        }
    }

    pub fn has_run(&self) -> bool {
        self.has_run.load(Ordering::SeqCst)
    }

    /// Delete the latest tag and drop the last commit, if they are this run's
    /// version bump. Errors end up in the outcome.
    pub fn run(&self) -> RollbackOutcome {
        let _guard = self.in_progress.lock().unwrap_or_else(|e| e.into_inner());
        if self.has_run.swap(true, Ordering::SeqCst) {
            return RollbackOutcome::AlreadyRun;
        }
        display_status("Publish failed. Rolling back to the previous state…");

        match self.revert_version_bump() {
            Ok(Some(tag)) => RollbackOutcome::RolledBack { tag },
            Ok(None) => RollbackOutcome::Unchanged,
            Err(e) => RollbackOutcome::Failed(e.to_string()),
        }
    }

    fn revert_version_bump(&self) -> Result<Option<String>> {
        let latest = match self.git.latest_tag()? {
            Some(tag) => tag,
            None => return Ok(None),
        };
        let tagged_version = Tag::new(latest.as_str())
            .version_part(&self.tag_prefix)
            .to_string();
        let manifest_version = self.package_manager.current_version()?;

        // only undo a bump: the tag matches the manifest but not the old version
        if tagged_version != manifest_version || tagged_version == self.previous_version {
            debug!(
                "not rolling back: tag {} manifest {} previous {}",
                latest, manifest_version, self.previous_version
            );
            return Ok(None);
        }

        self.git.delete_tag(&latest)?;
        self.git.reset_last_commit()?;
        Ok(Some(latest))
    }
}

impl fmt::Debug for RollbackHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollbackHandler")
            .field("has_run", &self.has_run())
            .field("previous_version", &self.previous_version)
            .field("tag_prefix", &self.tag_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;
    use crate::package_manager::MockPackageManager;
    use crate::domain::PackageManifest;
    use std::thread;
    use std::time::Duration;

    /// Takes its time reading the manifest version
    struct SlowPackageManager {
        inner: Arc<MockPackageManager>,
        delay: Duration,
    }

    impl PackageManager for SlowPackageManager {
        fn name(&self) -> &str {
            self.inner.name()
        }
        fn has_lockfile(&self) -> bool {
            self.inner.has_lockfile()
        }
        fn remove_dependencies(&self) -> Result<()> {
            self.inner.remove_dependencies()
        }
        fn install(&self) -> Result<()> {
            self.inner.install()
        }
        fn run_script(&self, script: &str) -> Result<()> {
            self.inner.run_script(script)
        }
        fn bump_version(&self, version: &str, message: Option<&str>) -> Result<()> {
            self.inner.bump_version(version, message)
        }
        fn current_version(&self) -> Result<String> {
            thread::sleep(self.delay);
            self.inner.current_version()
        }
        fn tag_version_prefix(&self) -> String {
            self.inner.tag_version_prefix()
        }
        fn registry_url(&self, manifest: &PackageManifest) -> Result<String> {
            self.inner.registry_url(manifest)
        }
    }

    fn bumped() -> (Arc<MockRepository>, Arc<MockPackageManager>) {
        let git = Arc::new(
            MockRepository::new()
                .with_commit("aaaaaaa", "1.0.0")
                .with_tag("v1.0.0"),
        );
        let pm = Arc::new(MockPackageManager::new("1.0.0").linked_to(git.clone()));
        pm.bump_version("1.0.1", None).unwrap();
        (git, pm)
    }

    #[test]
    fn test_rolls_back_version_bump() {
        let (git, pm) = bumped();
        let handler = RollbackHandler::new(git.clone(), pm, "1.0.0", "v");

        assert_eq!(
            handler.run(),
            RollbackOutcome::RolledBack {
                tag: "v1.0.1".to_string()
            }
        );
        assert_eq!(git.state().tags, vec!["v1.0.0"]);
        assert_eq!(git.state().commits.len(), 1);
    }

    #[test]
    fn test_runs_at_most_once() {
        let (git, pm) = bumped();
        let handler = RollbackHandler::new(git.clone(), pm, "1.0.0", "v");

        assert!(matches!(handler.run(), RollbackOutcome::RolledBack { .. }));
        assert_eq!(handler.run(), RollbackOutcome::AlreadyRun);
        assert!(handler.has_run());

        let deletes = git
            .calls()
            .iter()
            .filter(|c| c.starts_with("git tag --delete"))
            .count();
        assert_eq!(deletes, 1);
    }

    #[test]
    fn test_concurrent_callers_roll_back_once() {
        let (git, pm) = bumped();
        let handler = Arc::new(RollbackHandler::new(git.clone(), pm, "1.0.0", "v"));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handler = handler.clone();
                thread::spawn(move || handler.run())
            })
            .collect();
        let outcomes: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();

        let rolled_back = outcomes
            .iter()
            .filter(|o| matches!(o, RollbackOutcome::RolledBack { .. }))
            .count();
        assert_eq!(rolled_back, 1);
        assert_eq!(git.calls().len(), 2);
    }

    #[test]
    fn test_late_caller_waits_for_rollback_in_progress() {
        let (git, pm) = bumped();
        let slow = Arc::new(SlowPackageManager {
            inner: pm,
            delay: Duration::from_millis(300),
        });
        let handler = Arc::new(RollbackHandler::new(git.clone(), slow, "1.0.0", "v"));

        let first = {
            let handler = handler.clone();
            thread::spawn(move || handler.run())
        };
        thread::sleep(Duration::from_millis(50));

        // returns only once the first rollback is complete
        assert_eq!(handler.run(), RollbackOutcome::AlreadyRun);
        assert_eq!(git.state().tags, vec!["v1.0.0"]);
        assert_eq!(git.state().commits.len(), 1);

        assert!(matches!(
            first.join().unwrap(),
            RollbackOutcome::RolledBack { .. }
        ));
    }

    #[test]
    fn test_leaves_unbumped_project_alone() {
        let git = Arc::new(
            MockRepository::new()
                .with_commit("aaaaaaa", "1.0.0")
                .with_tag("v1.0.0"),
        );
        let pm = Arc::new(MockPackageManager::new("1.0.0"));
        let handler = RollbackHandler::new(git.clone(), pm, "1.0.0", "v");

        assert_eq!(handler.run(), RollbackOutcome::Unchanged);
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_failure_is_reported() {
        let git = Arc::new(MockRepository::new().with_tag("v1.0.1"));
        let pm = Arc::new(MockPackageManager::new("1.0.1"));
        let handler = RollbackHandler::new(git, pm, "1.0.0", "v");

        // no commit to reset
        match handler.run() {
            RollbackOutcome::Failed(message) => assert!(message.contains("HEAD~1")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_outcome_messages() {
        assert_eq!(
            RollbackOutcome::Failed("boom".to_string()).to_string(),
            "Couldn't roll back because of the following error:\nboom"
        );
        assert_eq!(
            RollbackOutcome::Unchanged.to_string(),
            "The project was rolled back to its previous state."
        );
    }
}
