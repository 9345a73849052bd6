//! Version-control abstraction layer
//!
//! The release flow only talks to git through the [VersionControl] trait.
//! Two implementations exist:
//!
//! - [repository::GitRepository]: local queries and ref edits through `git2`,
//!   network operations (fetch, push, ls-remote) through the `git` binary
//! - [mock::MockRepository]: in-memory state with a call log for tests
//!
//! ```rust
//! # use lionp::git::VersionControl;
//! # fn example(git: &dyn VersionControl) -> lionp::Result<()> {
//! if git.current_branch()? != git.default_branch()? {
//!     println!("not on the release branch");
//! }
//! # Ok(())
//! # }
//! ```

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::GitRepository;

use crate::error::Result;

/// One line of `git log --format='%s %h'`
#[derive(Debug, Clone, PartialEq)]
pub struct CommitInfo {
    /// Abbreviated commit id
    pub hash: String,
    /// Commit subject line
    pub message: String,
}

impl CommitInfo {
    pub fn new(hash: impl Into<String>, message: impl Into<String>) -> Self {
        CommitInfo {
            hash: hash.into(),
            message: message.into(),
        }
    }
}

/// Git operations needed to check, tag, push and roll back a release
///
/// All implementors must be `Send + Sync`: the rollback handler keeps a
/// handle that the interrupt handler may use from another thread.
pub trait VersionControl: Send + Sync {
    /// Short name of the checked out branch
    fn current_branch(&self) -> Result<String>;

    /// First of `main`, `master`, `gh-pages` that exists locally
    fn default_branch(&self) -> Result<String>;

    /// No staged, unstaged or untracked changes
    fn is_working_tree_clean(&self) -> Result<bool>;

    /// The upstream has commits that HEAD does not.
    ///
    /// A branch without upstream has not diverged.
    fn has_diverged_from_remote(&self) -> Result<bool>;

    /// The current branch tracks a remote branch of the same name
    fn has_upstream(&self) -> Result<bool>;

    /// `git fetch`
    fn fetch(&self) -> Result<()>;

    fn tag_exists(&self, name: &str) -> Result<bool>;

    fn delete_tag(&self, name: &str) -> Result<()>;

    /// Hard reset to the parent of HEAD
    fn reset_last_commit(&self) -> Result<()>;

    /// `git push --follow-tags`, or `git push --tags` when `follow_tags` is false
    fn push(&self, follow_tags: bool) -> Result<()>;

    /// Most recent tag reachable from HEAD, `None` when there is none
    fn latest_tag(&self) -> Result<Option<String>>;

    /// All tags, oldest first
    fn tag_list(&self) -> Result<Vec<String>>;

    /// Id of the root commit
    fn first_commit(&self) -> Result<String>;

    /// Commits in `revision..HEAD`, newest first
    fn log_since(&self, revision: &str) -> Result<Vec<CommitInfo>>;

    fn is_head_detached(&self) -> Result<bool>;

    /// Installed git version (`2.39.2`)
    fn version(&self) -> Result<String>;

    /// `origin` is reachable
    fn verify_remote(&self) -> Result<()>;
}
