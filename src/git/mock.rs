use std::sync::Mutex;

use crate::error::{LionpError, Result};
use crate::git::{CommitInfo, VersionControl};

/// In-memory repository state
#[derive(Debug, Clone)]
pub struct MockGitState {
    pub branch: String,
    pub local_branches: Vec<String>,
    pub clean: bool,
    pub diverged: bool,
    pub upstream: bool,
    pub detached: bool,
    /// Oldest first
    pub tags: Vec<String>,
    /// Newest first
    pub commits: Vec<CommitInfo>,
    pub first_commit: String,
    pub git_version: String,
    pub remote_error: Option<String>,
    /// Stderr returned by `push --follow-tags`, if it should fail
    pub push_error: Option<String>,
    pub calls: Vec<String>,
}

impl Default for MockGitState {
    fn default() -> Self {
        MockGitState {
            branch: "main".to_string(),
            local_branches: vec!["main".to_string()],
            clean: true,
            diverged: false,
            upstream: true,
            detached: false,
            tags: Vec::new(),
            commits: Vec::new(),
            first_commit: "0000000".to_string(),
            git_version: "2.39.2".to_string(),
            remote_error: None,
            push_error: None,
            calls: Vec::new(),
        }
    }
}

/// Mock repository for testing without actual git operations
///
/// Mutating operations edit the in-memory state and are recorded in a call
/// log as the git command line they stand for.
#[derive(Debug, Default)]
pub struct MockRepository {
    state: Mutex<MockGitState>,
}

impl MockRepository {
    /// Create a clean repository on `main` with an upstream
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branch(self, branch: &str) -> Self {
        self.update(|s| s.branch = branch.to_string());
        self
    }

    pub fn with_local_branches(self, branches: &[&str]) -> Self {
        self.update(|s| s.local_branches = branches.iter().map(|b| b.to_string()).collect());
        self
    }

    pub fn with_dirty_tree(self) -> Self {
        self.update(|s| s.clean = false);
        self
    }

    pub fn with_diverged_remote(self) -> Self {
        self.update(|s| s.diverged = true);
        self
    }

    pub fn without_upstream(self) -> Self {
        self.update(|s| s.upstream = false);
        self
    }

    pub fn with_tag(self, tag: &str) -> Self {
        self.update(|s| s.tags.push(tag.to_string()));
        self
    }

    /// Add a commit on top of HEAD
    pub fn with_commit(self, hash: &str, message: &str) -> Self {
        self.update(|s| s.commits.insert(0, CommitInfo::new(hash, message)));
        self
    }

    pub fn with_git_version(self, version: &str) -> Self {
        self.update(|s| s.git_version = version.to_string());
        self
    }

    pub fn with_push_error(self, stderr: &str) -> Self {
        self.update(|s| s.push_error = Some(stderr.to_string()));
        self
    }

    pub fn with_remote_error(self, stderr: &str) -> Self {
        self.update(|s| s.remote_error = Some(stderr.to_string()));
        self
    }

    /// What a version bump does: commit the new version and tag it
    pub fn record_version_commit(&self, tag: &str, version: &str) {
        self.update(|s| {
            let hash = format!("{:07x}", s.commits.len() + 1);
            s.commits.insert(0, CommitInfo::new(hash, version));
            s.tags.push(tag.to_string());
        });
    }

    /// Snapshot of the current state
    pub fn state(&self) -> MockGitState {
        self.lock().clone()
    }

    /// Recorded git command lines, in order
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockGitState> {
        // a panicking test must not hide the state from the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut MockGitState)) {
        f(&mut self.lock());
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

impl VersionControl for MockRepository {
    fn current_branch(&self) -> Result<String> {
        Ok(self.lock().branch.clone())
    }

    fn default_branch(&self) -> Result<String> {
        let state = self.lock();
        ["main", "master", "gh-pages"]
            .iter()
            .find(|b| state.local_branches.iter().any(|l| l == *b))
            .map(|b| b.to_string())
            .ok_or_else(|| {
                LionpError::precondition(
                    "Could not infer the default Git branch. Please specify one with the --branch flag or with a np config.",
                )
            })
    }

    fn is_working_tree_clean(&self) -> Result<bool> {
        Ok(self.lock().clean)
    }

    fn has_diverged_from_remote(&self) -> Result<bool> {
        Ok(self.lock().diverged)
    }

    fn has_upstream(&self) -> Result<bool> {
        Ok(self.lock().upstream)
    }

    fn fetch(&self) -> Result<()> {
        self.record("git fetch".to_string());
        Ok(())
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self.lock().tags.iter().any(|t| t == name))
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        self.record(format!("git tag --delete {}", name));
        let mut state = self.lock();
        let before = state.tags.len();
        state.tags.retain(|t| t != name);
        if state.tags.len() == before {
            return Err(LionpError::external(format!("tag '{}' not found.", name)));
        }
        Ok(())
    }

    fn reset_last_commit(&self) -> Result<()> {
        self.record("git reset --hard HEAD~1".to_string());
        let mut state = self.lock();
        if state.commits.is_empty() {
            return Err(LionpError::external("HEAD~1: unknown revision"));
        }
        state.commits.remove(0);
        Ok(())
    }

    fn push(&self, follow_tags: bool) -> Result<()> {
        let call = if follow_tags {
            "git push --follow-tags"
        } else {
            "git push --tags"
        };
        self.record(call.to_string());

        match (&self.lock().push_error, follow_tags) {
            (Some(stderr), true) => Err(LionpError::external_with_stderr(
                format!("Command failed with exit code 1: {}", call),
                stderr.clone(),
            )),
            _ => Ok(()),
        }
    }

    fn latest_tag(&self) -> Result<Option<String>> {
        Ok(self.lock().tags.last().cloned())
    }

    fn tag_list(&self) -> Result<Vec<String>> {
        Ok(self.lock().tags.clone())
    }

    fn first_commit(&self) -> Result<String> {
        Ok(self.lock().first_commit.clone())
    }

    /// Commits recorded after `revision`; everything for unknown revisions
    fn log_since(&self, revision: &str) -> Result<Vec<CommitInfo>> {
        let state = self.lock();
        // a version commit carries the version as message, which the tag names
        let stop = state
            .commits
            .iter()
            .position(|c| c.hash == revision || revision.ends_with(c.message.as_str()));
        let commits = match stop {
            Some(index) => state.commits[..index].to_vec(),
            None => state.commits.clone(),
        };
        Ok(commits)
    }

    fn is_head_detached(&self) -> Result<bool> {
        Ok(self.lock().detached)
    }

    fn version(&self) -> Result<String> {
        Ok(self.lock().git_version.clone())
    }

    fn verify_remote(&self) -> Result<()> {
        match &self.lock().remote_error {
            Some(stderr) => Err(LionpError::precondition(
                stderr.replace("fatal:", "Git fatal error:"),
            )),
            None => Ok(()),
        }
    }
}
