use std::path::{Path, PathBuf};

use git2::{
    BranchType, DescribeFormatOptions, DescribeOptions, ErrorClass, ErrorCode,
    Repository as Git2Repo, ResetType, Sort, StatusOptions,
};
use log::debug;
use regex::Regex;

use crate::error::{LionpError, Result};
use crate::exec::ExternalCommand;
use crate::git::{CommitInfo, VersionControl};

const DEFAULT_BRANCH_CANDIDATES: [&str; 3] = ["main", "master", "gh-pages"];

/// Git access for a working directory.
///
/// The libgit2 handle is opened per call, so the value itself is plain data
/// and can be shared across threads.
pub struct GitRepository {
    root: PathBuf,
}

impl GitRepository {
    /// Discover the repository containing `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path.as_ref())?;
        let root = repo
            .workdir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.as_ref().to_path_buf());

        Ok(GitRepository { root })
    }

    fn repo(&self) -> Result<Git2Repo> {
        Ok(Git2Repo::discover(&self.root)?)
    }

    fn git(&self) -> ExternalCommand {
        ExternalCommand::new("git").current_dir(&self.root)
    }
}

fn short_id(object: &git2::Object<'_>) -> Result<String> {
    let buf = object.short_id()?;
    Ok(buf.as_str().unwrap_or_default().to_string())
}

/// Parse `git version 2.39.2 (Apple Git-143)` down to `2.39.2`.
pub fn parse_git_version(output: &str) -> Option<String> {
    let re = Regex::new(r"git version (\d+\.\d+\.\d+)").ok()?;
    re.captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

impl VersionControl for GitRepository {
    fn current_branch(&self) -> Result<String> {
        let repo = self.repo()?;
        let head = repo.head()?;
        if !head.is_branch() {
            return Err(LionpError::precondition(
                "HEAD is detached. Check out the release branch first.",
            ));
        }
        Ok(head.shorthand().unwrap_or_default().to_string())
    }

    fn default_branch(&self) -> Result<String> {
        let repo = self.repo()?;
        for branch in DEFAULT_BRANCH_CANDIDATES {
            if repo.find_branch(branch, BranchType::Local).is_ok() {
                return Ok(branch.to_string());
            }
        }

        Err(LionpError::precondition(
            "Could not infer the default Git branch. Please specify one with the --branch flag or with a np config.",
        ))
    }

    fn is_working_tree_clean(&self) -> Result<bool> {
        let repo = self.repo()?;
        let mut options = StatusOptions::new();
        options
            .include_untracked(true)
            .include_ignored(false)
            .recurse_untracked_dirs(true);
        let statuses = repo.statuses(Some(&mut options))?;
        Ok(statuses.is_empty())
    }

    fn has_diverged_from_remote(&self) -> Result<bool> {
        let repo = self.repo()?;
        let head = repo.head()?;
        let Some(branch_name) = head.shorthand().filter(|_| head.is_branch()) else {
            return Ok(false);
        };
        let branch = repo.find_branch(branch_name, BranchType::Local)?;
        let upstream = match branch.upstream() {
            Ok(upstream) => upstream,
            // no remote configured
            Err(_) => return Ok(false),
        };

        let (Some(local), Some(remote)) = (branch.get().target(), upstream.get().target()) else {
            return Ok(false);
        };
        let (_ahead, behind) = repo.graph_ahead_behind(local, remote)?;
        debug!("{} is {} commit(s) behind its upstream", branch_name, behind);
        Ok(behind > 0)
    }

    fn has_upstream(&self) -> Result<bool> {
        let repo = self.repo()?;
        let head = repo.head()?;
        if !head.is_branch() {
            return Ok(false);
        }
        let branch_name = head.shorthand().unwrap_or_default().to_string();
        let branch = repo.find_branch(&branch_name, BranchType::Local)?;

        let upstream_name = match branch.upstream() {
            Ok(upstream) => upstream.name()?.map(str::to_string),
            Err(_) => None,
        };

        Ok(upstream_name
            .map(|name| name.ends_with(&format!("/{}", branch_name)))
            .unwrap_or(false))
    }

    fn fetch(&self) -> Result<()> {
        self.git().arg("fetch").run().map(|_| ())
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        let repo = self.repo()?;
        let found = match repo.find_reference(&format!("refs/tags/{}", name)) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        };
        found
    }

    fn delete_tag(&self, name: &str) -> Result<()> {
        debug!("deleting tag {}", name);
        self.repo()?.tag_delete(name)?;
        Ok(())
    }

    fn reset_last_commit(&self) -> Result<()> {
        let repo = self.repo()?;
        let head = repo.head()?.peel_to_commit()?;
        let parent = head.parent(0)?;
        debug!("resetting {} to {}", head.id(), parent.id());
        repo.reset(parent.as_object(), ResetType::Hard, None)?;
        Ok(())
    }

    fn push(&self, follow_tags: bool) -> Result<()> {
        let flag = if follow_tags { "--follow-tags" } else { "--tags" };
        self.git().args(["push", flag]).run().map(|_| ())
    }

    fn latest_tag(&self) -> Result<Option<String>> {
        let repo = self.repo()?;
        if repo.tag_names(None)?.is_empty() {
            return Ok(None);
        }

        let mut options = DescribeOptions::new();
        options.describe_tags();

        // tags exist but none is reachable from HEAD
        let describe = match repo.describe(&options) {
            Ok(describe) => describe,
            Err(e) if e.code() == ErrorCode::NotFound || e.class() == ErrorClass::Describe => {
                return Ok(None)
            }
            Err(e) => return Err(e.into()),
        };

        let mut format = DescribeFormatOptions::new();
        format.abbreviated_size(0);
        Ok(Some(describe.format(Some(&format))?))
    }

    fn tag_list(&self) -> Result<Vec<String>> {
        let repo = self.repo()?;
        let names = repo.tag_names(None)?;

        let mut tags = Vec::new();
        for name in names.iter().flatten() {
            let object = repo.revparse_single(&format!("refs/tags/{}", name))?;
            // annotated tags sort by tagger date, lightweight ones by commit date
            let time = match object.as_tag() {
                Some(tag) => tag
                    .tagger()
                    .map(|sig| sig.when().seconds())
                    .unwrap_or_default(),
                None => object.peel_to_commit()?.time().seconds(),
            };
            tags.push((time, name.to_string()));
        }

        tags.sort();
        Ok(tags.into_iter().map(|(_, name)| name).collect())
    }

    fn first_commit(&self) -> Result<String> {
        let repo = self.repo()?;
        let mut revwalk = repo.revwalk()?;
        revwalk.push_head()?;

        for oid in revwalk {
            let commit = repo.find_commit(oid?)?;
            if commit.parent_count() == 0 {
                return Ok(commit.id().to_string());
            }
        }

        Err(LionpError::precondition("The repository has no commits yet."))
    }

    fn log_since(&self, revision: &str) -> Result<Vec<CommitInfo>> {
        let repo = self.repo()?;
        let since = repo.revparse_single(revision)?.peel_to_commit()?;

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push_head()?;
        revwalk.hide(since.id())?;

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = repo.find_commit(oid?)?;
            commits.push(CommitInfo {
                hash: short_id(commit.as_object())?,
                message: commit.summary().unwrap_or_default().to_string(),
            });
        }

        Ok(commits)
    }

    fn is_head_detached(&self) -> Result<bool> {
        Ok(self.repo()?.head_detached()?)
    }

    fn version(&self) -> Result<String> {
        let output = ExternalCommand::new("git").arg("version").run()?;
        parse_git_version(&output.stdout).ok_or_else(|| {
            LionpError::external(format!("Could not read the git version from `{}`", output.stdout))
        })
    }

    fn verify_remote(&self) -> Result<()> {
        self.git()
            .args(["ls-remote", "origin", "HEAD"])
            .run()
            .map(|_| ())
            .map_err(|e| match e.stderr() {
                Some(stderr) => LionpError::precondition(stderr.replace("fatal:", "Git fatal error:")),
                None => e,
            })
    }
}
