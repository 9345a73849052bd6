//! Commit history since the last release and the notes built from it

use std::path::Path;

use crate::domain::Tag;
use crate::error::{LionpError, Result};
use crate::exec::ExternalCommand;
use crate::git::{CommitInfo, VersionControl};

/// Escape text for embedding in the release body
pub fn html_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Release notes: one line per commit plus a compare link
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseNotes {
    pub commits: Vec<CommitInfo>,
    /// Tag or commit the notes start from
    pub revision: String,
    pub repo_url: Option<String>,
}

impl ReleaseNotes {
    pub fn render(&self, next_tag: &str) -> String {
        let mut body = self
            .commits
            .iter()
            .map(|commit| format!("- {}  {}", html_escape(&commit.message), commit.hash))
            .collect::<Vec<_>>()
            .join("\n");

        if let Some(repo_url) = &self.repo_url {
            body.push_str(&format!(
                "\n\n{}/compare/{}...{}",
                repo_url, self.revision, next_tag
            ));
        }
        body
    }
}

/// Commits since the last release, as shown before asking for a version
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitLog {
    pub has_commits: bool,
    /// Commits after the latest release that a draft for it would not include
    pub has_unreleased_commits: bool,
    /// `<revision>...<branch or tag>`
    pub commit_range: String,
    pub notes: ReleaseNotes,
}

pub fn latest_tag_or_first_commit(git: &dyn VersionControl) -> Result<String> {
    match git.latest_tag()? {
        Some(tag) => Ok(tag),
        None => git.first_commit(),
    }
}

/// The tag before the latest one: where notes for the latest release start.
///
/// `None` when nothing was ever tagged.
pub fn previous_tag_or_first_commit(git: &dyn VersionControl) -> Result<Option<String>> {
    let tags = git.tag_list()?;
    if tags.is_empty() {
        return Ok(None);
    }
    if tags.len() == 1 {
        return git.first_commit().map(Some);
    }

    let previous = git
        .latest_tag()?
        .and_then(|latest| tags.iter().position(|t| *t == latest))
        .filter(|index| *index > 0)
        .map(|index| tags[index - 1].clone());

    match previous {
        Some(tag) => Ok(Some(tag)),
        None => git.first_commit().map(Some),
    }
}

/// Gather commits for the version prompt and the release notes.
///
/// With `from_latest_tag` the log covers everything since the latest tag
/// (a new release). Otherwise it covers the latest release itself, minus the
/// version commit and anything committed after it.
pub fn collect_commit_log(
    git: &dyn VersionControl,
    repo_url: Option<&str>,
    from_latest_tag: bool,
    release_branch: &str,
    tag_prefix: &str,
) -> Result<CommitLog> {
    let revision = if from_latest_tag {
        latest_tag_or_first_commit(git)?
    } else {
        previous_tag_or_first_commit(git)?
            .ok_or_else(|| LionpError::precondition("The package has not been published yet."))?
    };

    let mut commits = git.log_since(&revision)?;
    if commits.is_empty() {
        return Ok(CommitLog {
            commit_range: format!("{}...{}", revision, release_branch),
            notes: ReleaseNotes {
                commits,
                revision,
                repo_url: repo_url.map(str::to_string),
            },
            ..CommitLog::default()
        });
    }

    let mut commit_range = format!("{}...{}", revision, release_branch);
    let mut has_unreleased_commits = false;

    if !from_latest_tag {
        if let Some(latest) = git.latest_tag()? {
            let released_version = Tag::new(latest.as_str()).version_part(tag_prefix).to_string();
            let bump_index = commits.iter().position(|c| c.message == released_version);

            if matches!(bump_index, Some(index) if index > 0) {
                commit_range = format!("{}...{}", revision, latest);
                has_unreleased_commits = true;
            }
            if git.is_head_detached()? {
                commit_range = format!("{}...{}", revision, latest);
            }

            // drop unreleased commits and the version commit itself
            if let Some(index) = bump_index {
                commits.drain(..=index);
            }
        }
    }

    Ok(CommitLog {
        has_commits: true,
        has_unreleased_commits,
        commit_range,
        notes: ReleaseNotes {
            commits,
            revision,
            repo_url: repo_url.map(str::to_string),
        },
    })
}

/// Notes for the latest release generated by `git-cliff`
pub fn git_cliff_notes(root: &Path) -> Result<String> {
    Ok(ExternalCommand::new("git-cliff")
        .arg("--latest")
        .current_dir(root)
        .run()?
        .stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"Fix <script> & "quotes" 'too'"#),
            "Fix &lt;script&gt; &amp; &quot;quotes&quot; &#39;too&#39;"
        );
        assert_eq!(html_escape("plain"), "plain");
    }

    #[test]
    fn test_render_notes() {
        let notes = ReleaseNotes {
            commits: vec![
                CommitInfo::new("ccccccc", "Fix <bug>"),
                CommitInfo::new("bbbbbbb", "Add feature"),
            ],
            revision: "v1.0.0".to_string(),
            repo_url: Some("https://github.com/owner/repo".to_string()),
        };
        assert_eq!(
            notes.render("v1.0.1"),
            "- Fix &lt;bug&gt;  ccccccc\n- Add feature  bbbbbbb\n\nhttps://github.com/owner/repo/compare/v1.0.0...v1.0.1"
        );
    }

    #[test]
    fn test_render_without_repository() {
        let notes = ReleaseNotes {
            commits: vec![CommitInfo::new("aaaaaaa", "init")],
            revision: "0000000".to_string(),
            repo_url: None,
        };
        assert_eq!(notes.render("v0.1.0"), "- init  aaaaaaa");
    }

    #[test]
    fn test_log_since_latest_tag() {
        let git = MockRepository::new()
            .with_commit("aaaaaaa", "1.0.0")
            .with_tag("v1.0.0")
            .with_commit("bbbbbbb", "Add feature");

        let log = collect_commit_log(&git, None, true, "main", "v").unwrap();
        assert!(log.has_commits);
        assert!(!log.has_unreleased_commits);
        assert_eq!(log.commit_range, "v1.0.0...main");
        assert_eq!(log.notes.commits, vec![CommitInfo::new("bbbbbbb", "Add feature")]);
    }

    #[test]
    fn test_no_commits_since_release() {
        let git = MockRepository::new()
            .with_commit("aaaaaaa", "1.0.0")
            .with_tag("v1.0.0");

        let log = collect_commit_log(&git, None, true, "main", "v").unwrap();
        assert!(!log.has_commits);
        assert!(log.notes.commits.is_empty());
    }

    #[test]
    fn test_first_release_uses_first_commit() {
        let git = MockRepository::new().with_commit("aaaaaaa", "init");
        assert_eq!(latest_tag_or_first_commit(&git).unwrap(), "0000000");
        assert_eq!(previous_tag_or_first_commit(&git).unwrap(), None);
    }

    #[test]
    fn test_previous_tag() {
        let git = MockRepository::new().with_tag("v1.0.0").with_tag("v1.1.0");
        assert_eq!(
            previous_tag_or_first_commit(&git).unwrap().as_deref(),
            Some("v1.0.0")
        );

        let single = MockRepository::new().with_tag("v1.0.0");
        assert_eq!(
            previous_tag_or_first_commit(&single).unwrap().as_deref(),
            Some("0000000")
        );
    }

    #[test]
    fn test_draft_log_skips_unreleased_commits() {
        let git = MockRepository::new()
            .with_commit("aaaaaaa", "1.0.0")
            .with_tag("v1.0.0")
            .with_commit("bbbbbbb", "Add feature")
            .with_commit("ccccccc", "1.1.0")
            .with_tag("v1.1.0")
            .with_commit("ddddddd", "Work in progress");

        let log = collect_commit_log(
            &git,
            Some("https://github.com/owner/repo"),
            false,
            "main",
            "v",
        )
        .unwrap();

        assert!(log.has_unreleased_commits);
        assert_eq!(log.commit_range, "v1.0.0...v1.1.0");
        assert_eq!(log.notes.commits, vec![CommitInfo::new("bbbbbbb", "Add feature")]);
        assert!(log.notes.render("v1.1.0").ends_with("/compare/v1.0.0...v1.1.0"));
    }

    #[test]
    fn test_draft_log_requires_a_release() {
        let git = MockRepository::new().with_commit("aaaaaaa", "init");
        let err = collect_commit_log(&git, None, false, "main", "v").unwrap_err();
        assert_eq!(err.to_string(), "The package has not been published yet.");
    }
}
