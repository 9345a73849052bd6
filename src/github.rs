//! GitHub release drafts and repository urls

use std::sync::{Mutex, OnceLock};

use log::debug;
use regex::Regex;

use crate::error::{LionpError, Result};

const KNOWN_HOSTS: [&str; 2] = ["github.com", "gitlab.com"];

fn url_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"^(?:git\+)?(?:https?|git|ssh)://(?:[^@/]+@)?(?P<host>[^/:]+)(?::\d+)?/(?P<path>[^#?]+?)(?:\.git)?/?(?:[#?].*)?$",
            )
            .ok()
        })
        .as_ref()
}

fn scp_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^(?:git\+ssh://)?[^@/]+@(?P<host>[^/:]+):(?P<path>[^#]+?)(?:\.git)?/?(?:#.*)?$")
                .ok()
        })
        .as_ref()
}

/// Browsable `https://host/owner/repo` for a github.com or gitlab.com remote.
///
/// Accepts `git+https://`, `https://`, `git://`, `ssh://`,
/// `git@host:owner/repo.git`, `github:owner/repo` and `owner/repo`.
pub fn repository_url_from_git(url: &str) -> Option<String> {
    let url = url.trim();

    if let Some(path) = url.strip_prefix("github:") {
        return Some(format!("https://github.com/{}", path.trim_end_matches(".git")));
    }
    if let Some(path) = url.strip_prefix("gitlab:") {
        return Some(format!("https://gitlab.com/{}", path.trim_end_matches(".git")));
    }

    let caps = url_pattern()
        .and_then(|re| re.captures(url))
        .or_else(|| scp_pattern().and_then(|re| re.captures(url)));

    if let Some(caps) = caps {
        let host = caps.name("host")?.as_str();
        if !KNOWN_HOSTS.contains(&host) {
            return None;
        }
        return Some(format!("https://{}/{}", host, &caps["path"]));
    }

    // npm's "owner/repo" shorthand means GitHub
    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() == 2 && parts.iter().all(|p| !p.is_empty() && !p.contains(':')) {
        return Some(format!("https://github.com/{}", url.trim_end_matches(".git")));
    }

    None
}

pub fn is_github(repo_url: &str) -> bool {
    repo_url.starts_with("https://github.com/")
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// URL of the "new release" form, prefilled with tag, notes and prerelease flag
pub fn new_release_url(repo_url: &str, tag: &str, body: &str, is_prerelease: bool) -> String {
    format!(
        "{}/releases/new?tag={}&body={}&prerelease={}",
        repo_url.trim_end_matches('/'),
        percent_encode(tag),
        percent_encode(body),
        is_prerelease
    )
}

/// Opens a release draft for the user
pub trait ReleaseDraftOpener: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Opens the draft in the default browser
pub struct BrowserOpener;

impl ReleaseDraftOpener for BrowserOpener {
    fn open(&self, url: &str) -> Result<()> {
        debug!("opening {}", url);
        open::that(url)
            .map_err(|e| LionpError::external(format!("Could not open the release draft: {}", e)))
    }
}

/// Keeps opened urls instead of launching a browser
#[derive(Debug, Default)]
pub struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ReleaseDraftOpener for RecordingOpener {
    fn open(&self, url: &str) -> Result<()> {
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_url_forms() {
        let expected = Some("https://github.com/owner/repo".to_string());
        for url in [
            "git+https://github.com/owner/repo.git",
            "https://github.com/owner/repo",
            "https://github.com/owner/repo.git",
            "git://github.com/owner/repo.git",
            "ssh://git@github.com/owner/repo.git",
            "git+ssh://git@github.com/owner/repo.git",
            "git@github.com:owner/repo.git",
            "github:owner/repo",
            "owner/repo",
        ] {
            assert_eq!(repository_url_from_git(url), expected, "{}", url);
        }
    }

    #[test]
    fn test_gitlab_urls() {
        assert_eq!(
            repository_url_from_git("git@gitlab.com:group/sub/project.git").as_deref(),
            Some("https://gitlab.com/group/sub/project")
        );
        assert_eq!(
            repository_url_from_git("https://gitlab.com/group/project").as_deref(),
            Some("https://gitlab.com/group/project")
        );
    }

    #[test]
    fn test_unknown_hosts() {
        assert_eq!(repository_url_from_git("https://example.com/owner/repo.git"), None);
        assert_eq!(repository_url_from_git("not a url"), None);
    }

    #[test]
    fn test_is_github() {
        assert!(is_github("https://github.com/owner/repo"));
        assert!(!is_github("https://gitlab.com/owner/repo"));
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode("v1.0.0-beta.1"), "v1.0.0-beta.1");
        assert_eq!(percent_encode("a b&c"), "a%20b%26c");
        assert_eq!(percent_encode("- fix\n"), "-%20fix%0A");
        assert_eq!(percent_encode("é"), "%C3%A9");
    }

    #[test]
    fn test_new_release_url() {
        let url = new_release_url("https://github.com/owner/repo", "v1.0.1", "- Fix bug  abc1234", false);
        assert_eq!(
            url,
            "https://github.com/owner/repo/releases/new?tag=v1.0.1&body=-%20Fix%20bug%20%20abc1234&prerelease=false"
        );
    }

    #[test]
    fn test_recording_opener() {
        let opener = RecordingOpener::new();
        opener.open("https://example.com").unwrap();
        assert_eq!(opener.opened(), vec!["https://example.com"]);
    }
}
