//! Package manager access (pnpm)

pub mod mock;
pub mod pnpm;

pub use mock::MockPackageManager;
pub use pnpm::Pnpm;

use crate::domain::PackageManifest;
use crate::error::Result;

/// Package manager operations used by the release flow.
pub trait PackageManager: Send + Sync {
    /// Binary name, used in stage titles and preview output
    fn name(&self) -> &str;

    /// A lockfile exists next to the manifest
    fn has_lockfile(&self) -> bool;

    /// Delete `node_modules`
    fn remove_dependencies(&self) -> Result<()>;

    /// Install exactly what the lockfile pins, dev dependencies included
    fn install(&self) -> Result<()>;

    fn run_script(&self, script: &str) -> Result<()>;

    /// Commit the new version to the manifest and tag it.
    ///
    /// `message` is the commit message template; `%s` stands for the version.
    fn bump_version(&self, version: &str, message: Option<&str>) -> Result<()>;

    /// Version currently written in the manifest on disk
    fn current_version(&self) -> Result<String>;

    /// `tag-version-prefix` setting, `v` when unset
    fn tag_version_prefix(&self) -> String;

    /// Registry the package manager publishes to
    fn registry_url(&self, manifest: &PackageManifest) -> Result<String>;
}

/// `version <v> [--message <msg>]`
pub fn version_args(version: &str, message: Option<&str>) -> Vec<String> {
    let mut args = vec!["version".to_string(), version.to_string()];
    if let Some(message) = message {
        args.push("--message".to_string());
        args.push(message.to_string());
    }
    args
}

/// What `version_args` runs, with `%s` expanded as the tool would.
pub fn version_command_preview(name: &str, version: &str, message: Option<&str>) -> String {
    let mut preview = format!("{} version {}", name, version);
    if let Some(message) = message {
        preview.push_str(&format!(" --message '{}'", message.replace("%s", version)));
    }
    preview
}
