//! Release settings: built-in defaults, config file and command-line flags
//!
//! Each source yields a [`PartialConfig`] with every key optional. They are
//! layered onto [`Settings::defaults`] in order of precedence (file, then
//! flags) with [`Settings::apply`]. [`ReleaseOptions::resolve`] then derives
//! the values that depend on the package and its repository.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::domain::PackageManifest;
use crate::error::{LionpError, Result};
use crate::git::VersionControl;
use crate::registry::{Availability, Registry};

/// Config files looked for in each directory, first match wins
pub const SEARCH_PLACES: [&str; 4] = [
    ".np-config.json",
    ".np-config.js",
    ".np-config.cjs",
    "package.json",
];

/// Key holding the configuration inside `package.json`
pub const PACKAGE_KEY: &str = "lionp";

/// One layer of configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialConfig {
    pub version: Option<String>,
    pub any_branch: Option<bool>,
    pub branch: Option<String>,
    pub cleanup: Option<bool>,
    pub tests: Option<bool>,
    /// Skip cleanup and tests
    pub yolo: Option<bool>,
    pub publish: Option<bool>,
    pub build: Option<bool>,
    pub preview: Option<bool>,
    pub tag: Option<String>,
    pub message: Option<String>,
    pub release_draft: Option<bool>,
    pub release_draft_only: Option<bool>,
    pub test_script: Option<String>,
    pub build_script: Option<String>,
    #[serde(rename = "2fa")]
    pub two_factor: Option<bool>,
    pub publish_scoped: Option<bool>,
    pub repo_url: Option<String>,
    pub git_cliff: Option<bool>,
}

/// Merged configuration, before anything is asked of git or the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub version: Option<String>,
    pub any_branch: bool,
    pub branch: Option<String>,
    pub cleanup: bool,
    /// `None` until set; then defaults to whether the test script exists
    pub tests: Option<bool>,
    pub publish: bool,
    pub build: bool,
    pub preview: bool,
    pub tag: Option<String>,
    pub message: Option<String>,
    pub release_draft: bool,
    pub release_draft_only: bool,
    pub test_script: String,
    pub build_script: String,
    pub two_factor: bool,
    pub publish_scoped: bool,
    pub repo_url: Option<String>,
    pub git_cliff: bool,
}

impl Settings {
    pub fn defaults(manifest: &PackageManifest) -> Self {
        Settings {
            version: None,
            any_branch: false,
            branch: None,
            cleanup: true,
            tests: None,
            publish: true,
            build: true,
            preview: false,
            tag: None,
            message: None,
            release_draft: true,
            release_draft_only: false,
            test_script: "test".to_string(),
            build_script: "build".to_string(),
            two_factor: true,
            publish_scoped: manifest.is_scoped(),
            repo_url: manifest.repository_url(),
            git_cliff: false,
        }
    }

    /// Override every field `layer` sets.
    pub fn apply(mut self, layer: &PartialConfig) -> Self {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        if layer.version.is_some() {
            self.version = layer.version.clone();
        }
        set(&mut self.any_branch, &layer.any_branch);
        if layer.branch.is_some() {
            self.branch = layer.branch.clone();
        }
        set(&mut self.cleanup, &layer.cleanup);
        if layer.tests.is_some() {
            self.tests = layer.tests;
        }
        set(&mut self.publish, &layer.publish);
        set(&mut self.build, &layer.build);
        set(&mut self.preview, &layer.preview);
        if layer.tag.is_some() {
            self.tag = layer.tag.clone();
        }
        if layer.message.is_some() {
            self.message = layer.message.clone();
        }
        set(&mut self.release_draft, &layer.release_draft);
        set(&mut self.release_draft_only, &layer.release_draft_only);
        set(&mut self.test_script, &layer.test_script);
        set(&mut self.build_script, &layer.build_script);
        set(&mut self.two_factor, &layer.two_factor);
        set(&mut self.publish_scoped, &layer.publish_scoped);
        if layer.repo_url.is_some() {
            self.repo_url = layer.repo_url.clone();
        }
        set(&mut self.git_cliff, &layer.git_cliff);

        if layer.yolo == Some(true) {
            self.cleanup = false;
            self.tests = Some(false);
        }
        self
    }
}

/// Everything the release flow needs to know up front.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseOptions {
    pub any_branch: bool,
    /// Release branch
    pub branch: String,
    pub cleanup: bool,
    pub tests: bool,
    pub run_publish: bool,
    pub run_build: bool,
    pub preview: bool,
    /// Dist-tag to publish under
    pub tag: Option<String>,
    /// Version commit message template, `%s` is the version
    pub message: Option<String>,
    pub release_draft: bool,
    pub release_draft_only: bool,
    pub test_script: String,
    pub build_script: String,
    pub two_factor: bool,
    pub publish_scoped: bool,
    pub repo_url: Option<String>,
    pub git_cliff: bool,
    pub availability: Availability,
}

impl ReleaseOptions {
    pub fn resolve(
        settings: Settings,
        manifest: &PackageManifest,
        git: &dyn VersionControl,
        registry: &dyn Registry,
    ) -> Result<Self> {
        let run_publish = !settings.release_draft_only && settings.publish && !manifest.private;
        let run_build = settings.build && manifest.has_script(&settings.build_script);
        let tests = settings
            .tests
            .unwrap_or_else(|| manifest.has_script(&settings.test_script));

        let branch = match settings.branch {
            Some(branch) => branch,
            None => git.default_branch()?,
        };

        let availability = if settings.publish {
            registry.is_name_available(&manifest.name, manifest.external_registry())
        } else {
            Availability::default()
        };

        Ok(ReleaseOptions {
            any_branch: settings.any_branch,
            branch,
            cleanup: settings.cleanup,
            tests,
            run_publish,
            run_build,
            preview: settings.preview,
            tag: settings.tag,
            message: settings.message,
            release_draft: settings.release_draft,
            release_draft_only: settings.release_draft_only,
            test_script: settings.test_script,
            build_script: settings.build_script,
            two_factor: settings.two_factor,
            publish_scoped: settings.publish_scoped,
            repo_url: settings.repo_url,
            git_cliff: settings.git_cliff,
            availability,
        })
    }
}

/// Find the configuration for the package at `package_root`.
///
/// Searches the package root and its ancestors, then the home directory.
pub fn load_config(package_root: &Path) -> Result<PartialConfig> {
    let home = dirs::home_dir();
    Ok(find_config(package_root, home.as_deref())?
        .map(|(_, config)| config)
        .unwrap_or_default())
}

/// First config found searching from `start` upward, then in `home`.
pub fn find_config(start: &Path, home: Option<&Path>) -> Result<Option<(PathBuf, PartialConfig)>> {
    for dir in start.ancestors().chain(home) {
        for place in SEARCH_PLACES {
            let path = dir.join(place);
            if !path.is_file() {
                continue;
            }
            if let Some(config) = read_config_file(&path)? {
                debug!("using configuration from {}", path.display());
                return Ok(Some((path, config)));
            }
        }
    }
    Ok(None)
}

/// Parse one config file. `package.json` without a `lionp` key yields `None`.
pub fn read_config_file(path: &Path) -> Result<Option<PartialConfig>> {
    let content = fs::read_to_string(path)?;
    let invalid = |e: serde_json::Error| {
        LionpError::config(format!("Invalid configuration in {}: {}", path.display(), e))
    };

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    match file_name {
        "package.json" => {
            let mut manifest: serde_json::Value = serde_json::from_str(&content)?;
            match manifest.get_mut(PACKAGE_KEY).map(serde_json::Value::take) {
                Some(value) => serde_json::from_value(value).map(Some).map_err(invalid),
                None => Ok(None),
            }
        }
        name if name.ends_with(".js") || name.ends_with(".cjs") => {
            let object = exported_object(&content).ok_or_else(|| {
                LionpError::config(format!(
                    "{} must export an object literal with `module.exports =` or `export default`",
                    path.display()
                ))
            })?;
            serde_json::from_str(object).map(Some).map_err(invalid)
        }
        _ => serde_json::from_str(&content).map(Some).map_err(invalid),
    }
}

/// The exported value of a JS config file, which must be JSON-compatible.
fn exported_object(source: &str) -> Option<&str> {
    let start = source
        .find("module.exports")
        .and_then(|i| source[i..].find('=').map(|j| i + j + 1))
        .or_else(|| {
            source
                .find("export default")
                .map(|i| i + "export default".len())
        })?;

    let value = source[start..].trim().trim_end_matches(';').trim_end();
    value.starts_with('{').then_some(value)
}
