use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{LionpError, Result};
use crate::github;

pub const MANIFEST_FILE: &str = "package.json";

/// The `repository` field: either a bare url or `{ "type": ..., "url": ... }`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RepositoryField {
    Url(String),
    Detailed { url: String },
}

impl RepositoryField {
    pub fn url(&self) -> &str {
        match self {
            RepositoryField::Url(url) => url,
            RepositoryField::Detailed { url } => url,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PublishConfig {
    #[serde(default)]
    pub registry: Option<String>,
    #[serde(default)]
    pub directory: Option<String>,
}

/// The parts of `package.json` the release flow reads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub private: bool,

    #[serde(default)]
    pub scripts: BTreeMap<String, String>,

    #[serde(default)]
    pub files: Option<Vec<String>>,

    #[serde(default)]
    pub repository: Option<RepositoryField>,

    #[serde(default)]
    pub publish_config: Option<PublishConfig>,

    /// Directory holding the manifest
    #[serde(skip)]
    pub root: PathBuf,
}

impl PackageManifest {
    /// Parse manifest JSON; `root` is left empty.
    pub fn parse(json: &str) -> Result<Self> {
        let manifest: PackageManifest = serde_json::from_str(json)?;
        if manifest.name.is_empty() {
            return Err(LionpError::precondition(
                "The `package.json` file must contain a `name` field.",
            ));
        }
        Ok(manifest)
    }

    /// Read `package.json` from `dir`.
    pub fn read(dir: &Path) -> Result<Self> {
        let content = fs::read_to_string(dir.join(MANIFEST_FILE))?;
        let mut manifest = Self::parse(&content)?;
        manifest.root = dir.to_path_buf();
        Ok(manifest)
    }

    /// Read the nearest `package.json` at or above `start`.
    pub fn discover(start: &Path) -> Result<Self> {
        let root = package_root(start).ok_or_else(|| {
            LionpError::precondition(
                "No `package.json` found. Make sure the current directory is a valid package.",
            )
        })?;
        Self::read(&root)
    }

    pub fn is_scoped(&self) -> bool {
        self.name.starts_with('@') && self.name.contains('/')
    }

    /// Registry from `publishConfig.registry`, if the package targets one.
    pub fn external_registry(&self) -> Option<&str> {
        self.publish_config
            .as_ref()
            .and_then(|config| config.registry.as_deref())
    }

    pub fn has_script(&self, name: &str) -> bool {
        self.scripts.contains_key(name)
    }

    /// Browsable repository url derived from the `repository` field.
    pub fn repository_url(&self) -> Option<String> {
        self.repository
            .as_ref()
            .and_then(|repository| github::repository_url_from_git(repository.url()))
    }

    pub fn has_npmignore(&self) -> bool {
        self.root.join(".npmignore").is_file()
    }
}

/// Closest ancestor of `start` (inclusive) containing a `package.json`.
pub fn package_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(MANIFEST_FILE).is_file())
        .map(Path::to_path_buf)
}
