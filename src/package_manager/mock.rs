use std::sync::{Arc, Mutex};

use crate::domain::{PackageManifest, Tag};
use crate::error::{LionpError, Result};
use crate::git::MockRepository;
use crate::package_manager::{version_args, PackageManager};

#[derive(Debug, Clone)]
pub struct MockPackageManagerState {
    pub version: String,
    pub lockfile: bool,
    pub tag_prefix: String,
    pub registry_url: String,
    /// Scripts that exit non-zero
    pub failing_scripts: Vec<String>,
    pub calls: Vec<String>,
}

/// Mock pnpm.
///
/// When linked to a [`MockRepository`], a version bump also records the
/// version commit and tag there, as `pnpm version` does in a real checkout.
#[derive(Debug)]
pub struct MockPackageManager {
    state: Mutex<MockPackageManagerState>,
    git: Option<Arc<MockRepository>>,
}

impl MockPackageManager {
    pub fn new(version: &str) -> Self {
        MockPackageManager {
            state: Mutex::new(MockPackageManagerState {
                version: version.to_string(),
                lockfile: true,
                tag_prefix: "v".to_string(),
                registry_url: "https://registry.npmjs.org/".to_string(),
                failing_scripts: Vec::new(),
                calls: Vec::new(),
            }),
            git: None,
        }
    }

    pub fn linked_to(mut self, git: Arc<MockRepository>) -> Self {
        self.git = Some(git);
        self
    }

    pub fn without_lockfile(self) -> Self {
        self.lock().lockfile = false;
        self
    }

    pub fn with_tag_prefix(self, prefix: &str) -> Self {
        self.lock().tag_prefix = prefix.to_string();
        self
    }

    pub fn with_failing_script(self, script: &str) -> Self {
        self.lock().failing_scripts.push(script.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn state(&self) -> MockPackageManagerState {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockPackageManagerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

impl PackageManager for MockPackageManager {
    fn name(&self) -> &str {
        "pnpm"
    }

    fn has_lockfile(&self) -> bool {
        self.lock().lockfile
    }

    fn remove_dependencies(&self) -> Result<()> {
        self.record("rm -rf node_modules".to_string());
        Ok(())
    }

    fn install(&self) -> Result<()> {
        self.record("pnpm install --frozen-lockfile --production=false".to_string());
        Ok(())
    }

    fn run_script(&self, script: &str) -> Result<()> {
        let command = format!("pnpm run {}", script);
        self.record(command.clone());
        if self.lock().failing_scripts.iter().any(|s| s == script) {
            return Err(LionpError::external_with_stderr(
                format!("Command failed with exit code 1: {}", command),
                format!("ERR_PNPM_RECURSIVE_RUN_FIRST_FAIL {} failed", script),
            ));
        }
        Ok(())
    }

    fn bump_version(&self, version: &str, message: Option<&str>) -> Result<()> {
        self.record(format!("pnpm {}", version_args(version, message).join(" ")));
        let prefix = {
            let mut state = self.lock();
            state.version = version.to_string();
            state.tag_prefix.clone()
        };
        if let Some(git) = &self.git {
            git.record_version_commit(&Tag::for_version(&prefix, version).name, version);
        }
        Ok(())
    }

    fn current_version(&self) -> Result<String> {
        Ok(self.lock().version.clone())
    }

    fn tag_version_prefix(&self) -> String {
        self.lock().tag_prefix.clone()
    }

    fn registry_url(&self, _manifest: &PackageManifest) -> Result<String> {
        Ok(self.lock().registry_url.clone())
    }
}
