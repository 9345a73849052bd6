use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::domain::{PackageManifest, DEFAULT_TAG_PREFIX};
use crate::error::Result;
use crate::exec::ExternalCommand;
use crate::package_manager::{version_args, PackageManager};

const LOCKFILE: &str = "pnpm-lock.yaml";

pub struct Pnpm {
    root: PathBuf,
}

impl Pnpm {
    /// `root` is the directory holding `package.json`
    pub fn new(root: &Path) -> Self {
        Pnpm {
            root: root.to_path_buf(),
        }
    }

    fn pnpm(&self) -> ExternalCommand {
        ExternalCommand::new("pnpm").current_dir(&self.root)
    }
}

impl PackageManager for Pnpm {
    fn name(&self) -> &str {
        "pnpm"
    }

    fn has_lockfile(&self) -> bool {
        self.root.join(LOCKFILE).is_file()
    }

    fn remove_dependencies(&self) -> Result<()> {
        let modules = self.root.join("node_modules");
        if modules.exists() {
            debug!("removing {}", modules.display());
            fs::remove_dir_all(&modules)?;
        }
        Ok(())
    }

    fn install(&self) -> Result<()> {
        self.pnpm()
            .args(["install", "--frozen-lockfile", "--production=false"])
            .run()
            .map(|_| ())
    }

    fn run_script(&self, script: &str) -> Result<()> {
        self.pnpm().args(["run", script]).run().map(|_| ())
    }

    fn bump_version(&self, version: &str, message: Option<&str>) -> Result<()> {
        self.pnpm().args(version_args(version, message)).run().map(|_| ())
    }

    fn current_version(&self) -> Result<String> {
        Ok(PackageManifest::read(&self.root)?.version)
    }

    fn tag_version_prefix(&self) -> String {
        match self.pnpm().args(["config", "get", "tag-version-prefix"]).run() {
            // pnpm prints "undefined" for unset keys
            Ok(output) if output.stdout != "undefined" => output.stdout,
            _ => DEFAULT_TAG_PREFIX.to_string(),
        }
    }

    fn registry_url(&self, manifest: &PackageManifest) -> Result<String> {
        let mut cmd = self.pnpm().args(["config", "get", "registry"]);
        if let Some(registry) = manifest.external_registry() {
            cmd = cmd.args(["--registry", registry]);
        }
        Ok(cmd.run()?.stdout)
    }
}
