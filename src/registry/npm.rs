use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;

use crate::error::{LionpError, Result};
use crate::exec::ExternalCommand;
use crate::registry::{
    enable_2fa_args, Availability, CollaboratorPermissions, PublishArgs, Registry,
};

/// Upper bound for `npm ping`
pub const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(15);

/// The npm CLI.
///
/// Registry queries run `npm`; the publish itself runs through `publisher`
/// (the package manager) so workspace protocols get rewritten.
pub struct NpmRegistry {
    root: PathBuf,
    publisher: String,
}

impl NpmRegistry {
    pub fn new(root: &Path, publisher: impl Into<String>) -> Self {
        NpmRegistry {
            root: root.to_path_buf(),
            publisher: publisher.into(),
        }
    }

    fn npm(&self) -> ExternalCommand {
        ExternalCommand::new("npm").current_dir(&self.root)
    }
}

fn registry_args(registry: Option<&str>) -> Vec<String> {
    match registry {
        Some(url) => vec!["--registry".to_string(), url.to_string()],
        None => Vec::new(),
    }
}

/// Keys of `npm view --json <name> dist-tags`, minus `latest`.
pub fn parse_prerelease_tags(json: &str) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let mut tags: Vec<String> = value
        .as_object()
        .map(|tags| {
            tags.keys()
                .filter(|tag| tag.as_str() != "latest")
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    if tags.is_empty() {
        tags.push("next".to_string());
    }
    Ok(tags)
}

fn is_not_found(error: &LionpError) -> bool {
    error
        .stderr()
        .map(|stderr| stderr.contains("E404"))
        .unwrap_or(false)
}

impl Registry for NpmRegistry {
    fn check_connectivity(&self) -> Result<()> {
        match self
            .npm()
            .arg("ping")
            .run_with_timeout(CONNECTIVITY_TIMEOUT, "Connection to npm registry timed out")
        {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("timed out") => Err(e),
            Err(e) => {
                debug!("npm ping failed: {}", e);
                Err(LionpError::external("Connection to npm registry failed"))
            }
        }
    }

    fn version(&self) -> Result<String> {
        Ok(self.npm().arg("--version").run()?.stdout)
    }

    fn whoami(&self, registry: Option<&str>) -> Result<String> {
        let output = self
            .npm()
            .arg("whoami")
            .args(registry_args(registry))
            .run()
            .map_err(|e| {
                let needs_auth = e.stderr().map(|s| s.contains("ENEEDAUTH")).unwrap_or(false);
                LionpError::precondition(if needs_auth {
                    "You must be logged in. Use `npm login` and try again."
                } else {
                    "Authentication error. Use `npm whoami` to troubleshoot."
                })
            })?;
        Ok(output.stdout)
    }

    fn list_collaborators(
        &self,
        package_name: &str,
        registry: Option<&str>,
    ) -> Result<Option<CollaboratorPermissions>> {
        let result = self
            .npm()
            .args(["access", "ls-collaborators", package_name])
            .args(registry_args(registry))
            .run();

        match result {
            Ok(output) => Ok(Some(serde_json::from_str(&output.stdout)?)),
            // not published yet
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn is_name_available(&self, package_name: &str, registry: Option<&str>) -> Availability {
        let result = self
            .npm()
            .args(["view", package_name, "name"])
            .args(registry_args(registry))
            .run();

        match result {
            Ok(_) => Availability {
                available: false,
                unknown: false,
            },
            Err(e) if is_not_found(&e) => Availability {
                available: true,
                unknown: false,
            },
            Err(e) => {
                debug!("could not check availability of {}: {}", package_name, e);
                Availability {
                    available: false,
                    unknown: true,
                }
            }
        }
    }

    fn prerelease_tags(&self, package_name: &str) -> Result<Vec<String>> {
        let result = self
            .npm()
            .args(["view", "--json", package_name, "dist-tags"])
            .run();

        match result {
            Ok(output) => parse_prerelease_tags(&output.stdout),
            Err(e) if is_not_found(&e) => parse_prerelease_tags("{}"),
            Err(e) => Err(e),
        }
    }

    fn publish(&self, args: &PublishArgs) -> Result<()> {
        ExternalCommand::new(&self.publisher)
            .current_dir(&self.root)
            .args(args.to_args())
            .run()
            .map(|_| ())
    }

    fn enable_2fa(&self, package_name: &str, otp: Option<&str>) -> Result<()> {
        self.npm()
            .args(enable_2fa_args(package_name, otp))
            .run()
            .map(|_| ())
    }

    fn publish_command(&self, args: &PublishArgs) -> String {
        format!("{} {}", self.publisher, args.to_args().join(" "))
    }
}
