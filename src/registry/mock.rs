use std::sync::Mutex;

use crate::error::{LionpError, Result};
use crate::registry::{
    enable_2fa_args, Availability, CollaboratorPermissions, PublishArgs, Registry, OTP_MARKER,
};

#[derive(Debug, Clone)]
pub struct MockRegistryState {
    pub reachable: bool,
    pub cli_version: String,
    pub user: Option<String>,
    /// `None`: the package was never published
    pub collaborators: Option<CollaboratorPermissions>,
    pub availability: Availability,
    pub dist_tags: Vec<String>,
    /// OTP the registry insists on; `None` means no 2FA challenge
    pub required_otp: Option<String>,
    /// Stderr for a publish that fails for reasons other than OTP
    pub publish_error: Option<String>,
    pub published: Vec<PublishArgs>,
    pub calls: Vec<String>,
}

impl Default for MockRegistryState {
    fn default() -> Self {
        MockRegistryState {
            reachable: true,
            cli_version: "9.8.1".to_string(),
            user: Some("maintainer".to_string()),
            collaborators: None,
            availability: Availability::default(),
            dist_tags: Vec::new(),
            required_otp: None,
            publish_error: None,
            published: Vec::new(),
            calls: Vec::new(),
        }
    }
}

/// Mock registry recording every call
#[derive(Debug, Default)]
pub struct MockRegistry {
    state: Mutex<MockRegistryState>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable(self) -> Self {
        self.update(|s| s.reachable = false);
        self
    }

    pub fn with_cli_version(self, version: &str) -> Self {
        self.update(|s| s.cli_version = version.to_string());
        self
    }

    pub fn logged_out(self) -> Self {
        self.update(|s| s.user = None);
        self
    }

    pub fn with_collaborator(self, user: &str, permission: &str) -> Self {
        self.update(|s| {
            s.collaborators
                .get_or_insert_with(Default::default)
                .insert(user.to_string(), permission.to_string());
        });
        self
    }

    pub fn with_availability(self, available: bool, unknown: bool) -> Self {
        self.update(|s| s.availability = Availability { available, unknown });
        self
    }

    pub fn with_dist_tags(self, tags: &[&str]) -> Self {
        self.update(|s| s.dist_tags = tags.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn requiring_otp(self, otp: &str) -> Self {
        self.update(|s| s.required_otp = Some(otp.to_string()));
        self
    }

    pub fn failing_publish(self, stderr: &str) -> Self {
        self.update(|s| s.publish_error = Some(stderr.to_string()));
        self
    }

    pub fn state(&self) -> MockRegistryState {
        self.lock().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Publish calls that went through
    pub fn published(&self) -> Vec<PublishArgs> {
        self.lock().published.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockRegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn update(&self, f: impl FnOnce(&mut MockRegistryState)) {
        f(&mut self.lock());
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }

    fn check_otp(&self, command: &str, otp: Option<&str>) -> Result<()> {
        let required = self.lock().required_otp.clone();
        match required {
            Some(required) if otp != Some(required.as_str()) => {
                Err(LionpError::external_with_stderr(
                    format!("Command failed with exit code 1: {}", command),
                    format!("npm ERR! code EOTP\nnpm ERR! This operation requires a {}word", OTP_MARKER),
                ))
            }
            _ => Ok(()),
        }
    }
}

impl Registry for MockRegistry {
    fn check_connectivity(&self) -> Result<()> {
        self.record("npm ping".to_string());
        if self.lock().reachable {
            Ok(())
        } else {
            Err(LionpError::external("Connection to npm registry failed"))
        }
    }

    fn version(&self) -> Result<String> {
        Ok(self.lock().cli_version.clone())
    }

    fn whoami(&self, _registry: Option<&str>) -> Result<String> {
        self.record("npm whoami".to_string());
        self.lock().user.clone().ok_or_else(|| {
            LionpError::precondition("You must be logged in. Use `npm login` and try again.")
        })
    }

    fn list_collaborators(
        &self,
        package_name: &str,
        _registry: Option<&str>,
    ) -> Result<Option<CollaboratorPermissions>> {
        self.record(format!("npm access ls-collaborators {}", package_name));
        Ok(self.lock().collaborators.clone())
    }

    fn is_name_available(&self, _package_name: &str, _registry: Option<&str>) -> Availability {
        self.lock().availability
    }

    fn prerelease_tags(&self, _package_name: &str) -> Result<Vec<String>> {
        let tags = self.lock().dist_tags.clone();
        Ok(if tags.is_empty() {
            vec!["next".to_string()]
        } else {
            tags
        })
    }

    fn publish(&self, args: &PublishArgs) -> Result<()> {
        let command = self.publish_command(args);
        self.record(command.clone());
        self.check_otp(&command, args.otp.as_deref())?;

        let mut state = self.lock();
        if let Some(stderr) = &state.publish_error {
            return Err(LionpError::external_with_stderr(
                format!("Command failed with exit code 1: {}", command),
                stderr.clone(),
            ));
        }
        state.published.push(args.clone());
        Ok(())
    }

    fn enable_2fa(&self, package_name: &str, otp: Option<&str>) -> Result<()> {
        let command = format!("npm {}", enable_2fa_args(package_name, otp).join(" "));
        self.record(command.clone());
        self.check_otp(&command, otp)
    }

    fn publish_command(&self, args: &PublishArgs) -> String {
        format!("pnpm {}", args.to_args().join(" "))
    }
}
