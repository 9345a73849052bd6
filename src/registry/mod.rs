//! Package registry access (npm)
//!
//! [Registry] is the narrow interface the release flow uses for the registry:
//! connectivity, authentication, name availability, dist-tags, publishing and
//! enabling two-factor authentication. Publishing and 2FA may be rejected with
//! a one-time-password challenge; [with_otp_retry] turns that into an
//! interactive retry loop that ends on success or cancellation.

pub mod mock;
pub mod npm;

pub use mock::MockRegistry;
pub use npm::NpmRegistry;

use std::collections::BTreeMap;

use crate::error::{LionpError, Result};
use crate::ui::Prompter;

/// Marker npm prints on stderr when an OTP is required or was wrong
pub const OTP_MARKER: &str = "one-time pass";

/// Whether the package name can be claimed on the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Availability {
    pub available: bool,
    /// The registry could not be asked (network, scoped names on some registries)
    pub unknown: bool,
}

impl Availability {
    pub fn known_available(&self) -> bool {
        self.available && !self.unknown
    }
}

/// Arguments for `<publisher> publish`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishArgs {
    pub tag: Option<String>,
    pub otp: Option<String>,
    /// Scoped packages are private by default; publish them with `--access public`
    pub public_access: bool,
}

impl PublishArgs {
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["publish".to_string()];
        if let Some(tag) = &self.tag {
            args.push("--tag".to_string());
            args.push(tag.clone());
        }
        if let Some(otp) = &self.otp {
            args.push("--otp".to_string());
            args.push(otp.clone());
        }
        if self.public_access {
            args.push("--access".to_string());
            args.push("public".to_string());
        }
        args
    }
}

/// `npm access 2fa-required <name> [--otp <otp>]`
pub fn enable_2fa_args(package_name: &str, otp: Option<&str>) -> Vec<String> {
    let mut args = vec![
        "access".to_string(),
        "2fa-required".to_string(),
        package_name.to_string(),
    ];
    if let Some(otp) = otp {
        args.push("--otp".to_string());
        args.push(otp.to_string());
    }
    args
}

/// Collaborator name -> permission string (`read-write`, `read-only`)
pub type CollaboratorPermissions = BTreeMap<String, String>;

/// Registry operations used by the release flow.
pub trait Registry: Send + Sync {
    /// Ping the registry
    fn check_connectivity(&self) -> Result<()>;

    /// Version of the registry CLI
    fn version(&self) -> Result<String>;

    /// Logged-in user, against `registry` when given
    fn whoami(&self, registry: Option<&str>) -> Result<String>;

    /// Collaborators of a published package, `None` when it was never published
    fn list_collaborators(
        &self,
        package_name: &str,
        registry: Option<&str>,
    ) -> Result<Option<CollaboratorPermissions>>;

    /// Never fails: problems asking the registry yield `unknown`
    fn is_name_available(&self, package_name: &str, registry: Option<&str>) -> Availability;

    /// Existing dist-tags other than `latest`; `["next"]` when there are none
    fn prerelease_tags(&self, package_name: &str) -> Result<Vec<String>>;

    fn publish(&self, args: &PublishArgs) -> Result<()>;

    fn enable_2fa(&self, package_name: &str, otp: Option<&str>) -> Result<()>;

    /// Command line `publish` runs, for preview output
    fn publish_command(&self, args: &PublishArgs) -> String;
}

/// The registry asked for a one-time password (or rejected the one given)
pub fn is_otp_challenge(error: &LionpError) -> bool {
    match error {
        LionpError::OtpChallenge => true,
        other => other
            .stderr()
            .map(|stderr| stderr.contains(OTP_MARKER))
            .unwrap_or(false),
    }
}

/// Run `attempt`, prompting for an OTP each time the registry asks for one.
///
/// The first attempt uses `known_otp`. On an OTP challenge the user is asked
/// for a code (`Enter OTP:`, then `OTP was incorrect, try again:`) until the
/// attempt succeeds, the user enters nothing or cancels, or a non-OTP error
/// occurs. Returns the OTP that was last used so later calls can reuse it.
pub fn with_otp_retry<F>(
    prompter: &dyn Prompter,
    known_otp: Option<String>,
    mut attempt: F,
) -> Result<Option<String>>
where
    F: FnMut(Option<&str>) -> Result<()>,
{
    match attempt(known_otp.as_deref()) {
        Ok(()) => return Ok(known_otp),
        Err(e) if is_otp_challenge(&e) => {}
        Err(e) => return Err(e),
    }

    let mut message = "Enter OTP:";
    loop {
        let otp = prompter.input(message)?;
        let otp = otp.trim().to_string();
        if otp.is_empty() {
            return Err(LionpError::Cancelled);
        }

        match attempt(Some(&otp)) {
            Ok(()) => return Ok(Some(otp)),
            Err(e) if is_otp_challenge(&e) => message = "OTP was incorrect, try again:",
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::ScriptedPrompter;

    fn otp_error() -> LionpError {
        LionpError::external_with_stderr(
            "Command failed with exit code 1: pnpm publish",
            "npm ERR! code EOTP\nnpm ERR! This operation requires a one-time password from your authenticator.\nnpm ERR! You can provide a one-time password by passing --otp=<code>",
        )
    }

    #[test]
    fn test_publish_args() {
        assert_eq!(PublishArgs::default().to_args(), vec!["publish"]);

        let args = PublishArgs {
            tag: Some("beta".to_string()),
            otp: Some("123456".to_string()),
            public_access: true,
        };
        assert_eq!(
            args.to_args(),
            vec!["publish", "--tag", "beta", "--otp", "123456", "--access", "public"]
        );
    }

    #[test]
    fn test_enable_2fa_args() {
        assert_eq!(
            enable_2fa_args("pkg", None),
            vec!["access", "2fa-required", "pkg"]
        );
        assert_eq!(
            enable_2fa_args("pkg", Some("42")),
            vec!["access", "2fa-required", "pkg", "--otp", "42"]
        );
    }

    #[test]
    fn test_is_otp_challenge() {
        assert!(is_otp_challenge(&otp_error()));
        assert!(is_otp_challenge(&LionpError::OtpChallenge));
        assert!(!is_otp_challenge(&LionpError::external_with_stderr(
            "failed",
            "npm ERR! code E403"
        )));
        assert!(!is_otp_challenge(&LionpError::Cancelled));
    }

    #[test]
    fn test_otp_not_needed() {
        let prompter = ScriptedPrompter::new();
        let otp = with_otp_retry(&prompter, None, |_| Ok(())).unwrap();
        assert_eq!(otp, None);
        assert!(prompter.prompts().is_empty());
    }

    #[test]
    fn test_otp_retries_until_accepted() {
        let prompter = ScriptedPrompter::new()
            .answer_input("111111")
            .answer_input("222222");
        let mut seen = Vec::new();

        let otp = with_otp_retry(&prompter, None, |otp| {
            seen.push(otp.map(str::to_string));
            match otp {
                Some("222222") => Ok(()),
                _ => Err(otp_error()),
            }
        })
        .unwrap();

        assert_eq!(otp.as_deref(), Some("222222"));
        assert_eq!(
            seen,
            vec![None, Some("111111".to_string()), Some("222222".to_string())]
        );
        assert_eq!(
            prompter.prompts(),
            vec!["Enter OTP:", "OTP was incorrect, try again:"]
        );
    }

    #[test]
    fn test_known_otp_is_reused() {
        let prompter = ScriptedPrompter::new();
        let otp = with_otp_retry(&prompter, Some("999999".to_string()), |otp| {
            assert_eq!(otp, Some("999999"));
            Ok(())
        })
        .unwrap();
        assert_eq!(otp.as_deref(), Some("999999"));
    }

    #[test]
    fn test_empty_otp_cancels() {
        let prompter = ScriptedPrompter::new().answer_input("");
        let err = with_otp_retry(&prompter, None, |_| Err(otp_error())).unwrap_err();
        assert!(matches!(err, LionpError::Cancelled));
    }

    #[test]
    fn test_other_errors_propagate() {
        let prompter = ScriptedPrompter::new().answer_input("123456");
        let mut calls = 0;
        let err = with_otp_retry(&prompter, None, |otp| {
            calls += 1;
            match otp {
                None => Err(otp_error()),
                Some(_) => Err(LionpError::external_with_stderr("failed", "npm ERR! code E403")),
            }
        })
        .unwrap_err();
        assert_eq!(calls, 2);
        assert_eq!(err.stderr(), Some("npm ERR! code E403"));
    }
}
