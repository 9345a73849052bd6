//! Command-line surface

pub mod orchestration;

pub use orchestration::{
    install_interrupt_handler, report_exit, run_release, ExitSlot, ReleaseSummary,
    ReleaseWorkflowArgs, WorkflowResult,
};

use clap::Parser;

use crate::config::PartialConfig;

#[derive(Parser, Debug, Default)]
#[command(
    name = "lionp",
    version,
    about = "Publish a new version of a package: checks, version bump, publish, git tags and a GitHub release draft",
    after_help = "Version can be:\n  patch | minor | major | prepatch | preminor | premajor | prerelease | 1.2.3\n\nExamples:\n  $ lionp\n  $ lionp patch\n  $ lionp 1.0.2\n  $ lionp 1.0.2-beta.3 --tag=beta"
)]
pub struct Args {
    /// Increment keyword or explicit version
    #[arg(value_name = "VERSION")]
    pub input: Option<String>,

    #[arg(long, help = "Allow publishing from any branch")]
    pub any_branch: bool,

    #[arg(long, help = "Name of the release branch (default: main | master)")]
    pub branch: Option<String>,

    #[arg(long, help = "Skips cleanup of node_modules")]
    pub no_cleanup: bool,

    #[arg(long, help = "Skips tests")]
    pub no_tests: bool,

    #[arg(long, help = "Skips cleanup and testing")]
    pub yolo: bool,

    #[arg(long, help = "Skips publishing")]
    pub no_publish: bool,

    #[arg(long, help = "Show tasks without actually executing them")]
    pub preview: bool,

    #[arg(long, help = "Publish under a given dist-tag")]
    pub tag: Option<String>,

    #[arg(long, help = "Skips opening a GitHub release draft")]
    pub no_release_draft: bool,

    #[arg(
        long,
        help = "Only opens a GitHub release draft for the latest published version"
    )]
    pub release_draft_only: bool,

    #[arg(
        long,
        help = "Name of the run script to run tests before publishing (default: test)"
    )]
    pub test_script: Option<String>,

    #[arg(long = "no-2fa", help = "Don't enable 2FA on new packages (not recommended)")]
    pub no_two_factor: bool,

    #[arg(
        long,
        help = "Version bump commit message, '%s' will be replaced with version"
    )]
    pub message: Option<String>,

    #[arg(long, help = "Print debug logs")]
    pub debug: bool,
}

fn disabled_if(flag: bool) -> Option<bool> {
    flag.then_some(false)
}

fn enabled_if(flag: bool) -> Option<bool> {
    flag.then_some(true)
}

impl Args {
    /// The flags as the highest-precedence configuration layer.
    ///
    /// Flags left off the command line stay unset so they do not override
    /// the config file.
    pub fn to_partial_config(&self) -> PartialConfig {
        PartialConfig {
            any_branch: enabled_if(self.any_branch),
            branch: self.branch.clone(),
            cleanup: disabled_if(self.no_cleanup),
            tests: disabled_if(self.no_tests),
            yolo: enabled_if(self.yolo),
            publish: disabled_if(self.no_publish),
            preview: enabled_if(self.preview),
            tag: self.tag.clone(),
            message: self.message.clone(),
            release_draft: disabled_if(self.no_release_draft),
            release_draft_only: enabled_if(self.release_draft_only),
            test_script: self.test_script.clone(),
            two_factor: disabled_if(self.no_two_factor),
            ..PartialConfig::default()
        }
    }

    pub fn to_workflow_args(&self) -> ReleaseWorkflowArgs {
        ReleaseWorkflowArgs {
            version: self.input.clone(),
            flags: self.to_partial_config(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("lionp").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_flags_leave_config_untouched() {
        assert_eq!(parse(&[]).to_partial_config(), PartialConfig::default());
    }

    #[test]
    fn test_negated_flags() {
        let config = parse(&["--no-cleanup", "--no-publish", "--no-2fa", "--no-release-draft"])
            .to_partial_config();
        assert_eq!(config.cleanup, Some(false));
        assert_eq!(config.publish, Some(false));
        assert_eq!(config.two_factor, Some(false));
        assert_eq!(config.release_draft, Some(false));
        assert_eq!(config.tests, None);
    }

    #[test]
    fn test_version_and_values() {
        let args = parse(&["1.0.2-beta.3", "--tag=beta", "--branch", "release", "--any-branch"]);
        let workflow = args.to_workflow_args();
        assert_eq!(workflow.version.as_deref(), Some("1.0.2-beta.3"));
        assert_eq!(workflow.flags.tag.as_deref(), Some("beta"));
        assert_eq!(workflow.flags.branch.as_deref(), Some("release"));
        assert_eq!(workflow.flags.any_branch, Some(true));
    }

    #[test]
    fn test_yolo() {
        assert_eq!(parse(&["--yolo"]).to_partial_config().yolo, Some(true));
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Args::try_parse_from(["lionp", "--contents", "dist"]).is_err());
    }
}
