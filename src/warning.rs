use std::fmt;

/// Non-fatal issues found during a release.
/// They are reported after the run and never fail it.
#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseWarning {
    /// The remote refused the release commit; only tags were pushed
    BranchProtection,
    /// Neither a `files` allow-list nor a `.npmignore` limits the published files
    NoFilesAllowList,
    /// The registry could not tell whether the package name is free
    AvailabilityUnknown { package_name: String },
}

impl fmt::Display for ReleaseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReleaseWarning::BranchProtection => {
                write!(f, "Branch protection: np can`t push the commits. Push them manually.")
            }
            ReleaseWarning::NoFilesAllowList => write!(
                f,
                "No `files` field specified in `package.json` nor is a `.npmignore` file present. \
                 Having one of those will prevent you from accidentally publishing \
                 development-specific files along with your package's source code to npm."
            ),
            ReleaseWarning::AvailabilityUnknown { package_name } => write!(
                f,
                "Could not determine whether `{}` is available on the registry",
                package_name
            ),
        }
    }
}
