use thiserror::Error;

/// Unified error type for lionp operations
#[derive(Error, Debug)]
pub enum LionpError {
    #[error("Version should be a valid semver version.")]
    InvalidVersion { version: String },

    #[error("Version should be either {allowed} or a valid semver version.")]
    InvalidIncrement { input: String, allowed: String },

    #[error("{0}")]
    Precondition(String),

    #[error("{message}")]
    ExternalTool { message: String, stderr: String },

    #[error("The registry requires a one-time password")]
    OtpChallenge,

    #[error("Cancelled by user")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results in lionp
pub type Result<T> = std::result::Result<T, LionpError>;

impl LionpError {
    /// Create a precondition error (wrong branch, dirty tree, missing permission...)
    pub fn precondition(msg: impl Into<String>) -> Self {
        LionpError::Precondition(msg.into())
    }

    /// Create an external tool error without captured stderr
    pub fn external(msg: impl Into<String>) -> Self {
        LionpError::ExternalTool {
            message: msg.into(),
            stderr: String::new(),
        }
    }

    /// Create an external tool error keeping the tool's stderr for classification
    pub fn external_with_stderr(msg: impl Into<String>, stderr: impl Into<String>) -> Self {
        LionpError::ExternalTool {
            message: msg.into(),
            stderr: stderr.into(),
        }
    }

    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        LionpError::Config(msg.into())
    }

    /// Create a prompt error with context
    pub fn prompt(msg: impl Into<String>) -> Self {
        LionpError::Prompt(msg.into())
    }

    /// Stderr captured from the failing tool, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            LionpError::ExternalTool { stderr, .. } if !stderr.is_empty() => Some(stderr),
            _ => None,
        }
    }

    /// Validation and precondition failures happen before anything is mutated.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            LionpError::InvalidVersion { .. }
                | LionpError::InvalidIncrement { .. }
                | LionpError::Precondition(_)
        )
    }
}

impl From<dialoguer::Error> for LionpError {
    fn from(error: dialoguer::Error) -> Self {
        LionpError::prompt(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LionpError::config("test config issue");
        assert_eq!(err.to_string(), "Configuration error: test config issue");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: LionpError = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_invalid_version_message() {
        let err = LionpError::InvalidVersion {
            version: "1.0.0.0".to_string(),
        };
        assert_eq!(err.to_string(), "Version should be a valid semver version.");
    }

    #[test]
    fn test_invalid_increment_names_allowed_keywords() {
        let err = LionpError::InvalidIncrement {
            input: "foo".to_string(),
            allowed: "patch, minor".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Version should be either patch, minor or a valid semver version."
        );
    }

    #[test]
    fn test_stderr_only_for_external_tool() {
        let err = LionpError::external_with_stderr("npm failed", "npm ERR! code E404");
        assert_eq!(err.stderr(), Some("npm ERR! code E404"));
        assert_eq!(LionpError::external("no stderr").stderr(), None);
        assert_eq!(LionpError::precondition("dirty").stderr(), None);
    }

    #[test]
    fn test_precondition_classification() {
        assert!(LionpError::precondition("Unclean working tree").is_precondition());
        assert!(LionpError::InvalidVersion {
            version: "x".to_string()
        }
        .is_precondition());
        assert!(!LionpError::external("push failed").is_precondition());
        assert!(!LionpError::Cancelled.is_precondition());
    }

    #[test]
    fn test_error_messages_are_descriptive() {
        let error_pairs = vec![
            (LionpError::config("x"), "Configuration error"),
            (LionpError::prompt("x"), "Prompt failed"),
            (LionpError::OtpChallenge, "The registry requires"),
            (LionpError::Cancelled, "Cancelled"),
        ];

        for (err, expected_prefix) in error_pairs {
            let msg = err.to_string();
            assert!(
                msg.starts_with(expected_prefix),
                "Error message should start with '{}', but got '{}'",
                expected_prefix,
                msg
            );
        }
    }
}
