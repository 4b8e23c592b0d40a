//! Error taxonomy for the orchestration core

use crate::core::platform::Platform;
use std::path::PathBuf;
use thiserror::Error;

/// Error types for build and run orchestration
#[derive(Debug, Error)]
pub enum Error {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("App not found: {0}")]
    AppNotFound(String),

    #[error("Platform '{0}' is not supported by this app")]
    UnsupportedPlatform(Platform),

    #[error("Build output not found at: {0}")]
    OutputNotFound(PathBuf),

    #[error("A build is already in progress")]
    BuildInProgress,

    #[error("A run session is already active")]
    RunInProgress,

    #[error("No run session is active")]
    NotRunning,

    #[error("{description} failed with exit code {code}")]
    Toolchain { description: String, code: i32 },

    #[error("Pre-steps failed, aborting")]
    PreStepsFailed,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("Invalid workflow definition: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this is a "not found" condition, as opposed to some other
    /// I/O or configuration failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::ProjectNotFound(_) | Error::AppNotFound(_) | Error::OutputNotFound(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(Error::OutputNotFound(PathBuf::from("/tmp/x.apk")).is_not_found());
        assert!(Error::AppNotFound("app1".into()).is_not_found());
        assert!(!Error::BuildInProgress.is_not_found());
    }

    #[test]
    fn test_toolchain_error_message() {
        let err = Error::Toolchain {
            description: "flutter build apk".into(),
            code: 1,
        };
        assert_eq!(err.to_string(), "flutter build apk failed with exit code 1");
    }
}
