//! Artifact placement error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum InstallError {
    #[error("filesystem operation failed: {operation} on {path}: {message}")]
    FilesystemError {
        operation: String,
        path: String,
        message: String,
    },

    #[error("artifact not found: {path}")]
    ArtifactNotFound { path: String },

    #[error("invalid install path {path}: {reason}")]
    InvalidInstallPath { path: String, reason: String },
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::FilesystemError { .. } => {
                Some("Ensure the install prefix is writable by the current user.")
            }
            Self::InvalidInstallPath { .. } => Some("Pass an absolute --prefix or --bin-dir."),
            Self::ArtifactNotFound { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::FilesystemError { .. } => "install.filesystem",
            Self::ArtifactNotFound { .. } => "install.artifact_not_found",
            Self::InvalidInstallPath { .. } => "install.invalid_path",
        };
        Some(code)
    }
}
