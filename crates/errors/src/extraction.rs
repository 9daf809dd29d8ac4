//! Archive extraction error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum ExtractionError {
    #[error("corrupted archive {archive}: {message}")]
    Corrupted { archive: String, message: String },

    #[error("unsupported archive format: {archive}")]
    UnsupportedFormat { archive: String },

    #[error("archive {archive} contains no files")]
    Empty { archive: String },

    #[error("archive entry {entry} escapes the extraction directory")]
    PathEscape { entry: String },

    #[error("failed to write {path}: {message}")]
    WriteFailed { path: String, message: String },
}

impl UserFacingError for ExtractionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Corrupted { .. } | Self::Empty { .. } => {
                Some("The archive is damaged or truncated; check the formula url.")
            }
            Self::UnsupportedFormat { .. } => {
                Some("Use a .tar.gz, .tar.bz2, .tar.xz or .zip source archive.")
            }
            Self::PathEscape { .. } => Some("The archive is unsafe to unpack; report it upstream."),
            Self::WriteFailed { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Corrupted { .. } => "extract.corrupted",
            Self::UnsupportedFormat { .. } => "extract.unsupported_format",
            Self::Empty { .. } => "extract.empty",
            Self::PathEscape { .. } => "extract.path_escape",
            Self::WriteFailed { .. } => "extract.write_failed",
        };
        Some(code)
    }
}
