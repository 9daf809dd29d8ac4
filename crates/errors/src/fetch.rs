//! Source acquisition error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum FetchError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("download failed for {url}: {message}")]
    DownloadFailed { url: String, message: String },

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme {scheme} in {url}")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("HTTP error {status} for {url}: {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("rate limited: retry after {seconds} seconds")]
    RateLimited { seconds: u64 },

    #[error("git checkout of {url} failed: {message}")]
    GitFailed { url: String, message: String },

    #[error("failed to write {path}: {message}")]
    WriteFailed { path: String, message: String },
}

impl UserFacingError for FetchError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused(_) => {
                Some("Check your network connection or raise network.timeout.")
            }
            Self::InvalidUrl(_) | Self::UnsupportedScheme { .. } => {
                Some("Fix the url field in the formula.")
            }
            Self::HttpStatus { status, .. } if *status == 404 => {
                Some("The source archive does not exist; the formula url may be stale.")
            }
            Self::RateLimited { .. } => Some("Wait for the rate limit to reset and retry."),
            Self::GitFailed { .. } => {
                Some("Ensure git is installed and the repository and revision exist.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::ConnectionRefused(_)
            | Self::DownloadFailed { .. }
            | Self::RateLimited { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Timeout { .. } => "fetch.timeout",
            Self::DownloadFailed { .. } => "fetch.download_failed",
            Self::ConnectionRefused(_) => "fetch.connection_refused",
            Self::InvalidUrl(_) => "fetch.invalid_url",
            Self::UnsupportedScheme { .. } => "fetch.unsupported_scheme",
            Self::HttpStatus { .. } => "fetch.http_status",
            Self::RateLimited { .. } => "fetch.rate_limited",
            Self::GitFailed { .. } => "fetch.git_failed",
            Self::WriteFailed { .. } => "fetch.write_failed",
        };
        Some(code)
    }
}
