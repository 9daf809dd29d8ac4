//! Build step error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Captured output longer than this is cut from the front when displayed
const OUTPUT_TAIL_CHARS: usize = 4000;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum BuildError {
    #[error("missing build toolchain: {name}")]
    MissingToolchain { name: String },

    #[error("`{command}` exited with {}:\n{}", display_exit_code(.exit_code), tail(.stderr, .stdout))]
    Failed {
        command: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("failed to start `{command}`: {message}")]
    SpawnFailed { command: String, message: String },

    #[error("build timeout for {package} after {seconds} seconds")]
    Timeout { package: String, seconds: u64 },

    #[error("build finished but produced no artifact at {path}")]
    MissingArtifact { path: String },

    #[error("invalid build command: {message}")]
    InvalidCommand { message: String },

    #[error("cannot prepare build output directory {path}: {message}")]
    StagingFailed { path: String, message: String },
}

#[allow(clippy::ref_option)]
fn display_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

fn tail<'a>(stderr: &'a str, stdout: &'a str) -> &'a str {
    let output = if stderr.trim().is_empty() {
        stdout
    } else {
        stderr
    };
    let output = output.trim_end();
    if output.len() <= OUTPUT_TAIL_CHARS {
        return output;
    }
    let mut start = output.len() - OUTPUT_TAIL_CHARS;
    while !output.is_char_boundary(start) {
        start += 1;
    }
    &output[start..]
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingToolchain { .. } => {
                Some("Install the toolchain named in depends_on and make sure it is on PATH.")
            }
            Self::Timeout { .. } => Some("Increase build.timeout and retry."),
            Self::MissingArtifact { .. } => {
                Some("The install command must write the executable to {output}.")
            }
            Self::InvalidCommand { .. } => Some("Fix install.command in the formula."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::MissingToolchain { .. } => "build.missing_toolchain",
            Self::Failed { .. } => "build.failed",
            Self::SpawnFailed { .. } => "build.spawn_failed",
            Self::Timeout { .. } => "build.timeout",
            Self::MissingArtifact { .. } => "build.missing_artifact",
            Self::InvalidCommand { .. } => "build.invalid_command",
            Self::StagingFailed { .. } => "build.staging_failed",
        };
        Some(code)
    }
}
