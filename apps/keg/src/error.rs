//! CLI error handling

use std::fmt;

use keg_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration or formula loading error
    Config(keg_errors::Error),
    /// A stage of the install run failed
    Install(keg_errors::Error),
    /// I/O error
    Io(std::io::Error),
}

impl CliError {
    /// Stage name printed in front of the message
    pub fn stage(&self) -> &'static str {
        match self {
            CliError::Config(e) | CliError::Install(e) => e.stage(),
            CliError::Io(_) => "io",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) | CliError::Install(e) => {
                let message = e.user_message();
                write!(f, "[{}] {message}", e.stage())?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) | CliError::Install(e) => Some(e),
            CliError::Io(e) => Some(e),
        }
    }
}

impl From<keg_errors::Error> for CliError {
    fn from(e: keg_errors::Error) -> Self {
        match e {
            keg_errors::Error::Config(_) => CliError::Config(e),
            other => CliError::Install(other),
        }
    }
}

impl From<keg_errors::ConfigError> for CliError {
    fn from(e: keg_errors::ConfigError) -> Self {
        CliError::Config(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keg_errors::{ConfigError, IntegrityError};

    #[test]
    fn integrity_failure_names_stage_and_code() {
        let err: CliError = keg_errors::Error::from(IntegrityError::Mismatch {
            source_name: "prod.tar.gz".into(),
            algorithm: "sha256".into(),
            expected: "aa".into(),
            actual: "bb".into(),
        })
        .into();

        assert_eq!(err.stage(), "verify");
        let text = err.to_string();
        assert!(text.starts_with("[verify]"));
        assert!(text.contains("Code: integrity.mismatch"));
    }

    #[test]
    fn config_errors_are_kept_apart() {
        let err: CliError = ConfigError::NotFound {
            path: "/nope.toml".into(),
        }
        .into();
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(err.stage(), "config");
    }
}
