//! Digest verification error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum IntegrityError {
    #[error("{algorithm} mismatch for {source_name}: expected {expected}, got {actual}")]
    Mismatch {
        source_name: String,
        algorithm: String,
        expected: String,
        actual: String,
    },

    #[error("malformed digest {value:?}: {reason}")]
    MalformedDigest { value: String, reason: String },

    #[error("cannot read {path} for hashing: {message}")]
    Unreadable { path: String, message: String },
}

impl UserFacingError for IntegrityError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Mismatch { .. } => Some(
                "The downloaded source does not match the formula. Do not build it; update the digest only if the new source is trusted.",
            ),
            Self::MalformedDigest { .. } => {
                Some("Digests must be exactly 64 hexadecimal characters.")
            }
            Self::Unreadable { .. } => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Mismatch { .. } => "integrity.mismatch",
            Self::MalformedDigest { .. } => "integrity.malformed_digest",
            Self::Unreadable { .. } => "integrity.unreadable",
        };
        Some(code)
    }
}
