//! Expected content digests declared by formulas

use keg_errors::IntegrityError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length in bytes of every supported digest
pub const DIGEST_LEN: usize = 32;

/// Hash algorithm a digest was produced with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Blake3,
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

/// A digest the fetched source must match
///
/// Stored as raw bytes, so comparison against a computed digest is
/// independent of the case the formula author used.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpectedDigest {
    algorithm: DigestAlgorithm,
    bytes: [u8; DIGEST_LEN],
}

impl ExpectedDigest {
    /// Parse a hex literal
    ///
    /// # Errors
    ///
    /// Returns `IntegrityError::MalformedDigest` unless `value` is exactly 64
    /// hexadecimal characters. Surrounding whitespace is ignored.
    pub fn parse(algorithm: DigestAlgorithm, value: &str) -> Result<Self, IntegrityError> {
        let trimmed = value.trim();
        if trimmed.len() != DIGEST_LEN * 2 {
            return Err(IntegrityError::MalformedDigest {
                value: value.to_string(),
                reason: format!(
                    "{algorithm} digests are {} hex characters, got {}",
                    DIGEST_LEN * 2,
                    trimmed.len()
                ),
            });
        }

        let decoded = hex::decode(trimmed).map_err(|e| IntegrityError::MalformedDigest {
            value: value.to_string(),
            reason: e.to_string(),
        })?;

        let mut bytes = [0u8; DIGEST_LEN];
        bytes.copy_from_slice(&decoded);
        Ok(Self { algorithm, bytes })
    }

    #[must_use]
    pub fn from_bytes(algorithm: DigestAlgorithm, bytes: [u8; DIGEST_LEN]) -> Self {
        Self { algorithm, bytes }
    }

    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.bytes
    }

    /// Lowercase hex rendering
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Display for ExpectedDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl Serialize for ExpectedDigest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ExpectedDigest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let (algorithm, hex) = match s.split_once(':') {
            Some(("sha256", hex)) => (DigestAlgorithm::Sha256, hex),
            Some(("blake3", hex)) => (DigestAlgorithm::Blake3, hex),
            Some((other, _)) => {
                return Err(serde::de::Error::custom(format!(
                    "unknown digest algorithm {other}"
                )))
            }
            None => (DigestAlgorithm::Sha256, s.as_str()),
        };
        Self::parse(algorithm, hex).map_err(serde::de::Error::custom)
    }
}
