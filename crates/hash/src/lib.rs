#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Content digests for keg
//!
//! This crate computes SHA-256 and BLAKE3 digests over byte slices, files,
//! streams and whole source trees, and compares them against the digest a
//! formula declares.

mod tree;

pub use keg_types::DigestAlgorithm;
pub use tree::hash_tree;

use keg_errors::{Error, IntegrityError};
use keg_types::ExpectedDigest;
use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Size of chunks for streaming hash computation
const CHUNK_SIZE: usize = 64 * 1024; // 64KB

/// Incremental hasher over either supported algorithm
pub enum Hasher {
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

impl Hasher {
    #[must_use]
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Sha256 => Self::Sha256(sha2::Sha256::new()),
            DigestAlgorithm::Blake3 => Self::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
        }
    }

    #[must_use]
    pub fn finalize(self) -> Hash {
        match self {
            Self::Sha256(h) => Hash::from_bytes(DigestAlgorithm::Sha256, h.finalize().into()),
            Self::Blake3(h) => Hash::from_bytes(DigestAlgorithm::Blake3, *h.finalize().as_bytes()),
        }
    }
}

/// A computed digest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hash {
    algorithm: DigestAlgorithm,
    bytes: [u8; 32],
}

impl Hash {
    /// Create a hash from raw bytes
    #[must_use]
    pub fn from_bytes(algorithm: DigestAlgorithm, bytes: [u8; 32]) -> Self {
        Self { algorithm, bytes }
    }

    #[must_use]
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Get the raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Convert to lowercase hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Compute hash of a byte slice
    #[must_use]
    pub fn from_data(algorithm: DigestAlgorithm, data: &[u8]) -> Self {
        let mut hasher = Hasher::new(algorithm);
        hasher.update(data);
        hasher.finalize()
    }

    /// Compute hash of a file
    ///
    /// # Errors
    /// Returns `IntegrityError::Unreadable` if the file cannot be opened or read.
    pub async fn hash_file(algorithm: DigestAlgorithm, path: &Path) -> Result<Self, Error> {
        let unreadable = |e: std::io::Error| IntegrityError::Unreadable {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let mut file = File::open(path).await.map_err(unreadable)?;
        let mut hasher = Hasher::new(algorithm);
        let mut buffer = vec![0; CHUNK_SIZE];

        loop {
            let n = file.read(&mut buffer).await.map_err(unreadable)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(hasher.finalize())
    }

    /// Compute hash while copying data to a writer
    ///
    /// Returns the raw I/O error so the caller can attribute it to its stage.
    ///
    /// # Errors
    /// Returns an error if reading from the reader or writing to the writer fails.
    pub async fn hash_and_copy<R, W>(
        algorithm: DigestAlgorithm,
        mut reader: R,
        mut writer: W,
    ) -> std::io::Result<(Self, u64)>
    where
        R: AsyncReadExt + Unpin,
        W: AsyncWriteExt + Unpin,
    {
        let mut hasher = Hasher::new(algorithm);
        let mut buffer = vec![0; CHUNK_SIZE];
        let mut total_bytes = 0u64;

        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }

            hasher.update(&buffer[..n]);
            writer.write_all(&buffer[..n]).await?;
            total_bytes += n as u64;
        }

        writer.flush().await?;
        Ok((hasher.finalize(), total_bytes))
    }

    /// Whether this digest is the one `expected` declares
    #[must_use]
    pub fn matches(&self, expected: &ExpectedDigest) -> bool {
        self.algorithm == expected.algorithm() && &self.bytes == expected.as_bytes()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&format!("{}:{}", self.algorithm, self.to_hex()))
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let expected = ExpectedDigest::deserialize(deserializer)?;
        Ok(Self::from_bytes(expected.algorithm(), *expected.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_known_vectors() {
        let data = b"hello world";
        assert_eq!(
            Hash::from_data(DigestAlgorithm::Sha256, data).to_hex(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(
            Hash::from_data(DigestAlgorithm::Blake3, data).to_hex(),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn test_algorithms_never_match_each_other() {
        let sha = Hash::from_data(DigestAlgorithm::Sha256, b"x");
        let expected = ExpectedDigest::from_bytes(DigestAlgorithm::Blake3, *sha.as_bytes());
        assert!(!sha.matches(&expected));
    }

    #[test]
    fn test_hash_serialization() {
        let hash = Hash::from_data(DigestAlgorithm::Blake3, b"test");
        let json = serde_json::to_string(&hash).unwrap();
        assert!(json.starts_with("\"blake3:"));
        let deserialized: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, deserialized);
    }

    #[tokio::test]
    async fn test_hash_file() {
        use std::io::Write;
        let mut temp = NamedTempFile::new().unwrap();
        let data = b"test file content";
        temp.write_all(data).unwrap();

        let hash = Hash::hash_file(DigestAlgorithm::Sha256, temp.path())
            .await
            .unwrap();
        assert_eq!(hash, Hash::from_data(DigestAlgorithm::Sha256, data));
    }

    #[tokio::test]
    async fn test_hash_missing_file() {
        let err = Hash::hash_file(DigestAlgorithm::Sha256, Path::new("/nonexistent/keg"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Integrity(IntegrityError::Unreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_hash_and_copy() {
        let data = b"data to copy";
        let reader = std::io::Cursor::new(data);
        let mut writer = Vec::new();

        let (hash, bytes) = Hash::hash_and_copy(DigestAlgorithm::Sha256, reader, &mut writer)
            .await
            .unwrap();

        assert_eq!(writer, data);
        assert_eq!(bytes, data.len() as u64);
        assert_eq!(hash, Hash::from_data(DigestAlgorithm::Sha256, data));
    }

    proptest! {
        #[test]
        fn matches_iff_bytes_equal(data in proptest::collection::vec(any::<u8>(), 0..512), upper in any::<bool>()) {
            let actual = Hash::from_data(DigestAlgorithm::Sha256, &data);
            let literal = if upper { actual.to_hex().to_uppercase() } else { actual.to_hex() };
            let expected = ExpectedDigest::parse(DigestAlgorithm::Sha256, &literal).unwrap();
            prop_assert!(actual.matches(&expected));
        }

        #[test]
        fn flipped_byte_never_matches(data in proptest::collection::vec(any::<u8>(), 1..512), idx in any::<prop::sample::Index>(), bit in 0u8..8) {
            let expected = Hash::from_data(DigestAlgorithm::Sha256, &data);
            let expected = ExpectedDigest::from_bytes(DigestAlgorithm::Sha256, *expected.as_bytes());

            let mut corrupted = data.clone();
            let i = idx.index(corrupted.len());
            corrupted[i] ^= 1 << bit;

            prop_assert!(!Hash::from_data(DigestAlgorithm::Sha256, &corrupted).matches(&expected));
        }
    }
}
