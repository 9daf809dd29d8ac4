//! Integrity gate between fetching and extraction

use crate::source::LocalSource;
use keg_errors::{Error, IntegrityError};
use keg_hash::{hash_tree, Hash};
use keg_types::ExpectedDigest;

/// A fetched source whose digest matched the expected one
///
/// Only [`verify_integrity`] constructs this, so extraction cannot run on
/// unverified bytes.
#[derive(Debug, Clone)]
pub struct VerifiedSource {
    source: LocalSource,
    digest: Hash,
}

impl VerifiedSource {
    #[must_use]
    pub fn source(&self) -> &LocalSource {
        &self.source
    }

    #[must_use]
    pub fn digest(&self) -> &Hash {
        &self.digest
    }
}

/// Hash the fetched source as it sits on disk and compare with `expected`
///
/// Archives are hashed byte for byte; checkouts use the tree digest. On
/// mismatch the fetched source is deleted.
///
/// # Errors
///
/// Returns `IntegrityError::Mismatch` when the digests differ and
/// `IntegrityError::Unreadable` when the source cannot be read.
pub async fn verify_integrity(
    source: LocalSource,
    expected: &ExpectedDigest,
) -> Result<VerifiedSource, Error> {
    let algorithm = expected.algorithm();
    let actual = match &source {
        LocalSource::Archive { path, streamed, .. } => {
            let on_disk = Hash::hash_file(algorithm, path).await?;
            if streamed.algorithm() == algorithm && *streamed != on_disk {
                tracing::warn!(path = %path.display(), "archive changed after download");
            }
            on_disk
        }
        LocalSource::Checkout { dir, .. } => hash_tree(algorithm, dir).await?,
    };

    if actual.matches(expected) {
        tracing::debug!(source = %source.display_name(), digest = %actual, "digest verified");
        return Ok(VerifiedSource {
            source,
            digest: actual,
        });
    }

    discard(&source).await;
    Err(IntegrityError::Mismatch {
        source_name: source.display_name(),
        algorithm: algorithm.to_string(),
        expected: expected.to_hex(),
        actual: actual.to_hex(),
    }
    .into())
}

async fn discard(source: &LocalSource) {
    let result = match source {
        LocalSource::Archive { path, .. } => tokio::fs::remove_file(path).await,
        LocalSource::Checkout { dir, .. } => tokio::fs::remove_dir_all(dir).await,
    };
    if let Err(e) = result {
        tracing::debug!(path = %source.path().display(), error = %e, "failed to discard source");
    }
}
