//! Source acquisition: archive download or repository checkout

mod git;

use crate::scratch::Scratch;
use keg_errors::{Error, FetchError};
use keg_events::EventEmitter;
use keg_hash::Hash;
use keg_net::NetClient;
use keg_types::{ArchiveFormat, PackageSpec, SourceLocation};
use std::path::{Path, PathBuf};
use url::Url;

/// Source bytes sitting in the scratch directory, not yet verified
#[derive(Debug, Clone)]
pub enum LocalSource {
    Archive {
        path: PathBuf,
        format: ArchiveFormat,
        /// Digest computed while the body was written
        streamed: Hash,
        size: u64,
    },
    Checkout {
        dir: PathBuf,
        /// Commit the checkout ended up on
        commit: Option<String>,
    },
}

impl LocalSource {
    /// File or directory holding the source
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Archive { path, .. } => path,
            Self::Checkout { dir, .. } => dir,
        }
    }

    /// Name used in diagnostics
    #[must_use]
    pub fn display_name(&self) -> String {
        self.path()
            .file_name()
            .map_or_else(|| self.path().display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

/// Fetch the package source into `scratch`
///
/// Archives are streamed to `downloads/` while hashed with the algorithm of
/// the expected digest. Repositories are shallow-cloned into `src/`.
///
/// # Errors
///
/// Returns `FetchError` on network or I/O failure, a non-2xx response, or a
/// failed git operation.
pub async fn resolve_source<E>(
    spec: &PackageSpec,
    client: &NetClient,
    scratch: &Scratch,
    events: &E,
) -> Result<LocalSource, Error>
where
    E: EventEmitter + ?Sized,
{
    match &spec.source {
        SourceLocation::Archive { url, format } => {
            let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;
            let dest = scratch.downloads_dir().join(spec.source.local_name());
            tracing::debug!(%url, dest = %dest.display(), "downloading source archive");

            let result = keg_net::download_file(
                client,
                &parsed,
                &dest,
                spec.expected_digest.algorithm(),
                events,
            )
            .await?;

            Ok(LocalSource::Archive {
                path: dest,
                format: *format,
                streamed: result.hash,
                size: result.size,
            })
        }
        SourceLocation::Repository { url, revision } => {
            let dir = scratch.source_dir().join(spec.source.local_name());
            let commit = git::checkout(url, revision.as_deref(), &dir, events).await?;
            Ok(LocalSource::Checkout { dir, commit })
        }
    }
}
