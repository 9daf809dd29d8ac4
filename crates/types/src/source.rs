//! Source locations a formula can point at

use keg_errors::FetchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Archive container formats the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveFormat {
    TarGz,
    TarBz2,
    TarXz,
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from a file name or URL path
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(Self::TarBz2)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::TarXz)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    /// Detect the format from leading magic bytes
    #[must_use]
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0x1f, 0x8b, ..] => Some(Self::TarGz),
            [b'B', b'Z', b'h', ..] => Some(Self::TarBz2),
            [0xfd, b'7', b'z', b'X', b'Z', 0x00, ..] => Some(Self::TarXz),
            [b'P', b'K', 0x03, 0x04, ..] => Some(Self::Zip),
            _ => None,
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::TarBz2 => "tar.bz2",
            Self::TarXz => "tar.xz",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Where the source for a package comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceLocation {
    /// A release archive fetched over HTTP(S) or from a `file://` URL
    Archive { url: String, format: ArchiveFormat },
    /// A git repository; `revision: None` means the live HEAD
    Repository {
        url: String,
        revision: Option<String>,
    },
}

impl SourceLocation {
    /// Classify a formula `url`
    ///
    /// URLs whose path ends in a known archive extension are archives.
    /// Anything else is treated as a git repository. A `#rev` fragment pins
    /// the repository revision; `revision` does the same from a separate
    /// field and must agree with the fragment when both are given.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` for unparsable URLs or conflicting
    /// revisions, and `FetchError::UnsupportedScheme` for schemes other than
    /// `http`, `https`, `file`, `git` and `ssh`.
    pub fn parse(url: &str, revision: Option<&str>) -> Result<Self, FetchError> {
        let mut parsed =
            Url::parse(url.trim()).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let scheme = parsed.scheme().to_string();
        let fetchable = matches!(scheme.as_str(), "http" | "https" | "file");
        if !fetchable && !matches!(scheme.as_str(), "git" | "ssh") {
            return Err(FetchError::UnsupportedScheme {
                url: url.to_string(),
                scheme,
            });
        }

        let fragment = parsed
            .fragment()
            .filter(|f| !f.is_empty())
            .map(str::to_string);
        parsed.set_fragment(None);

        if fetchable {
            if let Some(format) = ArchiveFormat::from_file_name(parsed.path()) {
                return Ok(Self::Archive {
                    url: parsed.to_string(),
                    format,
                });
            }
        }

        let revision = match (fragment, revision.map(str::trim).filter(|r| !r.is_empty())) {
            (Some(a), Some(b)) if a != b => {
                return Err(FetchError::InvalidUrl(format!(
                    "{url}: fragment revision {a} conflicts with revision {b}"
                )))
            }
            (Some(a), _) => Some(a),
            (None, b) => b.map(str::to_string),
        };

        Ok(Self::Repository {
            url: parsed.to_string(),
            revision,
        })
    }

    /// The URL without any revision fragment
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Archive { url, .. } | Self::Repository { url, .. } => url,
        }
    }

    /// Whether the content behind this location can change without the
    /// location changing
    #[must_use]
    pub fn is_moving_target(&self) -> bool {
        matches!(self, Self::Repository { revision: None, .. })
    }

    /// Name to store the fetched source under in the scratch directory
    #[must_use]
    pub fn local_name(&self) -> String {
        let last_segment = self
            .url()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty() && !s.contains(':'));

        match self {
            Self::Archive { format, .. } => last_segment
                .map_or_else(|| format!("source.{}", format.extension()), str::to_string),
            Self::Repository { .. } => last_segment
                .map(|s| s.strip_suffix(".git").unwrap_or(s))
                .filter(|s| !s.is_empty())
                .unwrap_or("repository")
                .to_string(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive { url, .. } | Self::Repository { url, revision: None } => {
                write!(f, "{url}")
            }
            Self::Repository {
                url,
                revision: Some(rev),
            } => write!(f, "{url}#{rev}"),
        }
    }
}
