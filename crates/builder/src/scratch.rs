//! Per-run scratch workspace

use keg_errors::Error;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const DOWNLOADS_DIR: &str = "downloads";
const SOURCE_DIR: &str = "src";
const STAGE_DIR: &str = "stage";

/// Temporary directory owned exclusively by one install run
///
/// Layout:
/// - `downloads/` fetched archives
/// - `src/` extracted source or repository checkout
/// - `stage/` build output
///
/// Removed on drop unless [`Scratch::keep`] is called.
#[derive(Debug)]
pub struct Scratch {
    dir: TempDir,
}

impl Scratch {
    /// Create a scratch directory under `parent`, or the system temp dir
    ///
    /// # Errors
    ///
    /// Returns an error if the directory tree cannot be created.
    pub fn new(parent: Option<&Path>) -> Result<Self, Error> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("keg-");

        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|e| fs_error(parent, &e))?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .map_err(|e| fs_error(parent.unwrap_or(Path::new("temp dir")), &e))?;

        for sub in [DOWNLOADS_DIR, SOURCE_DIR, STAGE_DIR] {
            let path = dir.path().join(sub);
            std::fs::create_dir(&path).map_err(|e| fs_error(&path, &e))?;
        }

        Ok(Self { dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn downloads_dir(&self) -> PathBuf {
        self.path().join(DOWNLOADS_DIR)
    }

    #[must_use]
    pub fn source_dir(&self) -> PathBuf {
        self.path().join(SOURCE_DIR)
    }

    #[must_use]
    pub fn stage_dir(&self) -> PathBuf {
        self.path().join(STAGE_DIR)
    }

    /// Disable cleanup and return the directory path
    #[must_use]
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }
}

// Scratch is set up before any stage runs, so failures carry no stage
fn fs_error(path: &Path, e: &std::io::Error) -> Error {
    Error::io_with_path(e, path)
}
