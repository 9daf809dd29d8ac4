//! Moving a built executable into the install directory

use keg_builder::Artifact;
use keg_errors::{Error, InstallError};
use std::path::{Path, PathBuf};
use tokio::fs;

/// The executable at its final location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledArtifact {
    pub path: PathBuf,
    /// Permission bits as read back from disk
    pub mode: u32,
    pub size: u64,
}

fn fs_error(operation: &str, path: &Path, e: &std::io::Error) -> Error {
    InstallError::FilesystemError {
        operation: operation.to_string(),
        path: path.display().to_string(),
        message: e.to_string(),
    }
    .into()
}

/// Place `artifact` at `install_path/<name>` with `mode`
///
/// The artifact is copied to a hidden sibling of the target, given its
/// permissions there, and renamed over the target, so the target path
/// never holds a partial file. Re-running with the same inputs overwrites
/// the previous install.
///
/// # Errors
///
/// Returns `InstallError::ArtifactNotFound` if the build output vanished,
/// `InstallError::InvalidInstallPath` if the directory or target is not
/// usable, and `InstallError::FilesystemError` for I/O failures.
pub async fn install(
    artifact: &Artifact,
    install_path: &Path,
    name: &str,
    mode: u32,
) -> Result<InstalledArtifact, Error> {
    if !fs::try_exists(&artifact.path).await.unwrap_or(false) {
        return Err(InstallError::ArtifactNotFound {
            path: artifact.path.display().to_string(),
        }
        .into());
    }

    if let Ok(meta) = fs::metadata(install_path).await {
        if !meta.is_dir() {
            return Err(InstallError::InvalidInstallPath {
                path: install_path.display().to_string(),
                reason: "exists and is not a directory".to_string(),
            }
            .into());
        }
    }

    fs::create_dir_all(install_path)
        .await
        .map_err(|e| fs_error("create_dir_all", install_path, &e))?;

    let target = install_path.join(name);
    if let Ok(meta) = fs::symlink_metadata(&target).await {
        if meta.is_dir() {
            return Err(InstallError::InvalidInstallPath {
                path: target.display().to_string(),
                reason: "a directory is in the way of the executable".to_string(),
            }
            .into());
        }
    }

    let temp = install_path.join(format!(".{name}.keg-{}.tmp", std::process::id()));
    if let Err(e) = place(&artifact.path, &temp, &target, mode).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e);
    }

    let meta = fs::metadata(&target)
        .await
        .map_err(|e| fs_error("stat", &target, &e))?;
    tracing::debug!(target = %target.display(), mode = format!("{:o}", file_mode(&meta)), "installed");

    Ok(InstalledArtifact {
        mode: file_mode(&meta),
        size: meta.len(),
        path: target,
    })
}

async fn place(source: &Path, temp: &Path, target: &Path, mode: u32) -> Result<(), Error> {
    fs::copy(source, temp)
        .await
        .map_err(|e| fs_error("copy", temp, &e))?;

    set_mode(temp, mode).await?;

    fs::rename(temp, target)
        .await
        .map_err(|e| fs_error("rename", target, &e))
}

#[cfg(unix)]
async fn set_mode(path: &Path, mode: u32) -> Result<(), Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| fs_error("chmod", path, &e))
}

#[cfg(not(unix))]
async fn set_mode(_path: &Path, _mode: u32) -> Result<(), Error> {
    Ok(())
}

#[cfg(unix)]
fn file_mode(meta: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_meta: &std::fs::Metadata) -> u32 {
    keg_types::DEFAULT_MODE
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::tempdir;

    async fn artifact_in(dir: &Path, contents: &[u8]) -> Artifact {
        let path = dir.join("stage-blisp");
        fs::write(&path, contents).await.unwrap();
        fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
            .await
            .unwrap();
        Artifact {
            path,
            size: contents.len() as u64,
        }
    }

    #[tokio::test]
    async fn creates_directory_and_sets_mode() {
        let dir = tempdir().unwrap();
        let artifact = artifact_in(dir.path(), b"#!/bin/sh\n").await;
        let bin = dir.path().join("prefix/bin");

        let installed = install(&artifact, &bin, "blisp", 0o755).await.unwrap();
        assert_eq!(installed.path, bin.join("blisp"));
        assert_eq!(installed.mode, 0o755);
        assert_eq!(installed.size, 10);
        assert!(installed.mode & 0o100 != 0, "owner execute bit");

        // no temp siblings left behind
        let names: Vec<_> = std::fs::read_dir(&bin)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("blisp")]);
    }

    #[tokio::test]
    async fn overwrites_previous_install() {
        let dir = tempdir().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir_all(&bin).await.unwrap();
        fs::write(bin.join("blisp"), b"old").await.unwrap();

        let artifact = artifact_in(dir.path(), b"new build").await;
        install(&artifact, &bin, "blisp", 0o755).await.unwrap();
        let again = install(&artifact, &bin, "blisp", 0o755).await.unwrap();

        assert_eq!(fs::read(&again.path).await.unwrap(), b"new build");
        assert_eq!(again.mode, 0o755);
    }

    #[tokio::test]
    async fn install_path_that_is_a_file_is_rejected() {
        let dir = tempdir().unwrap();
        let artifact = artifact_in(dir.path(), b"x").await;
        let not_a_dir = dir.path().join("bin");
        fs::write(&not_a_dir, b"").await.unwrap();

        let err = install(&artifact, &not_a_dir, "blisp", 0o755)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::InvalidInstallPath { .. })
        ));
    }

    #[tokio::test]
    async fn missing_artifact_is_reported() {
        let dir = tempdir().unwrap();
        let artifact = Artifact {
            path: dir.path().join("never-built"),
            size: 0,
        };
        let err = install(&artifact, &dir.path().join("bin"), "blisp", 0o755)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Install(InstallError::ArtifactNotFound { .. })
        ));
        assert!(!dir.path().join("bin").exists());
    }
}
