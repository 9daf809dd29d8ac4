//! Archive extraction into the scratch source directory

use crate::source::LocalSource;
use crate::verify::VerifiedSource;
use keg_errors::{Error, ExtractionError};
use keg_types::ArchiveFormat;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};

/// Directories some archivers add next to the real top-level directory
const IGNORED_TOP_LEVEL: &[&str] = &["__MACOSX"];

/// Root of an unpacked source tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    root: PathBuf,
}

impl SourceTree {
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Unpack a verified source into `dest`
///
/// A single top-level directory, as in GitHub release archives, is
/// stripped by pointing the tree root at it. Repository checkouts are
/// already a tree and pass through unchanged.
///
/// # Errors
///
/// Returns `ExtractionError` for malformed or truncated archives, entries
/// that would land outside `dest`, and archives with no entries.
pub async fn extract(verified: &VerifiedSource, dest: &Path) -> Result<SourceTree, Error> {
    let (path, declared) = match verified.source() {
        LocalSource::Checkout { dir, .. } => {
            return Ok(SourceTree { root: dir.clone() });
        }
        LocalSource::Archive { path, format, .. } => (path.clone(), *format),
    };

    let archive_name = verified.source().display_name();
    let format = sniff_format(&path, &archive_name).await?;
    if format != declared {
        tracing::debug!(%declared, detected = %format, "archive content differs from its name");
    }

    tokio::fs::create_dir_all(dest)
        .await
        .map_err(|e| write_failed(dest, &e))?;

    let entries = match format {
        ArchiveFormat::Zip => {
            let dest = dest.to_path_buf();
            let name = archive_name.clone();
            tokio::task::spawn_blocking(move || unpack_zip(&path, &dest, &name))
                .await
                .map_err(|e| Error::internal(format!("extraction task failed: {e}")))??
        }
        _ => extract_compressed_tar(&path, format, dest, &archive_name).await?,
    };

    if entries == 0 {
        return Err(ExtractionError::Empty {
            archive: archive_name,
        }
        .into());
    }

    let root = source_root(dest).map_err(|e| write_failed(dest, &e))?;
    tracing::debug!(archive = %archive_name, entries, root = %root.display(), "extracted");
    Ok(SourceTree { root })
}

/// Detect the container from magic bytes
async fn sniff_format(path: &Path, archive_name: &str) -> Result<ArchiveFormat, Error> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| corrupted(archive_name, &e))?;
    let mut magic = [0u8; 6];
    let mut read = 0;
    while read < magic.len() {
        let n = file
            .read(&mut magic[read..])
            .await
            .map_err(|e| corrupted(archive_name, &e))?;
        if n == 0 {
            break;
        }
        read += n;
    }

    if read == 0 {
        return Err(ExtractionError::Empty {
            archive: archive_name.to_string(),
        }
        .into());
    }

    ArchiveFormat::from_magic(&magic[..read]).ok_or_else(|| {
        ExtractionError::UnsupportedFormat {
            archive: archive_name.to_string(),
        }
        .into()
    })
}

/// Extract compressed tar archive using async-compression
async fn extract_compressed_tar(
    path: &Path,
    format: ArchiveFormat,
    dest: &Path,
    archive_name: &str,
) -> Result<usize, Error> {
    use async_compression::tokio::bufread::{BzDecoder, GzipDecoder, XzDecoder};

    let temp_path = path.with_file_name(format!("{archive_name}.unpacked.tar"));

    // Decompress the archive
    {
        let input_file = tokio::fs::File::open(path)
            .await
            .map_err(|e| corrupted(archive_name, &e))?;
        let mut output_file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| write_failed(&temp_path, &e))?;
        let reader = BufReader::new(input_file);

        let copied = match format {
            ArchiveFormat::TarGz => {
                let mut decoder = GzipDecoder::new(reader);
                decoder.multiple_members(true);
                tokio::io::copy(&mut decoder, &mut output_file).await
            }
            ArchiveFormat::TarBz2 => {
                let mut decoder = BzDecoder::new(reader);
                tokio::io::copy(&mut decoder, &mut output_file).await
            }
            ArchiveFormat::TarXz => {
                let mut decoder = XzDecoder::new(reader);
                tokio::io::copy(&mut decoder, &mut output_file).await
            }
            ArchiveFormat::Zip => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "zip archive is not a tar stream",
            )),
        };

        if let Err(e) = copied {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(corrupted(archive_name, &e));
        }

        output_file
            .flush()
            .await
            .map_err(|e| write_failed(&temp_path, &e))?;
    }

    let tar_path = temp_path.clone();
    let dest = dest.to_path_buf();
    let name = archive_name.to_string();
    let result = tokio::task::spawn_blocking(move || unpack_tar(&tar_path, &dest, &name))
        .await
        .map_err(|e| Error::internal(format!("extraction task failed: {e}")));

    let _ = tokio::fs::remove_file(&temp_path).await;
    result?
}

fn unpack_tar(tar_path: &Path, dest: &Path, archive_name: &str) -> Result<usize, Error> {
    let file = File::open(tar_path).map_err(|e| corrupted(archive_name, &e))?;
    let mut archive = tar::Archive::new(file);
    archive.set_preserve_permissions(true);
    archive.set_overwrite(true);

    let mut count = 0;
    for entry in archive.entries().map_err(|e| corrupted(archive_name, &e))? {
        let mut entry = entry.map_err(|e| corrupted(archive_name, &e))?;

        let kind = entry.header().entry_type();
        if kind.is_pax_global_extensions()
            || kind.is_pax_local_extensions()
            || kind.is_gnu_longname()
            || kind.is_gnu_longlink()
        {
            continue;
        }

        let entry_path = entry
            .path()
            .map_err(|e| corrupted(archive_name, &e))?
            .into_owned();
        ensure_relative(&entry_path)?;

        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| corrupted(archive_name, &e))?;
        if !unpacked {
            return Err(ExtractionError::PathEscape {
                entry: entry_path.display().to_string(),
            }
            .into());
        }
        count += 1;
    }

    Ok(count)
}

fn unpack_zip(zip_path: &Path, dest: &Path, archive_name: &str) -> Result<usize, Error> {
    let file = File::open(zip_path).map_err(|e| corrupted(archive_name, &e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| corrupted(archive_name, &e))?;
    let dest_root = dest.canonicalize().map_err(|e| write_failed(dest, &e))?;

    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| corrupted(archive_name, &e))?;

        let Some(relative) = entry.enclosed_name() else {
            return Err(ExtractionError::PathEscape {
                entry: entry.name().to_string(),
            }
            .into());
        };
        // `enclosed_name` keeps `.` and balanced `..` components
        let relative = normalize(&relative);

        if entry.is_dir() {
            create_dirs_inside(&dest_root, dest, &relative, &relative)?;
            count += 1;
            continue;
        }

        let Some(file_name) = relative.file_name() else {
            continue;
        };
        let parent = create_dirs_inside(
            &dest_root,
            dest,
            relative.parent().unwrap_or(Path::new("")),
            &relative,
        )?;
        let outpath = parent.join(file_name);
        clear_for_write(&outpath)?;

        #[cfg(unix)]
        if entry.is_symlink() {
            let mut target = String::new();
            std::io::Read::read_to_string(&mut entry, &mut target)
                .map_err(|e| corrupted(archive_name, &e))?;
            std::os::unix::fs::symlink(&target, &outpath)
                .map_err(|e| write_failed(&outpath, &e))?;
            count += 1;
            continue;
        }

        let mut outfile = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&outpath)
            .map_err(|e| write_failed(&outpath, &e))?;
        // CRC mismatches surface while reading
        std::io::copy(&mut entry, &mut outfile).map_err(|e| corrupted(archive_name, &e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&outpath, std::fs::Permissions::from_mode(mode & 0o7777))
                    .map_err(|e| write_failed(&outpath, &e))?;
            }
        }
        count += 1;
    }

    Ok(count)
}

/// Reject absolute paths and `..` components
fn ensure_relative(path: &Path) -> Result<(), Error> {
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ExtractionError::PathEscape {
            entry: path.display().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Fold `.` and `..` components of an already enclosed path
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(name) => normalized.push(name),
            Component::ParentDir => {
                normalized.pop();
            }
            _ => {}
        }
    }
    normalized
}

/// Create the directories of `relative` below `dest` one component at a
/// time, refusing to pass through a symlink that resolves outside `root`
fn create_dirs_inside(
    root: &Path,
    dest: &Path,
    relative: &Path,
    entry: &Path,
) -> Result<PathBuf, Error> {
    let mut current = dest.to_path_buf();
    for component in relative.components() {
        let Component::Normal(name) = component else {
            continue;
        };
        current.push(name);

        match std::fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => ensure_inside(root, &current, entry)?,
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(write_failed(
                    &current,
                    &std::io::Error::new(
                        std::io::ErrorKind::AlreadyExists,
                        "a file is in the way of a directory",
                    ),
                ))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                std::fs::create_dir(&current).map_err(|e| write_failed(&current, &e))?;
            }
            Err(e) => return Err(write_failed(&current, &e)),
        }
    }
    Ok(current)
}

/// Remove whatever an earlier entry left at `path` so the write cannot
/// follow it
fn clear_for_write(path: &Path) -> Result<(), Error> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Err(write_failed(
            path,
            &std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "a directory is in the way of a file",
            ),
        )),
        Ok(_) => std::fs::remove_file(path).map_err(|e| write_failed(path, &e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(write_failed(path, &e)),
    }
}

/// Reject writes that resolve outside `root` through symlinks
///
/// A link that cannot be resolved is treated as escaping.
fn ensure_inside(root: &Path, link: &Path, entry: &Path) -> Result<(), Error> {
    let escape = || -> Error {
        ExtractionError::PathEscape {
            entry: entry.display().to_string(),
        }
        .into()
    };
    let resolved = link.canonicalize().map_err(|_| escape())?;
    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(escape())
    }
}

/// The single top-level directory if there is one, else `dest` itself
fn source_root(dest: &Path) -> std::io::Result<PathBuf> {
    let mut top_level = Vec::new();
    for entry in std::fs::read_dir(dest)? {
        let entry = entry?;
        let name = entry.file_name();
        if IGNORED_TOP_LEVEL.iter().any(|ignored| name == *ignored) {
            continue;
        }
        top_level.push(entry);
    }

    if let [only] = top_level.as_slice() {
        if only.file_type()?.is_dir() {
            return Ok(only.path());
        }
    }
    Ok(dest.to_path_buf())
}

fn corrupted(archive: &str, e: &impl std::fmt::Display) -> Error {
    ExtractionError::Corrupted {
        archive: archive.to_string(),
        message: e.to_string(),
    }
    .into()
}

fn write_failed(path: &Path, e: &std::io::Error) -> Error {
    ExtractionError::WriteFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    }
    .into()
}
