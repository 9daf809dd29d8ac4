//! Deterministic digests over checked-out source trees
//!
//! A repository checkout has no single byte stream to hash. Its digest is
//! computed over every regular file and symlink below the root, ordered by
//! `/`-separated relative path, with `.git` directories excluded:
//!
//! - file: `"f\0" path "\0" len "\0" contents`
//! - symlink: `"l\0" path "\0" target "\0"`

use crate::{DigestAlgorithm, Hash, Hasher, CHUNK_SIZE};
use keg_errors::{Error, IntegrityError};
use std::io::Read;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

enum TreeEntry {
    File(PathBuf),
    Symlink(PathBuf),
}

/// Hash a directory tree
///
/// # Errors
/// Returns `IntegrityError::Unreadable` if the tree cannot be walked or any
/// entry cannot be read.
pub async fn hash_tree(algorithm: DigestAlgorithm, root: &Path) -> Result<Hash, Error> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || hash_tree_blocking(algorithm, &root))
        .await
        .map_err(|e| Error::internal(format!("tree hashing task failed: {e}")))?
}

fn hash_tree_blocking(algorithm: DigestAlgorithm, root: &Path) -> Result<Hash, Error> {
    let unreadable = |path: &Path, message: String| IntegrityError::Unreadable {
        path: path.display().to_string(),
        message,
    };

    let mut entries: Vec<(String, TreeEntry)> = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.depth() > 0 && e.file_type().is_dir() && e.file_name() == ".git"));

    for entry in walker {
        let entry = entry.map_err(|e| unreadable(root, e.to_string()))?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| unreadable(entry.path(), e.to_string()))?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let kind = if file_type.is_symlink() {
            TreeEntry::Symlink(entry.into_path())
        } else {
            TreeEntry::File(entry.into_path())
        };
        entries.push((key, kind));
    }

    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Hasher::new(algorithm);
    let mut buffer = vec![0; CHUNK_SIZE];

    for (key, kind) in &entries {
        match kind {
            TreeEntry::Symlink(path) => {
                let target =
                    std::fs::read_link(path).map_err(|e| unreadable(path, e.to_string()))?;
                hasher.update(b"l\0");
                hasher.update(key.as_bytes());
                hasher.update(b"\0");
                hasher.update(target.to_string_lossy().as_bytes());
                hasher.update(b"\0");
            }
            TreeEntry::File(path) => {
                let mut file =
                    std::fs::File::open(path).map_err(|e| unreadable(path, e.to_string()))?;
                let len = file
                    .metadata()
                    .map_err(|e| unreadable(path, e.to_string()))?
                    .len();

                hasher.update(b"f\0");
                hasher.update(key.as_bytes());
                hasher.update(b"\0");
                hasher.update(len.to_string().as_bytes());
                hasher.update(b"\0");

                loop {
                    let n = file
                        .read(&mut buffer)
                        .map_err(|e| unreadable(path, e.to_string()))?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
            }
        }
    }

    Ok(hasher.finalize())
}
