//! Streaming source downloads that hash while they write

use crate::client::NetClient;
use futures::StreamExt;
use keg_errors::{Error, FetchError};
use keg_events::{AppEvent, DownloadEvent, EventEmitter};
use keg_hash::{DigestAlgorithm, Hash, Hasher};
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::fs::{self as tokio_fs, File};
use tokio::io::AsyncWriteExt;
use url::Url;

/// Outcome of a completed download
#[derive(Debug, Clone)]
pub struct DownloadResult {
    /// Digest of the bytes written to disk
    pub hash: Hash,
    pub size: u64,
}

/// Download `url` into `dest`, computing `algorithm` over the bytes as they
/// are written.
///
/// `http`/`https` go through the retrying client; `file` URLs are copied
/// from the local filesystem. A partially written `dest` is removed on error.
///
/// # Errors
///
/// Returns `FetchError::HttpStatus` for a non-2xx response,
/// `FetchError::UnsupportedScheme` for anything but http/https/file, and
/// transport or write failures otherwise.
pub async fn download_file<E>(
    client: &NetClient,
    url: &Url,
    dest: &Path,
    algorithm: DigestAlgorithm,
    events: &E,
) -> Result<DownloadResult, Error>
where
    E: EventEmitter + ?Sized,
{
    let result = match url.scheme() {
        "http" | "https" => stream_http(client, url, dest, algorithm, events).await,
        "file" => copy_local(url, dest, algorithm, events).await,
        other => Err(FetchError::UnsupportedScheme {
            url: url.to_string(),
            scheme: other.to_string(),
        }
        .into()),
    };

    match result {
        Ok(result) => {
            events.emit(AppEvent::Download(DownloadEvent::Completed {
                url: url.to_string(),
                final_size: result.size,
                hash: format!("{}:{}", result.hash.algorithm(), result.hash.to_hex()),
            }));
            Ok(result)
        }
        Err(e) => {
            let _ = tokio_fs::remove_file(dest).await;
            Err(e)
        }
    }
}

async fn create_dest(dest: &Path) -> Result<File, Error> {
    File::create(dest).await.map_err(|e| {
        FetchError::WriteFailed {
            path: dest.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

fn write_failed(dest: &Path, e: &std::io::Error) -> Error {
    FetchError::WriteFailed {
        path: dest.display().to_string(),
        message: e.to_string(),
    }
    .into()
}

/// Handle progress reporting during download
fn should_report_progress(first_chunk: bool, last_update: &Instant) -> bool {
    first_chunk || last_update.elapsed() >= Duration::from_millis(50)
}

async fn stream_http<E>(
    client: &NetClient,
    url: &Url,
    dest: &Path,
    algorithm: DigestAlgorithm,
    events: &E,
) -> Result<DownloadResult, Error>
where
    E: EventEmitter + ?Sized,
{
    let response = client.get(url, events).await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("unknown").to_string(),
        }
        .into());
    }

    let total_size = response.content_length();
    events.emit(AppEvent::Download(DownloadEvent::Started {
        url: url.to_string(),
        total_size,
    }));
    tracing::debug!(%url, ?total_size, "download started");

    let mut file = create_dest(dest).await?;
    let mut hasher = Hasher::new(algorithm);
    let mut downloaded = 0u64;
    let mut last_progress_update = Instant::now();
    let mut first_chunk = true;

    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::DownloadFailed {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        hasher.update(&chunk);
        file.write_all(&chunk)
            .await
            .map_err(|e| write_failed(dest, &e))?;
        downloaded += chunk.len() as u64;

        if should_report_progress(first_chunk, &last_progress_update) {
            events.emit(AppEvent::Download(DownloadEvent::Progress {
                url: url.to_string(),
                bytes_downloaded: downloaded,
                total_bytes: total_size,
            }));
            last_progress_update = Instant::now();
            first_chunk = false;
        }
    }

    file.flush().await.map_err(|e| write_failed(dest, &e))?;

    Ok(DownloadResult {
        hash: hasher.finalize(),
        size: downloaded,
    })
}

async fn copy_local<E>(
    url: &Url,
    dest: &Path,
    algorithm: DigestAlgorithm,
    events: &E,
) -> Result<DownloadResult, Error>
where
    E: EventEmitter + ?Sized,
{
    let source = url
        .to_file_path()
        .map_err(|()| FetchError::InvalidUrl(url.to_string()))?;

    let reader = File::open(&source)
        .await
        .map_err(|e| FetchError::DownloadFailed {
            url: url.to_string(),
            message: e.to_string(),
        })?;
    let total_size = reader.metadata().await.ok().map(|m| m.len());
    events.emit(AppEvent::Download(DownloadEvent::Started {
        url: url.to_string(),
        total_size,
    }));

    let writer = create_dest(dest).await?;
    let (hash, size) = Hash::hash_and_copy(algorithm, reader, writer)
        .await
        .map_err(|e| FetchError::DownloadFailed {
            url: url.to_string(),
            message: format!("copying to {}: {e}", dest.display()),
        })?;

    Ok(DownloadResult { hash, size })
}
