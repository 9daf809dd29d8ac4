//! Structured logging integration for events
//!
//! Every event shown to the user is also recorded through `tracing` with
//! structured fields, so `--debug` log files carry the full run.

use keg_events::{AppEvent, BuildEvent, DownloadEvent, GeneralEvent, StageEvent};
use tracing::{debug, error, info, trace, warn};

/// Log an `AppEvent` at the level matching its severity
pub fn log_event_with_tracing(event: &AppEvent) {
    match event {
        AppEvent::General(general) => match general {
            GeneralEvent::Warning { message, context } => {
                warn!(context = ?context, "{message}");
            }
            GeneralEvent::DebugLog { message } => {
                debug!("{message}");
            }
        },

        AppEvent::Stage(stage_event) => match stage_event {
            StageEvent::Started { stage, package } => {
                info!(stage = %stage, package = %package, "Stage started");
            }
            StageEvent::Completed {
                stage,
                package,
                duration_ms,
            } => {
                info!(
                    stage = %stage,
                    package = %package,
                    duration_ms,
                    "Stage completed"
                );
            }
            StageEvent::Failed {
                stage,
                package,
                failure,
            } => {
                error!(
                    stage = %stage,
                    package = %package,
                    retryable = failure.retryable,
                    code = ?failure.code,
                    message = %failure.message,
                    hint = ?failure.hint,
                    "Stage failed"
                );
            }
        },

        AppEvent::Download(download_event) => match download_event {
            DownloadEvent::Started { url, total_size } => {
                info!(url = %url, total_size = ?total_size, "Download started");
            }
            DownloadEvent::Progress {
                url,
                bytes_downloaded,
                total_bytes,
            } => {
                trace!(
                    url = %url,
                    bytes_downloaded,
                    total_bytes = ?total_bytes,
                    "Download progress"
                );
            }
            DownloadEvent::Completed {
                url,
                final_size,
                hash,
            } => {
                info!(url = %url, final_size, hash = %hash, "Download completed");
            }
            DownloadEvent::Retrying {
                url,
                attempt,
                max_attempts,
                reason,
            } => {
                warn!(
                    url = %url,
                    attempt,
                    max_attempts,
                    reason = %reason,
                    "Download retrying"
                );
            }
        },

        AppEvent::Build(build_event) => match build_event {
            BuildEvent::CommandStarted {
                command,
                working_dir,
            } => {
                info!(
                    command = %command,
                    working_dir = %working_dir.display(),
                    "Build command started"
                );
            }
            BuildEvent::CommandFinished {
                command,
                exit_code,
                duration_ms,
            } => {
                info!(
                    command = %command,
                    exit_code = ?exit_code,
                    duration_ms,
                    "Build command finished"
                );
            }
        },
    }
}

/// Initialize tracing
///
/// With `--debug` (or `RUST_LOG` set) JSON logs go to a timestamped file
/// under `log_dir`. Otherwise tracing is discarded: everything a normal run
/// shows on stderr comes from the event renderer and the final error report.
pub fn init_tracing(json_mode: bool, debug_flag: bool, log_dir: &std::path::Path) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_flag;

    if debug_enabled {
        if let Some(file) = open_log_file(log_dir, !json_mode) {
            tracing_subscriber::fmt()
                .json()
                .with_writer(file)
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                        tracing_subscriber::EnvFilter::new("info,keg=debug,keg_install=debug")
                    }),
                )
                .init();
            return;
        }
    }

    if debug_enabled && !json_mode {
        // No log file could be opened
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    }
}

fn open_log_file(log_dir: &std::path::Path, announce: bool) -> Option<std::fs::File> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        if announce {
            eprintln!("Warning: Failed to create log directory: {e}");
        }
        return None;
    }

    let log_file = log_dir.join(format!(
        "keg-{}.log",
        chrono::Utc::now().format("%Y%m%d-%H%M%S")
    ));

    match std::fs::File::create(&log_file) {
        Ok(file) => {
            if announce {
                eprintln!("Debug logging enabled: {}", log_file.display());
            }
            Some(file)
        }
        Err(e) => {
            if announce {
                eprintln!("Warning: Failed to create log file: {e}");
            }
            None
        }
    }
}
