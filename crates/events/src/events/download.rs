use serde::{Deserialize, Serialize};

/// Download-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    Started {
        url: String,
        total_size: Option<u64>,
    },

    Progress {
        url: String,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    Completed {
        url: String,
        final_size: u64,
        /// Digest computed while streaming, `algorithm:hex`
        hash: String,
    },

    /// A transient failure is being retried by the HTTP client
    Retrying {
        url: String,
        attempt: u32,
        max_attempts: u32,
        reason: String,
    },
}
