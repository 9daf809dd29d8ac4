use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Toolchain invocation events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BuildEvent {
    CommandStarted {
        command: String,
        working_dir: PathBuf,
    },

    CommandFinished {
        command: String,
        exit_code: Option<i32>,
        duration_ms: u64,
    },
}
