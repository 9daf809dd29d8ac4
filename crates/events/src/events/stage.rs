use super::FailureContext;
use keg_types::Stage;
use serde::{Deserialize, Serialize};

/// Lifecycle of the five install stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StageEvent {
    Started {
        stage: Stage,
        package: String,
    },

    Completed {
        stage: Stage,
        package: String,
        duration_ms: u64,
    },

    Failed {
        stage: Stage,
        package: String,
        failure: FailureContext,
    },
}
