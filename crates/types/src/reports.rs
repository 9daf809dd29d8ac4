//! Report type definitions for install runs

use crate::{DigestAlgorithm, Reproducibility, SourceLocation, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The ordered stages of one install run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Resolve,
    Verify,
    Extract,
    Build,
    Install,
}

impl Stage {
    /// Every stage in execution order
    pub const ALL: [Stage; 5] = [
        Stage::Resolve,
        Stage::Verify,
        Stage::Extract,
        Stage::Build,
        Stage::Install,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Verify => "verify",
            Self::Extract => "extract",
            Self::Build => "build",
            Self::Install => "install",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall time spent in one stage
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_ms: u64,
}

/// Installation report
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstallReport {
    pub name: String,
    pub version: Version,
    /// Where the executable now lives
    pub path: PathBuf,
    pub algorithm: DigestAlgorithm,
    /// Verified digest of the fetched source, lowercase hex
    pub digest: String,
    /// Permission bits of the installed file
    pub mode: u32,
    pub size: u64,
    pub reproducibility: Reproducibility,
    pub stages: Vec<StageTiming>,
    /// Total execution time
    pub duration_ms: u64,
}

/// What an install would do, computed without touching the network
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpecSummary {
    pub name: String,
    pub version: Version,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub source: SourceLocation,
    pub expected_digest: String,
    pub build_dependencies: Vec<String>,
    /// Command line with `{output}` pointing at the staging location
    pub build_command: String,
    pub target: PathBuf,
    pub mode: u32,
    pub reproducibility: Reproducibility,
}
