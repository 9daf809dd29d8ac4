#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the keg installer
//!
//! This crate provides the data model shared by every install stage: the
//! immutable [`PackageSpec`], the formula file it is built from, source
//! locations, digests, and the reports produced by a run.

pub mod digest;
pub mod formula;
pub mod package;
pub mod reports;
pub mod source;

// Re-export commonly used types
pub use digest::{DigestAlgorithm, ExpectedDigest};
pub use formula::{Dependency, DependencyKind, Formula, InstallSection};
pub use package::{BuildCommand, PackageSpec, Reproducibility, DEFAULT_MODE};
pub use reports::{InstallReport, SpecSummary, Stage, StageTiming};
pub use semver::Version;
pub use source::{ArchiveFormat, SourceLocation};

use serde::{Deserialize, Serialize};

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    #[default]
    Auto,
    Never,
}

// Implement clap::ValueEnum for ColorChoice
impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}
