//! Package-related type definitions

use crate::{ExpectedDigest, SourceLocation, Version};
use keg_errors::BuildError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Permission bits for installed executables: owner rwx, group/other rx
pub const DEFAULT_MODE: u32 = 0o755;

/// Placeholder substituted with the artifact output path
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// One installable release
///
/// Built once per install run from a formula and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    pub version: Version,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub source: SourceLocation,
    pub expected_digest: ExpectedDigest,
    pub build_command: BuildCommand,
    /// Toolchains that must be on `PATH` before building
    pub build_dependencies: Vec<String>,
    /// Directory the executable is placed in
    pub install_path: PathBuf,
    pub mode: u32,
}

impl PackageSpec {
    /// Final location of the installed executable
    #[must_use]
    pub fn target_path(&self) -> PathBuf {
        self.install_path.join(&self.name)
    }

    /// Whether installing this spec twice could produce different bytes
    #[must_use]
    pub fn reproducibility(&self) -> Reproducibility {
        match &self.source {
            SourceLocation::Repository { url, revision: None } => Reproducibility::Unpinned {
                reason: format!("{url} is tracked at HEAD; the source is not pinned to an immutable revision"),
            },
            _ => Reproducibility::Pinned,
        }
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// Whether the source is fixed to immutable content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reproducibility {
    Pinned,
    Unpinned { reason: String },
}

impl Reproducibility {
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        matches!(self, Self::Pinned)
    }
}

/// External toolchain invocation producing the executable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCommand {
    pub program: String,
    /// Argument templates; see [`BuildCommand::render_args`]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl BuildCommand {
    /// `<toolchain> build -o {output}`
    #[must_use]
    pub fn toolchain_default(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec!["build".into(), "-o".into(), OUTPUT_PLACEHOLDER.into()],
            env: BTreeMap::new(),
        }
    }

    /// Build from a formula `install.command` array
    ///
    /// # Errors
    ///
    /// Returns `BuildError::InvalidCommand` if the array is empty or never
    /// mentions `{output}`.
    pub fn from_argv(argv: &[String], env: BTreeMap<String, String>) -> Result<Self, BuildError> {
        let (program, args) = argv.split_first().ok_or_else(|| BuildError::InvalidCommand {
            message: "install.command is empty".to_string(),
        })?;

        if program.trim().is_empty() {
            return Err(BuildError::InvalidCommand {
                message: "install.command has an empty program".to_string(),
            });
        }

        if !args.iter().any(|a| a.contains(OUTPUT_PLACEHOLDER)) {
            return Err(BuildError::InvalidCommand {
                message: format!("install.command must pass {OUTPUT_PLACEHOLDER} to the toolchain"),
            });
        }

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            env,
        })
    }

    /// Substitute `{output}`, `{name}` and `{version}` in every argument
    #[must_use]
    pub fn render_args(&self, output: &Path, name: &str, version: &Version) -> Vec<String> {
        let output = output.display().to_string();
        let version = version.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(OUTPUT_PLACEHOLDER, &output)
                    .replace("{name}", name)
                    .replace("{version}", &version)
            })
            .collect()
    }

    /// Human readable command line
    #[must_use]
    pub fn display_with(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
