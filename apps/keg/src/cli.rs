//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use keg_types::ColorChoice;
use std::path::PathBuf;

/// keg - build and install executables from verified sources
#[derive(Parser)]
#[command(name = "keg")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build and install executables from verified sources")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Write debug logs to the log directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Where the executable goes
#[derive(Args, Clone, Default)]
pub struct TargetArgs {
    /// Install prefix; the executable goes to PREFIX/bin
    #[arg(long, value_name = "DIR")]
    pub prefix: Option<PathBuf>,

    /// Install directly into DIR (overrides --prefix)
    #[arg(long, value_name = "DIR")]
    pub bin_dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, verify, build and install a formula
    #[command(alias = "i")]
    Install {
        /// Path to the formula file (.toml)
        formula: PathBuf,

        #[command(flatten)]
        target: TargetArgs,

        /// Keep the scratch directory after the run
        #[arg(long)]
        keep_scratch: bool,

        /// Kill the toolchain after SECS seconds (0 = no limit)
        #[arg(long, value_name = "SECS")]
        build_timeout: Option<u64>,
    },

    /// Show what installing a formula would do, without fetching
    Info {
        /// Path to the formula file (.toml)
        formula: PathBuf,

        #[command(flatten)]
        target: TargetArgs,
    },
}

impl Commands {
    pub fn target(&self) -> &TargetArgs {
        match self {
            Self::Install { target, .. } | Self::Info { target, .. } => target,
        }
    }
}
