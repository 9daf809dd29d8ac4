//! Fallback locations used when neither the config file nor the
//! environment names a path.

/// Install prefix when no home directory can be determined.
pub const FALLBACK_PREFIX: &str = "/usr/local";

/// Subdirectory of the prefix that receives executables.
pub const BIN_SUBDIR: &str = "bin";

/// Application directory name under the platform config/data dirs.
pub const APP_DIR: &str = "keg";

pub const CONFIG_FILE: &str = "config.toml";

pub const LOGS_SUBDIR: &str = "logs";

pub const DEFAULT_USER_AGENT: &str = concat!("keg/", env!("CARGO_PKG_VERSION"));
