#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for keg
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/keg/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary after `merge_env`)

pub mod constants;

use keg_errors::{ConfigError, Error};
use keg_types::ColorChoice;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

/// General configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildConfig {
    /// Wall-clock limit for the toolchain in seconds; unset means no limit
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Keep the scratch directory after the run for inspection
    #[serde(default)]
    pub keep_scratch: bool,
    /// Parent directory for scratch workspaces (system temp dir if unset)
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub prefix: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            color: ColorChoice::Auto,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
            user_agent: default_user_agent(),
        }
    }
}

impl NetworkConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay)
    }
}

// Default value functions for serde
fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_timeout() -> u64 {
    300 // 5 minutes
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1 // 1 second
}

fn default_user_agent() -> String {
    constants::DEFAULT_USER_AGENT.to_string()
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join(constants::APP_DIR)
            .join(constants::CONFIG_FILE))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        Self::from_toml_str(&contents, path)
    }

    /// Parse configuration from TOML text; `origin` is only used in errors.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` for invalid TOML or unknown keys.
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, Error> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError {
                path: origin.display().to_string(),
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if fs::try_exists(&config_path).await.unwrap_or(false) {
            tracing::debug!(path = %config_path.display(), "loading config");
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// If path is provided, loads from that file and a missing file is an
    /// error. If path is None, uses the default loading behavior.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // KEG_PREFIX
        if let Ok(prefix) = std::env::var("KEG_PREFIX") {
            if prefix.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "KEG_PREFIX".to_string(),
                    value: prefix,
                }
                .into());
            }
            self.paths.prefix = Some(PathBuf::from(prefix));
        }

        // KEG_COLOR
        if let Ok(color) = std::env::var("KEG_COLOR") {
            self.general.color = match color.as_str() {
                "always" => ColorChoice::Always,
                "auto" => ColorChoice::Auto,
                "never" => ColorChoice::Never,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "KEG_COLOR".to_string(),
                        value: color,
                    }
                    .into())
                }
            };
        }

        // KEG_BUILD_TIMEOUT (0 disables the limit)
        if let Ok(timeout) = std::env::var("KEG_BUILD_TIMEOUT") {
            let secs: u64 = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                field: "KEG_BUILD_TIMEOUT".to_string(),
                value: timeout,
            })?;
            self.build.timeout = (secs > 0).then_some(secs);
        }

        // KEG_RETRIES
        if let Ok(retries) = std::env::var("KEG_RETRIES") {
            self.network.retries = retries.parse().map_err(|_| ConfigError::InvalidValue {
                field: "KEG_RETRIES".to_string(),
                value: retries,
            })?;
        }

        // KEG_KEEP_SCRATCH
        if let Ok(keep) = std::env::var("KEG_KEEP_SCRATCH") {
            self.build.keep_scratch = match keep.as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "KEG_KEEP_SCRATCH".to_string(),
                        value: keep,
                    }
                    .into())
                }
            };
        }

        Ok(())
    }

    /// Install prefix (with default `~/.local`)
    #[must_use]
    pub fn prefix(&self) -> PathBuf {
        self.paths.prefix.clone().unwrap_or_else(|| {
            dirs::home_dir().map_or_else(
                || PathBuf::from(constants::FALLBACK_PREFIX),
                |home| home.join(".local"),
            )
        })
    }

    /// Directory that receives installed executables
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.prefix().join(constants::BIN_SUBDIR)
    }

    /// Directory for debug log files
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.paths.log_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(constants::APP_DIR)
                .join(constants::LOGS_SUBDIR)
        })
    }

    /// Toolchain wall-clock limit, if any
    #[must_use]
    pub fn build_timeout(&self) -> Option<Duration> {
        self.build.timeout.map(Duration::from_secs)
    }
}
