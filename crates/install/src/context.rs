//! Per-run settings and event plumbing for the install pipeline

use keg_events::EventSender;
use keg_net::NetConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for one install run that do not come from the formula
#[derive(Clone, Debug)]
pub struct InstallContext {
    /// HTTP client settings for the fetch stage
    pub net_config: NetConfig,
    /// Wall-clock limit for the toolchain
    pub build_timeout: Option<Duration>,
    /// Keep the scratch directory after the run
    pub keep_scratch: bool,
    /// Parent for the scratch directory (system temp dir if unset)
    pub scratch_dir: Option<PathBuf>,

    /// Event sender for progress reporting
    pub event_sender: Option<EventSender>,
}

context_builder! {
    InstallContext {
        net_config: NetConfig,
        build_timeout: Option<Duration>,
        keep_scratch: bool,
        scratch_dir: Option<PathBuf>,
    }
}
