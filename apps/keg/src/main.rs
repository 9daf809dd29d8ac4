//! keg - build and install executables from verified sources
//!
//! The binary loads configuration and a formula file, then hands the
//! resolved package spec to the install pipeline while rendering its
//! events.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands, GlobalArgs};
use crate::display::{CommandOutput, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use keg_config::Config;
use keg_errors::ConfigError;
use keg_events::EventReceiver;
use keg_install::{inspect, install_package, InstallContext};
use keg_net::NetConfig;
use keg_types::{ColorChoice, Formula, InstallReport, PackageSpec};
use std::path::Path;
use std::process;
use tokio::select;
use tracing::info;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.global, &cli.command);

    logging::init_tracing(cli.global.json, cli.global.debug, &config.log_dir());
    info!("Starting keg v{}", env!("CARGO_PKG_VERSION"));

    let color = cli.global.color.unwrap_or(config.general.color);
    let renderer = OutputRenderer::new(cli.global.json, color);

    let install_dir = cli
        .command
        .target()
        .bin_dir
        .clone()
        .unwrap_or_else(|| config.bin_dir());

    let output = match &cli.command {
        Commands::Info { formula, .. } => {
            let spec = load_spec(formula, install_dir).await?;
            CommandOutput::Summary(inspect(&spec))
        }
        Commands::Install { formula, .. } => {
            let spec = load_spec(formula, install_dir).await?;

            let (event_sender, event_receiver) = keg_events::channel();
            let ctx = InstallContext::new()
                .with_net_config(net_config(&config))
                .with_build_timeout(config.build_timeout())
                .with_keep_scratch(config.build.keep_scratch)
                .with_scratch_dir(config.build.scratch_dir.clone())
                .with_event_sender(event_sender);

            let colors_enabled = match color {
                ColorChoice::Always => true,
                ColorChoice::Never => false,
                ColorChoice::Auto => console::Term::stderr().features().colors_supported(),
            };
            let mut event_handler =
                EventHandler::new(colors_enabled, cli.global.debug, cli.global.json);

            let report =
                install_with_events(&spec, &ctx, event_receiver, &mut event_handler).await?;
            CommandOutput::Installed(report)
        }
    };

    renderer.render_result(&output)?;

    info!("Command completed successfully");
    Ok(())
}

/// Run the install pipeline while rendering its events
async fn install_with_events(
    spec: &PackageSpec,
    ctx: &InstallContext,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<InstallReport, CliError> {
    let mut install_future = Box::pin(install_package(spec, ctx));

    loop {
        select! {
            result = &mut install_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result.map_err(CliError::from);
            }

            Some(event) = event_receiver.recv() => {
                event_handler.handle_event(event);
            }
        }
    }
}

/// Read a formula file and resolve it into a spec installing into `install_dir`
///
/// The formula's file stem names the package unless the formula sets `name`.
async fn load_spec(path: &Path, install_dir: std::path::PathBuf) -> Result<PackageSpec, CliError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|_| ConfigError::NotFound {
            path: path.display().to_string(),
        })?;

    let formula = Formula::from_toml_str(&contents, &path.display().to_string())?;
    let stem = path.file_stem().and_then(|s| s.to_str());
    Ok(formula.into_spec(stem, install_dir)?)
}

fn net_config(config: &Config) -> NetConfig {
    NetConfig {
        timeout: config.network.timeout(),
        connect_timeout: config.network.connect_timeout(),
        retry_count: config.network.retries,
        retry_delay: config.network.retry_delay(),
        user_agent: config.network.user_agent.clone(),
        ..NetConfig::default()
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &GlobalArgs, command: &Commands) {
    // Global CLI flags override everything
    if let Some(color) = global.color {
        config.general.color = color;
    }

    if let Some(prefix) = &command.target().prefix {
        config.paths.prefix = Some(prefix.clone());
    }

    // Command-specific CLI flags
    if let Commands::Install {
        keep_scratch,
        build_timeout,
        ..
    } = command
    {
        if *keep_scratch {
            config.build.keep_scratch = true;
        }
        if let Some(secs) = build_timeout {
            config.build.timeout = (*secs > 0).then_some(*secs);
        }
    }
}
