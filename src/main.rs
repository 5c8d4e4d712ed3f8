//! # winsync
//!
//! Command-line driver: runs a synchronizer against the in-memory host and
//! client and prints the host command stream a scenario produces.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::{info, warn};
use winsync::SyncConfig;

mod demo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scenario {
    /// Show windows around an off-screen sibling
    Stacking,
    /// Host-initiated move, then a refused resize
    Feedback,
    /// Quit request with one window vetoing
    Quit,
}

#[derive(Parser)]
#[command(name = "winsync")]
#[command(about = "Synchronizes a client window model with a host window system")]
#[command(version)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    "\nbuilt:  ", env!("BUILD_DATE"),
    "\ncommit: ", env!("GIT_COMMIT"),
    "\ntarget: ", env!("TARGET_TRIPLE"),
))]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/winsync/winsync.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Print host commands as JSON lines
    #[arg(long)]
    json: bool,

    /// Scenario to run
    #[arg(short, long, value_enum, default_value = "stacking")]
    scenario: Scenario,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // the config may turn on debug logging, so it is read before the logger exists
    let loaded = SyncConfig::load(&cli.config);
    let debug = cli.debug || loaded.as_ref().is_ok_and(|config| config.general.debug);
    winsync::logging::init(debug)?;

    info!("starting winsync {}", winsync::VERSION);

    let config = match loaded {
        Ok(config) => {
            info!("configuration loaded from {}", cli.config);
            config
        }
        Err(e) => {
            warn!("failed to load configuration: {:#}", e);
            info!("using default configuration");
            SyncConfig::default()
        }
    };

    let commands = demo::run(cli.scenario, config)?;
    demo::print(&commands, cli.json)?;

    info!("{:?} scenario issued {} host commands", cli.scenario, commands.len());
    Ok(())
}
