//! `minefleet` binary: operator console and single-truck cockpit.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use minefleet_config::{Config, ConfigLoad, ConfigLoader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cockpit;
mod intent;
mod operator;
mod render;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "minefleet")]
#[command(
    about = "Operator console for a simulated fleet of autonomous mine trucks"
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
struct ConfigArgs {
    /// Path to the TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Load environment overrides from this .env file
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Supervise the simulation and plan routes from stdin commands
    Run(RunArgs),
    /// Drive a single truck over the point-to-point link
    Cockpit(CockpitArgs),
}

#[derive(ClapArgs, Debug, Clone)]
struct RunArgs {
    /// Number of trucks (overrides config)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    fleet_size: Option<u32>,

    /// Broker URL (overrides config)
    #[arg(long)]
    broker_url: Option<String>,
}

impl RunArgs {
    fn apply(self, config: &mut Config) {
        if let Some(size) = self.fleet_size {
            config.fleet.size = size;
        }
        if let Some(url) = self.broker_url {
            config.broker.url = url;
        }
    }
}

#[derive(ClapArgs, Debug, Clone)]
struct CockpitArgs {
    /// Controller address, host:port (overrides config)
    #[arg(long)]
    addr: Option<String>,

    /// Truck driven over the link (overrides config)
    #[arg(long)]
    truck: Option<u32>,
}

impl CockpitArgs {
    fn apply(self, config: &mut Config) {
        if let Some(addr) = self.addr {
            config.framed.addr = addr;
        }
        if let Some(truck) = self.truck {
            config.framed.truck_id = truck;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "info,minefleet_core=info,minefleet_console=info".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = load_config(&cli.config)?;
    match cli.command {
        Command::Run(args) => {
            args.apply(&mut config);
            operator::run(config).await
        }
        Command::Cockpit(args) => {
            args.apply(&mut config);
            cockpit::run(config).await
        }
    }
}

fn load_config(args: &ConfigArgs) -> anyhow::Result<Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = args.config.clone() {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = args.env_file.clone() {
        loader = loader.with_env_file(path);
    }
    let ConfigLoad { config, warnings } =
        loader.load().context("failed to load configuration")?;

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = config.metadata.config_path.as_ref() {
        info!(path = %path.display(), "configuration file loaded");
    }
    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => warn!(message = %warning.message, "configuration warning"),
        }
    }
    Ok(config)
}
