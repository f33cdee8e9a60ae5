//! Fleet CLI - hourly vehicle locations, occupancy, stays and rebalancing
//! from bike-share trip logs.

use clap::Parser;
use log::debug;

#[derive(Parser)]
#[command(
    name = "fleet-cli",
    version,
    about = "Shared-fleet trip log analysis toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: fleet_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    debug!("fleet-cli {}", env!("CARGO_PKG_VERSION"));
    fleet_cmd::run(cli.command)
}
