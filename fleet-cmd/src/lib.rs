//! Command implementations for the fleet CLI.
//!
//! Every command reads a trip log, resamples it onto the hourly grid of
//! one analysis window and writes the derived tables as CSV.

use clap::{Args, Subcommand};
use fleet_core::grid::WindowConfig;
use std::path::PathBuf;

pub mod input;
pub mod locations;
pub mod rebalance;
pub mod summary;

/// Flags shared by every command: the trip log and the analysis window.
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Trip log CSV, optionally gzip-compressed (`.csv.gz`)
    #[arg(short = 't', long)]
    pub trips: PathBuf,

    /// First hour of the window, `YYYY-MM-DD` or a full timestamp
    #[arg(short = 's', long)]
    pub start: String,

    /// Window length in 31-day months
    #[arg(short = 'm', long, default_value_t = 1, allow_negative_numbers = true)]
    pub months: i64,
}

impl WindowArgs {
    pub fn window(&self) -> anyhow::Result<WindowConfig> {
        Ok(WindowConfig::parse(&self.start, self.months)?)
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Write the hourly location of every vehicle
    Reconstruct {
        #[command(flatten)]
        window: WindowArgs,

        /// Output path for the location matrix CSV
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Locations carried over from the previous window
        #[arg(long)]
        carry_in: Option<PathBuf>,

        /// Write the locations at the last hour, to seed the next window
        #[arg(long)]
        carry_out: Option<PathBuf>,
    },

    /// Count vehicles docked at each station every hour
    Occupancy {
        #[command(flatten)]
        window: WindowArgs,

        /// Station universe CSV; derived from the trip log when omitted
        #[arg(long)]
        stations: Option<PathBuf>,

        /// Output path for the hourly station counts CSV
        #[arg(short = 'o', long)]
        output: PathBuf,

        /// Output path for the weekday mean by hour of day
        #[arg(long)]
        profile: Option<PathBuf>,
    },

    /// Split every vehicle's hourly locations into stays
    Stays {
        #[command(flatten)]
        window: WindowArgs,

        /// Station universe CSV; derived from the trip log when omitted
        #[arg(long)]
        stations: Option<PathBuf>,

        /// Output path for one row per stay
        #[arg(long)]
        stays_csv: PathBuf,

        /// Output path for per-vehicle stay duration counts
        #[arg(long)]
        histogram_csv: PathBuf,
    },

    /// Detect vehicles moved between trips by the operator
    Rebalance {
        #[command(flatten)]
        window: WindowArgs,

        /// Output path for the hourly addition table
        #[arg(long)]
        adds: PathBuf,

        /// Output path for the hourly removal table
        #[arg(long)]
        removes: PathBuf,

        /// Output path for the full event list
        #[arg(long)]
        events: Option<PathBuf>,
    },

    /// Print a JSON summary of the window to stdout
    Summary {
        #[command(flatten)]
        window: WindowArgs,

        /// Station universe CSV; derived from the trip log when omitted
        #[arg(long)]
        stations: Option<PathBuf>,

        /// Locations carried over from the previous window
        #[arg(long)]
        carry_in: Option<PathBuf>,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Reconstruct {
            window,
            output,
            carry_in,
            carry_out,
        } => locations::run_reconstruct(
            &window,
            &output,
            carry_in.as_deref(),
            carry_out.as_deref(),
        ),
        Command::Occupancy {
            window,
            stations,
            output,
            profile,
        } => locations::run_occupancy(&window, stations.as_deref(), &output, profile.as_deref()),
        Command::Stays {
            window,
            stations,
            stays_csv,
            histogram_csv,
        } => locations::run_stays(&window, stations.as_deref(), &stays_csv, &histogram_csv),
        Command::Rebalance {
            window,
            adds,
            removes,
            events,
        } => rebalance::run_rebalance(&window, &adds, &removes, events.as_deref()),
        Command::Summary {
            window,
            stations,
            carry_in,
        } => summary::run_summary(&window, stations.as_deref(), carry_in.as_deref()),
    }
}
