//! Commands built on the fleet location matrix.

use crate::{
    input::{create_output, load_carry_over, load_stations, load_trips},
    WindowArgs,
};
use anyhow::Context;
use fleet_core::{carry_over::CarryOver, grid::TimelineGrid, trip::TripLog};
use fleet_data::{extract_stays, occupancy, FleetLocationMatrix};
use fleet_utils::dates::format_timestamp;
use log::info;
use std::path::Path;

/// Load the trips of `window` and resample them onto its grid.
pub fn build_matrix(
    window: &WindowArgs,
    carry: &CarryOver,
) -> anyhow::Result<(TripLog, TimelineGrid, FleetLocationMatrix)> {
    let config = window.window()?;
    let grid = config.grid()?;
    info!(
        "Window of {} hours from {}",
        grid.len(),
        format_timestamp(&config.start)
    );
    let (log, _) = load_trips(&window.trips)?;
    let matrix = FleetLocationMatrix::from_log(&log, &grid, carry)?;
    Ok((log, grid, matrix))
}

pub fn run_reconstruct(
    window: &WindowArgs,
    output: &Path,
    carry_in: Option<&Path>,
    carry_out: Option<&Path>,
) -> anyhow::Result<()> {
    let carry = load_carry_over(carry_in)?;
    let (_, _, matrix) = build_matrix(window, &carry)?;

    matrix
        .write_csv(create_output(output)?)
        .with_context(|| format!("writing {}", output.display()))?;
    info!("Location matrix written to {}", output.display());

    if let Some(path) = carry_out {
        let next = matrix.carry_over();
        next.write_csv(create_output(path)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("{} carry-over locations written to {}", next.len(), path.display());
    }
    Ok(())
}

pub fn run_occupancy(
    window: &WindowArgs,
    stations: Option<&Path>,
    output: &Path,
    profile: Option<&Path>,
) -> anyhow::Result<()> {
    let (log, _, matrix) = build_matrix(window, &CarryOver::new())?;
    let stations = load_stations(stations, &log)?;
    let occ = occupancy(&matrix, &stations);

    occ.write_csv(create_output(output)?)
        .with_context(|| format!("writing {}", output.display()))?;
    info!("Station occupancy written to {}", output.display());

    if let Some(path) = profile {
        occ.write_profile_csv(create_output(path)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("Weekday profile written to {}", path.display());
    }
    Ok(())
}

pub fn run_stays(
    window: &WindowArgs,
    stations: Option<&Path>,
    stays_csv: &Path,
    histogram_csv: &Path,
) -> anyhow::Result<()> {
    let (log, _, matrix) = build_matrix(window, &CarryOver::new())?;
    let stations = load_stations(stations, &log)?;
    let table = extract_stays(&matrix, &stations);
    info!("{} stays over {} vehicles", table.len(), matrix.vehicle_count());

    table
        .write_stays_csv(create_output(stays_csv)?)
        .with_context(|| format!("writing {}", stays_csv.display()))?;
    table
        .write_histogram_csv(create_output(histogram_csv)?)
        .with_context(|| format!("writing {}", histogram_csv.display()))?;
    info!(
        "Stays written to {} and {}",
        stays_csv.display(),
        histogram_csv.display()
    );
    Ok(())
}
