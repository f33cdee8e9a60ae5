//! JSON summary of one analysis window.

use crate::{
    input::{load_carry_over, load_stations, load_trips},
    WindowArgs,
};
use fleet_core::{
    carry_over::CarryOver,
    grid::TimelineGrid,
    station::StationDirectory,
    trip::{IngestReport, TripLog},
};
use fleet_data::{detect_fleet_rebalancing, extract_stays, occupancy, Direction, FleetLocationMatrix};
use fleet_utils::dates::format_timestamp;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub window_start: String,
    pub window_end: String,
    pub hours: usize,
    pub vehicles: usize,
    pub trips: usize,
    pub skipped_rows: usize,
    pub stations: usize,
    pub carried_over: usize,
    pub stays: usize,
    pub station_stays: usize,
    pub additions: usize,
    pub removals: usize,
    /// Mean over grid points of the vehicles not docked in the universe.
    pub mean_unaccounted: f64,
}

pub fn summarize(
    log: &TripLog,
    report: IngestReport,
    stations: &StationDirectory,
    carry: &CarryOver,
    grid: &TimelineGrid,
) -> anyhow::Result<RunSummary> {
    let (Some(start), Some(end)) = (grid.start(), grid.end()) else {
        anyhow::bail!("empty analysis window");
    };
    let matrix = FleetLocationMatrix::from_log(log, grid, carry)?;
    let occ = occupancy(&matrix, stations);
    let table = extract_stays(&matrix, stations);
    let rebalancing = detect_fleet_rebalancing(log, grid)?;

    let unaccounted: u64 = (0..grid.len())
        .filter_map(|row| occ.unaccounted(row))
        .map(u64::from)
        .sum();

    Ok(RunSummary {
        window_start: format_timestamp(&start),
        window_end: format_timestamp(&end),
        hours: grid.len(),
        vehicles: matrix.vehicle_count(),
        trips: log.trip_count(),
        skipped_rows: report.skipped,
        stations: stations.len(),
        carried_over: carry.len(),
        stays: table.len(),
        station_stays: table
            .stays()
            .iter()
            .filter(|stay| stay.location.is_station())
            .count(),
        additions: rebalancing.count(Direction::Add),
        removals: rebalancing.count(Direction::Remove),
        mean_unaccounted: unaccounted as f64 / grid.len() as f64,
    })
}

pub fn run_summary(
    window: &WindowArgs,
    stations: Option<&Path>,
    carry_in: Option<&Path>,
) -> anyhow::Result<()> {
    let grid = window.window()?.grid()?;
    let (log, report) = load_trips(&window.trips)?;
    let stations = load_stations(stations, &log)?;
    let carry = load_carry_over(carry_in)?;
    let summary = summarize(&log, report, &stations, &carry, &grid)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
