//! Vehicles per station per hour.

use crate::{descriptive::weekday_hourly_mean, matrix::FleetLocationMatrix};
use chrono::NaiveDateTime;
use csv::WriterBuilder;
use fleet_core::{
    grid::TimelineGrid, ids::StationId, location::Location, station::StationDirectory, Result,
};
use fleet_utils::dates::format_timestamp;
use std::io::Write;

/// Per grid point, the number of vehicles docked at each station of the
/// universe, plus the pseudo-stations that are not a known dock.
#[derive(Debug, Clone, PartialEq)]
pub struct StationOccupancy {
    grid: TimelineGrid,
    stations: Vec<StationId>,
    /// `counts[row][position of station]`
    counts: Vec<Vec<u32>>,
    transit: Vec<u32>,
    unobserved: Vec<u32>,
    /// Docked at a station outside the universe.
    unknown: Vec<u32>,
    vehicle_count: usize,
}

/// Tally the matrix against the station universe.
///
/// Every station of `stations` gets a count at every hour, zero included.
pub fn occupancy(matrix: &FleetLocationMatrix, stations: &StationDirectory) -> StationOccupancy {
    let hours = matrix.grid().len();
    let mut counts = vec![vec![0u32; stations.len()]; hours];
    let mut transit = vec![0u32; hours];
    let mut unobserved = vec![0u32; hours];
    let mut unknown = vec![0u32; hours];

    for (_, column) in matrix.columns() {
        for (row, value) in column.iter().enumerate() {
            match value {
                Location::Station(station) => match stations.position(*station) {
                    Some(position) => counts[row][position] += 1,
                    None => unknown[row] += 1,
                },
                Location::Transit => transit[row] += 1,
                Location::Unobserved => unobserved[row] += 1,
            }
        }
    }

    StationOccupancy {
        grid: matrix.grid().clone(),
        stations: stations.ids().collect(),
        counts,
        transit,
        unobserved,
        unknown,
        vehicle_count: matrix.vehicle_count(),
    }
}

/// Vehicles at `ts` that are not docked at a station of the universe:
/// in transit, unobserved, or at an unknown station. `None` if `ts` is
/// not a grid point.
pub fn unaccounted_count(
    matrix: &FleetLocationMatrix,
    stations: &StationDirectory,
    ts: &NaiveDateTime,
) -> Option<usize> {
    let row = matrix.row_at(ts)?;
    Some(
        row.iter()
            .filter(|value| match value {
                Location::Station(station) => !stations.contains(*station),
                _ => true,
            })
            .count(),
    )
}

impl StationOccupancy {
    pub fn grid(&self) -> &TimelineGrid {
        &self.grid
    }

    pub fn stations(&self) -> &[StationId] {
        &self.stations
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicle_count
    }

    /// Station counts at one grid index, in universe order.
    pub fn row(&self, row: usize) -> Option<&[u32]> {
        self.counts.get(row).map(Vec::as_slice)
    }

    pub fn count(&self, row: usize, station: StationId) -> Option<u32> {
        let position = self.stations.iter().position(|s| *s == station)?;
        self.counts.get(row).map(|counts| counts[position])
    }

    pub fn station_series(&self, station: StationId) -> Option<Vec<u32>> {
        let position = self.stations.iter().position(|s| *s == station)?;
        Some(self.counts.iter().map(|counts| counts[position]).collect())
    }

    pub fn docked(&self, row: usize) -> Option<u32> {
        self.row(row).map(|counts| counts.iter().sum())
    }

    pub fn transit(&self, row: usize) -> Option<u32> {
        self.transit.get(row).copied()
    }

    pub fn unobserved(&self, row: usize) -> Option<u32> {
        self.unobserved.get(row).copied()
    }

    pub fn unknown(&self, row: usize) -> Option<u32> {
        self.unknown.get(row).copied()
    }

    /// Vehicles not at a station of the universe at one grid index.
    pub fn unaccounted(&self, row: usize) -> Option<u32> {
        Some(self.transit(row)? + self.unobserved(row)? + self.unknown(row)?)
    }

    /// Weekday mean occupancy of each station by hour of day.
    pub fn weekday_profile(&self) -> Vec<(StationId, [Option<f64>; 24])> {
        self.stations
            .iter()
            .enumerate()
            .map(|(position, station)| {
                let series: Vec<f64> = self
                    .counts
                    .iter()
                    .map(|counts| counts[position] as f64)
                    .collect();
                (*station, weekday_hourly_mean(&self.grid, &series))
            })
            .collect()
    }

    /// Write `datetime,<station>...,transit,unobserved,unknown` rows.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        let mut header = vec!["datetime".to_string()];
        header.extend(self.stations.iter().map(StationId::to_string));
        header.extend(["transit", "unobserved", "unknown"].map(String::from));
        wtr.write_record(&header)?;
        for (row, point) in self.grid.iter().enumerate() {
            let mut record = vec![format_timestamp(point)];
            record.extend(self.counts[row].iter().map(u32::to_string));
            record.push(self.transit[row].to_string());
            record.push(self.unobserved[row].to_string());
            record.push(self.unknown[row].to_string());
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write `hour,<station>...` rows of the weekday profile; hours with
    /// no weekday sample are left empty.
    pub fn write_profile_csv<W: Write>(&self, writer: W) -> Result<()> {
        let profile = self.weekday_profile();
        let mut wtr = WriterBuilder::new().from_writer(writer);
        let mut header = vec!["hour".to_string()];
        header.extend(profile.iter().map(|(station, _)| station.to_string()));
        wtr.write_record(&header)?;
        for hour in 0..24 {
            let mut record = vec![hour.to_string()];
            record.extend(profile.iter().map(|(_, means)| {
                means[hour].map_or(String::new(), |mean| format!("{:.3}", mean))
            }));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
