//! Run-length encoding of location series into stays.

use crate::matrix::FleetLocationMatrix;
use csv::WriterBuilder;
use fleet_core::{
    ids::VehicleId,
    location::{Location, TRANSIT_CODE, UNOBSERVED_CODE},
    station::StationDirectory,
    Result,
};
use serde::Serialize;
use std::{collections::BTreeMap, io::Write};

/// A location expressed in compact station ids.
///
/// Stations outside the directory become `Unobserved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompactLocation {
    Unobserved,
    Transit,
    Station(u32),
}

impl CompactLocation {
    pub fn remap(location: Location, stations: &StationDirectory) -> CompactLocation {
        match location {
            Location::Station(station) => stations
                .remap(station)
                .map_or(CompactLocation::Unobserved, CompactLocation::Station),
            Location::Transit => CompactLocation::Transit,
            Location::Unobserved => CompactLocation::Unobserved,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            CompactLocation::Station(new_id) => *new_id as i64,
            CompactLocation::Transit => TRANSIT_CODE,
            CompactLocation::Unobserved => UNOBSERVED_CODE,
        }
    }
}

/// A maximal run of one location for one vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stay {
    pub vehicle: VehicleId,
    pub location: Location,
    pub remapped: CompactLocation,
    /// Grid index the stay begins at.
    pub start: usize,
    pub hours: u32,
}

/// Number of station stays of each length, for one vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationHistogram(BTreeMap<u32, u32>);

impl DurationHistogram {
    pub fn record(&mut self, hours: u32) {
        *self.0.entry(hours).or_insert(0) += 1;
    }

    pub fn count(&self, hours: u32) -> u32 {
        self.0.get(&hours).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.0.iter().map(|(hours, count)| (*hours, *count))
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }
}

#[derive(Serialize)]
struct StayRow {
    bikeid: u32,
    station: i64,
    hours: u32,
    #[serde(rename = "station new id")]
    station_new_id: i64,
}

#[derive(Serialize)]
struct HistogramRow {
    bikeid: u32,
    hours: u32,
    stays: u32,
}

/// All stays of a window plus per-vehicle station-stay histograms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StayTable {
    stays: Vec<Stay>,
    histograms: BTreeMap<VehicleId, DurationHistogram>,
}

/// Maximal runs of equal values as `(value, start index, length)`.
pub fn runs<T: PartialEq + Copy>(values: &[T]) -> Vec<(T, usize, u32)> {
    let mut out: Vec<(T, usize, u32)> = Vec::new();
    for (i, value) in values.iter().enumerate() {
        match out.last_mut() {
            Some((current, _, len)) if *current == *value => *len += 1,
            _ => out.push((*value, i, 1)),
        }
    }
    out
}

/// Split every matrix column into stays.
///
/// Transit and unobserved runs are kept in the table; only runs at a real
/// station feed the duration histogram.
pub fn extract_stays(matrix: &FleetLocationMatrix, stations: &StationDirectory) -> StayTable {
    let mut table = StayTable::default();
    for (vehicle, column) in matrix.columns() {
        let histogram = table.histograms.entry(vehicle).or_default();
        for (location, start, hours) in runs(column) {
            if location.is_station() {
                histogram.record(hours);
            }
            table.stays.push(Stay {
                vehicle,
                location,
                remapped: CompactLocation::remap(location, stations),
                start,
                hours,
            });
        }
    }
    table
}

impl StayTable {
    pub fn stays(&self) -> &[Stay] {
        &self.stays
    }

    pub fn len(&self) -> usize {
        self.stays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stays.is_empty()
    }

    pub fn for_vehicle(&self, vehicle: VehicleId) -> impl Iterator<Item = &Stay> + '_ {
        self.stays.iter().filter(move |stay| stay.vehicle == vehicle)
    }

    pub fn histogram(&self, vehicle: VehicleId) -> Option<&DurationHistogram> {
        self.histograms.get(&vehicle)
    }

    /// Replay one vehicle's stays back into its hourly series.
    pub fn expand(&self, vehicle: VehicleId) -> Vec<Location> {
        self.for_vehicle(vehicle)
            .flat_map(|stay| std::iter::repeat(stay.location).take(stay.hours as usize))
            .collect()
    }

    /// Write `bikeid,station,hours,station new id` rows.
    pub fn write_stays_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        for stay in &self.stays {
            wtr.serialize(StayRow {
                bikeid: stay.vehicle.0,
                station: stay.location.code(),
                hours: stay.hours,
                station_new_id: stay.remapped.code(),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write `bikeid,hours,stays` rows, one per non-empty histogram bin.
    pub fn write_histogram_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        for (vehicle, histogram) in &self.histograms {
            for (hours, stays) in histogram.iter() {
                wtr.serialize(HistogramRow {
                    bikeid: vehicle.0,
                    hours,
                    stays,
                })?;
            }
        }
        wtr.flush()?;
        Ok(())
    }
}
