use crate::reconstruct::{reconstruct, LocationSeries};
use chrono::NaiveDateTime;
use csv::WriterBuilder;
use fleet_core::{
    carry_over::CarryOver, grid::TimelineGrid, ids::VehicleId, location::Location, trip::TripLog,
    FleetError, Result,
};
use fleet_utils::dates::format_timestamp;
use log::info;
use rayon::prelude::*;
use std::{
    collections::{BTreeSet, HashMap},
    io::Write,
};

/// Location of every vehicle at every grid point of a window.
///
/// Stored column-wise: one independently reconstructed series per vehicle,
/// columns in ascending vehicle order.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetLocationMatrix {
    grid: TimelineGrid,
    vehicles: Vec<VehicleId>,
    columns: Vec<Vec<Location>>,
    index: HashMap<VehicleId, usize>,
}

impl FleetLocationMatrix {
    /// Reconstruct each of `vehicles` from its trips in `log`.
    ///
    /// Vehicles are processed in parallel; they share only the grid and
    /// the log, so the result does not depend on scheduling.
    pub fn build(
        vehicles: impl IntoIterator<Item = VehicleId>,
        log: &TripLog,
        grid: &TimelineGrid,
        carry: &CarryOver,
    ) -> Result<FleetLocationMatrix> {
        let vehicles: Vec<VehicleId> = vehicles
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let series = vehicles
            .par_iter()
            .map(|vehicle| reconstruct(*vehicle, log.trips_for(*vehicle), grid, carry.get(*vehicle)))
            .collect::<Result<Vec<LocationSeries>>>()?;
        info!(
            "location matrix: {} vehicles x {} hours",
            series.len(),
            grid.len()
        );
        FleetLocationMatrix::from_series(grid.clone(), series)
    }

    /// Every vehicle in the log or the carry-over.
    pub fn from_log(log: &TripLog, grid: &TimelineGrid, carry: &CarryOver) -> Result<FleetLocationMatrix> {
        let vehicles = log.vehicles().chain(carry.vehicles());
        FleetLocationMatrix::build(vehicles, log, grid, carry)
    }

    /// Assemble already reconstructed series. Later series for the same
    /// vehicle replace earlier ones. Every series must cover the grid.
    pub fn from_series(grid: TimelineGrid, series: Vec<LocationSeries>) -> Result<FleetLocationMatrix> {
        if let Some(short) = series.iter().find(|s| s.len() != grid.len()) {
            return Err(FleetError::InvalidRecord(format!(
                "series for vehicle {} has {} values, grid has {}",
                short.vehicle,
                short.len(),
                grid.len()
            )));
        }
        let mut by_vehicle: Vec<LocationSeries> = series;
        by_vehicle.sort_by_key(|s| s.vehicle);
        by_vehicle.dedup_by(|later, earlier| {
            if later.vehicle == earlier.vehicle {
                std::mem::swap(later, earlier);
                true
            } else {
                false
            }
        });
        let vehicles: Vec<VehicleId> = by_vehicle.iter().map(|s| s.vehicle).collect();
        let index = vehicles.iter().enumerate().map(|(i, v)| (*v, i)).collect();
        let columns = by_vehicle.into_iter().map(|s| s.values).collect();
        Ok(FleetLocationMatrix {
            grid,
            vehicles,
            columns,
            index,
        })
    }

    pub fn grid(&self) -> &TimelineGrid {
        &self.grid
    }

    pub fn vehicles(&self) -> &[VehicleId] {
        &self.vehicles
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn column(&self, vehicle: VehicleId) -> Option<&[Location]> {
        self.index
            .get(&vehicle)
            .map(|i| self.columns[*i].as_slice())
    }

    pub fn columns(&self) -> impl Iterator<Item = (VehicleId, &[Location])> + '_ {
        self.vehicles
            .iter()
            .zip(self.columns.iter())
            .map(|(vehicle, column)| (*vehicle, column.as_slice()))
    }

    pub fn value(&self, row: usize, vehicle: VehicleId) -> Option<Location> {
        self.column(vehicle).and_then(|column| column.get(row).copied())
    }

    /// Values of all vehicles at one grid index, in column order.
    pub fn row(&self, row: usize) -> Option<Vec<Location>> {
        (row < self.grid.len()).then(|| self.columns.iter().map(|column| column[row]).collect())
    }

    pub fn row_at(&self, ts: &NaiveDateTime) -> Option<Vec<Location>> {
        self.grid.index_of(ts).and_then(|row| self.row(row))
    }

    /// Locations at the last grid point, to seed the following window.
    pub fn carry_over(&self) -> CarryOver {
        self.columns()
            .filter_map(|(vehicle, column)| column.last().map(|last| (vehicle, *last)))
            .collect()
    }

    /// Write `datetime,<vehicle>...` rows with location codes.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        let mut header = Vec::with_capacity(self.vehicles.len() + 1);
        header.push("datetime".to_string());
        header.extend(self.vehicles.iter().map(VehicleId::to_string));
        wtr.write_record(&header)?;
        for (row, point) in self.grid.iter().enumerate() {
            let mut record = Vec::with_capacity(self.vehicles.len() + 1);
            record.push(format_timestamp(point));
            record.extend(self.columns.iter().map(|column| column[row].code().to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
