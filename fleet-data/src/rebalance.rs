//! Detection of operator relocations between consecutive rentals.
//!
//! When a vehicle is picked up somewhere other than where it was last
//! dropped off, someone moved it. The drop-off is counted as a removal
//! from its station and the next pickup as an addition at the other one.

use chrono::NaiveDateTime;
use csv::WriterBuilder;
use fleet_core::{
    grid::{step, TimelineGrid},
    ids::{StationId, VehicleId},
    station::StationDirectory,
    trip::{TripEvent, TripLog},
    FleetError, Result,
};
use fleet_utils::dates::format_timestamp;
use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::{collections::HashMap, io::Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Placed at a station without a rental ending there.
    Add,
    /// Taken from a station without a rental starting there.
    Remove,
}

/// One inferred relocation end, attributed to a grid point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalancingEvent {
    pub vehicle: VehicleId,
    pub station: StationId,
    /// Exact time of the drop-off or pickup that revealed the move.
    pub at: NaiveDateTime,
    /// Grid index the event is attributed to.
    pub hour: usize,
    pub direction: Direction,
}

/// Relocations of one vehicle, as events and as grid-aligned columns.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleRebalancing {
    pub vehicle: VehicleId,
    pub events: Vec<RebalancingEvent>,
    pub adds: Vec<Option<StationId>>,
    pub removes: Vec<Option<StationId>>,
}

#[derive(Serialize)]
struct EventRow {
    bikeid: VehicleId,
    station: StationId,
    at: String,
    hour: String,
    direction: Direction,
}

/// Grid point an instant is attributed to: the first point at or after
/// it, provided that point is less than one step away.
fn attribute(grid: &TimelineGrid, at: &NaiveDateTime) -> Option<usize> {
    let index = grid.first_at_or_after(at)?;
    let point = grid.get(index)?;
    (point - *at < step()).then_some(index)
}

/// Compare each trip's destination with the next trip's origin.
///
/// Events are attributed to the grid and written into the columns in trip
/// order, so when two land on the same hour the later one is kept there.
/// The event list keeps both. The last trip never yields an event.
pub fn detect_rebalancing(
    vehicle: VehicleId,
    trips: &[TripEvent],
    grid: &TimelineGrid,
) -> Result<VehicleRebalancing> {
    for trip in trips {
        if trip.vehicle != vehicle {
            return Err(FleetError::VehicleMismatch {
                expected: vehicle,
                found: trip.vehicle,
            });
        }
        trip.validate()?;
    }
    let mut ordered: Vec<&TripEvent> = trips.iter().collect();
    ordered.sort_by_key(|trip| (trip.start, trip.stop));

    let mut result = VehicleRebalancing {
        vehicle,
        events: Vec::new(),
        adds: vec![None; grid.len()],
        removes: vec![None; grid.len()],
    };

    for pair in ordered.windows(2) {
        let (previous, next) = (pair[0], pair[1]);
        if previous.destination == next.origin {
            continue;
        }
        let ends = [
            (previous.stop, previous.destination, Direction::Remove),
            (next.start, next.origin, Direction::Add),
        ];
        for (at, station, direction) in ends {
            let Some(hour) = attribute(grid, &at) else {
                debug!("vehicle {vehicle}: {direction:?} at {at} falls outside the window");
                continue;
            };
            match direction {
                Direction::Add => result.adds[hour] = Some(station),
                Direction::Remove => result.removes[hour] = Some(station),
            }
            result.events.push(RebalancingEvent {
                vehicle,
                station,
                at,
                hour,
                direction,
            });
        }
    }
    Ok(result)
}

/// Fleet-wide relocation tables, one column per vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct RebalancingTables {
    grid: TimelineGrid,
    vehicles: Vec<VehicleId>,
    adds: Vec<Vec<Option<StationId>>>,
    removes: Vec<Vec<Option<StationId>>>,
    events: Vec<RebalancingEvent>,
    index: HashMap<VehicleId, usize>,
}

/// Run [`detect_rebalancing`] over every vehicle of the log in parallel.
pub fn detect_fleet_rebalancing(log: &TripLog, grid: &TimelineGrid) -> Result<RebalancingTables> {
    let vehicles: Vec<(VehicleId, &[TripEvent])> = log.iter().collect();
    let per_vehicle = vehicles
        .par_iter()
        .map(|(vehicle, trips)| detect_rebalancing(*vehicle, trips, grid))
        .collect::<Result<Vec<VehicleRebalancing>>>()?;
    let tables = RebalancingTables::from_vehicles(grid.clone(), per_vehicle)?;
    info!(
        "rebalancing: {} additions, {} removals over {} vehicles",
        tables.count(Direction::Add),
        tables.count(Direction::Remove),
        tables.vehicles.len()
    );
    Ok(tables)
}

impl RebalancingTables {
    /// Merge per-vehicle results; every column must cover the grid.
    pub fn from_vehicles(
        grid: TimelineGrid,
        per_vehicle: Vec<VehicleRebalancing>,
    ) -> Result<RebalancingTables> {
        if let Some(short) = per_vehicle
            .iter()
            .find(|v| v.adds.len() != grid.len() || v.removes.len() != grid.len())
        {
            return Err(FleetError::InvalidRecord(format!(
                "rebalancing columns for vehicle {} do not match the {}-hour grid",
                short.vehicle,
                grid.len()
            )));
        }
        let mut per_vehicle = per_vehicle;
        per_vehicle.sort_by_key(|v| v.vehicle);
        let mut tables = RebalancingTables {
            grid,
            vehicles: Vec::with_capacity(per_vehicle.len()),
            adds: Vec::with_capacity(per_vehicle.len()),
            removes: Vec::with_capacity(per_vehicle.len()),
            events: Vec::new(),
            index: HashMap::new(),
        };
        for vehicle in per_vehicle {
            tables.index.insert(vehicle.vehicle, tables.vehicles.len());
            tables.vehicles.push(vehicle.vehicle);
            tables.adds.push(vehicle.adds);
            tables.removes.push(vehicle.removes);
            tables.events.extend(vehicle.events);
        }
        Ok(tables)
    }

    pub fn vehicles(&self) -> &[VehicleId] {
        &self.vehicles
    }

    pub fn events(&self) -> &[RebalancingEvent] {
        &self.events
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.events
            .iter()
            .filter(|event| event.direction == direction)
            .count()
    }

    fn table(&self, direction: Direction) -> &[Vec<Option<StationId>>] {
        match direction {
            Direction::Add => &self.adds,
            Direction::Remove => &self.removes,
        }
    }

    pub fn column(&self, direction: Direction, vehicle: VehicleId) -> Option<&[Option<StationId>]> {
        let i = self.index.get(&vehicle)?;
        Some(self.table(direction)[*i].as_slice())
    }

    /// `counts[row][position of station]` of grid-attributed events.
    ///
    /// Read from the per-vehicle columns, so it honours the one-per-hour
    /// rule; stations outside the directory are not counted.
    pub fn station_hour_counts(&self, direction: Direction, stations: &StationDirectory) -> Vec<Vec<u32>> {
        let mut counts = vec![vec![0u32; stations.len()]; self.grid.len()];
        for column in self.table(direction) {
            for (row, value) in column.iter().enumerate() {
                if let Some(position) = value.and_then(|station| stations.position(station)) {
                    counts[row][position] += 1;
                }
            }
        }
        counts
    }

    /// Write `datetime,<vehicle>...` rows; empty cells where nothing moved.
    pub fn write_table_csv<W: Write>(&self, direction: Direction, writer: W) -> Result<()> {
        let table = self.table(direction);
        let mut wtr = WriterBuilder::new().from_writer(writer);
        let mut header = vec!["datetime".to_string()];
        header.extend(self.vehicles.iter().map(VehicleId::to_string));
        wtr.write_record(&header)?;
        for (row, point) in self.grid.iter().enumerate() {
            let mut record = vec![format_timestamp(point)];
            record.extend(
                table
                    .iter()
                    .map(|column| column[row].map_or(String::new(), |station| station.to_string())),
            );
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write one row per event: `bikeid,station,at,hour,direction`.
    pub fn write_events_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        for event in &self.events {
            wtr.serialize(EventRow {
                bikeid: event.vehicle,
                station: event.station,
                at: format_timestamp(&event.at),
                hour: self
                    .grid
                    .get(event.hour)
                    .map(|point| format_timestamp(&point))
                    .unwrap_or_default(),
                direction: event.direction,
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{grid_may, sid, trip};

    #[test]
    fn write_events_csv_rows() {
        let grid = grid_may(1);
        let log = TripLog::from_trips([
            trip(3, "2014-05-01 07:05", "2014-05-01 07:40", 10, 50),
            trip(3, "2014-05-01 12:20", "2014-05-01 12:50", 75, 10),
        ]);
        let tables = detect_fleet_rebalancing(&log, &grid).unwrap();
        let mut out = Vec::new();
        tables.write_events_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "bikeid,station,at,hour,direction");
        assert_eq!(lines[1], "3,50,2014-05-01 07:40:00,2014-05-01 08:00:00,remove");
        assert_eq!(lines[2], "3,75,2014-05-01 12:20:00,2014-05-01 13:00:00,add");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn columns_must_cover_the_grid() {
        let short = VehicleRebalancing {
            vehicle: VehicleId(3),
            events: Vec::new(),
            adds: vec![None; 5],
            removes: vec![None; 744],
        };
        assert!(matches!(
            RebalancingTables::from_vehicles(grid_may(1), vec![short]),
            Err(FleetError::InvalidRecord(_))
        ));
    }

    #[test]
    fn mismatched_pickup_yields_remove_and_add() {
        let grid = grid_may(1);
        let trips = [
            trip(3, "2014-05-01 07:05", "2014-05-01 07:40", 10, 50),
            trip(3, "2014-05-01 12:20", "2014-05-01 12:50", 75, 10),
        ];
        let found = detect_rebalancing(VehicleId(3), &trips, &grid).unwrap();
        assert_eq!(found.events.len(), 2);
        let remove = found.events[0];
        assert_eq!(remove.direction, Direction::Remove);
        assert_eq!(remove.station, sid(50));
        assert_eq!(remove.hour, 8);
        let add = found.events[1];
        assert_eq!(add.direction, Direction::Add);
        assert_eq!(add.station, sid(75));
        assert_eq!(add.hour, 13);

        assert_eq!(found.removes[8], Some(sid(50)));
        assert_eq!(found.adds[13], Some(sid(75)));
        // attribution does not leak to later hours
        assert_eq!(found.removes[9], None);
        assert_eq!(found.adds[14], None);
        assert_eq!(found.adds.iter().flatten().count(), 1);
    }

    #[test]
    fn matching_pickup_yields_nothing() {
        let grid = grid_may(1);
        let trips = [
            trip(3, "2014-05-01 07:05", "2014-05-01 07:40", 10, 50),
            trip(3, "2014-05-01 12:20", "2014-05-01 12:50", 50, 10),
        ];
        let found = detect_rebalancing(VehicleId(3), &trips, &grid).unwrap();
        assert!(found.events.is_empty());
        assert!(found.adds.iter().all(Option::is_none));
        assert!(found.removes.iter().all(Option::is_none));
    }

    #[test]
    fn single_trip_cannot_be_rebalanced() {
        let grid = grid_may(1);
        let trips = [trip(3, "2014-05-01 07:05", "2014-05-01 07:40", 10, 50)];
        let found = detect_rebalancing(VehicleId(3), &trips, &grid).unwrap();
        assert!(found.events.is_empty());
    }

    #[test]
    fn unsorted_trips_are_ordered_first() {
        let grid = grid_may(1);
        let trips = [
            trip(3, "2014-05-01 12:20", "2014-05-01 12:50", 75, 10),
            trip(3, "2014-05-01 07:05", "2014-05-01 07:40", 10, 50),
        ];
        let found = detect_rebalancing(VehicleId(3), &trips, &grid).unwrap();
        assert_eq!(found.events.len(), 2);
        assert_eq!(found.events[0].station, sid(50));
    }

    #[test]
    fn event_on_grid_point_stays_there() {
        let grid = grid_may(1);
        let trips = [
            trip(3, "2014-05-01 07:05", "2014-05-01 08:00", 10, 50),
            trip(3, "2014-05-01 09:00", "2014-05-01 09:30", 75, 10),
        ];
        let found = detect_rebalancing(VehicleId(3), &trips, &grid).unwrap();
        assert_eq!(found.removes[8], Some(sid(50)));
        assert_eq!(found.removes[9], None);
        assert_eq!(found.adds[9], Some(sid(75)));
        assert_eq!(found.adds[10], None);
    }

    #[test]
    fn same_hour_relocations_keep_the_later_one() {
        let grid = grid_may(1);
        let trips = [
            trip(3, "2014-05-01 06:00", "2014-05-01 08:05", 1, 2),
            trip(3, "2014-05-01 08:10", "2014-05-01 08:20", 3, 4),
            trip(3, "2014-05-01 08:30", "2014-05-01 08:40", 5, 6),
        ];
        let found = detect_rebalancing(VehicleId(3), &trips, &grid).unwrap();
        assert_eq!(found.events.len(), 4);
        assert_eq!(found.removes[9], Some(sid(4)));
        assert_eq!(found.adds[9], Some(sid(5)));
    }

    #[test]
    fn events_outside_the_window_are_dropped() {
        let grid = grid_may(1);
        let trips = [
            trip(3, "2014-04-20 07:05", "2014-04-20 07:40", 10, 50),
            trip(3, "2014-05-01 09:00", "2014-05-01 09:30", 75, 10),
        ];
        let found = detect_rebalancing(VehicleId(3), &trips, &grid).unwrap();
        assert_eq!(found.events.len(), 1);
        assert_eq!(found.events[0].direction, Direction::Add);
    }

    #[test]
    fn event_just_before_window_lands_on_first_hour() {
        let grid = grid_may(1);
        let trips = [
            trip(3, "2014-04-30 23:00", "2014-04-30 23:30", 10, 50),
            trip(3, "2014-05-01 09:00", "2014-05-01 09:30", 75, 10),
        ];
        let found = detect_rebalancing(VehicleId(3), &trips, &grid).unwrap();
        assert_eq!(found.removes[0], Some(sid(50)));
    }

    #[test]
    fn fleet_tables_aggregate_by_station() {
        let grid = grid_may(1);
        let log = TripLog::from_trips([
            trip(3, "2014-05-01 07:05", "2014-05-01 07:40", 10, 50),
            trip(3, "2014-05-01 12:20", "2014-05-01 12:50", 75, 10),
            trip(4, "2014-05-01 07:10", "2014-05-01 07:30", 10, 50),
            trip(4, "2014-05-01 13:00", "2014-05-01 13:30", 75, 50),
            trip(5, "2014-05-01 01:00", "2014-05-01 01:30", 10, 50),
        ]);
        let tables = detect_fleet_rebalancing(&log, &grid).unwrap();
        assert_eq!(tables.vehicles(), &[VehicleId(3), VehicleId(4), VehicleId(5)]);
        assert_eq!(tables.count(Direction::Remove), 2);
        assert_eq!(tables.count(Direction::Add), 2);

        let stations = StationDirectory::from_ids([sid(10), sid(50), sid(75)]);
        let removes = tables.station_hour_counts(Direction::Remove, &stations);
        assert_eq!(removes[8], vec![0, 2, 0]);
        let adds = tables.station_hour_counts(Direction::Add, &stations);
        assert_eq!(adds[13], vec![0, 0, 2]);
        assert_eq!(adds[14], vec![0, 0, 0]);
        assert!(tables
            .column(Direction::Add, VehicleId(5))
            .unwrap()
            .iter()
            .all(Option::is_none));
    }

    #[test]
    fn write_table_csv_leaves_blanks() {
        let grid = grid_may(1);
        let log = TripLog::from_trips([
            trip(3, "2014-05-01 00:05", "2014-05-01 00:40", 10, 50),
            trip(3, "2014-05-01 01:20", "2014-05-01 01:50", 75, 10),
        ]);
        let tables = detect_fleet_rebalancing(&log, &grid).unwrap();
        let mut out = Vec::new();
        tables.write_table_csv(Direction::Add, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "datetime,3");
        assert_eq!(lines[1], "2014-05-01 00:00:00,");
        assert_eq!(lines[3], "2014-05-01 02:00:00,75");
    }
}
