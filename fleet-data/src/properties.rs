//! Whole-window properties checked on a synthetic fleet.

use crate::{
    fixtures::{at, grid_may, sid, trip},
    matrix::FleetLocationMatrix,
    occupancy::{occupancy, unaccounted_count},
    rebalance::{detect_fleet_rebalancing, detect_rebalancing, Direction},
    stays::extract_stays,
};
use chrono::{NaiveDateTime, TimeDelta};
use fleet_core::{
    carry_over::CarryOver,
    grid::TimelineGrid,
    ids::{StationId, VehicleId},
    location::Location,
    station::StationDirectory,
    trip::{TripEvent, TripLog},
};

/// Deterministic linear congruential sequence.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: u64) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) % bound
    }
}

/// Non-overlapping trips for `vehicles` bikes over stations 1..=12,
/// with some pickups away from the last drop-off. Every trip ends
/// before the last grid point.
fn synthetic_log(vehicles: u32, grid: &TimelineGrid) -> TripLog {
    let mut rng = Lcg(42);
    let start = grid.start().unwrap();
    let mut trips = Vec::new();
    for vehicle in 1..=vehicles {
        let mut clock: NaiveDateTime = start + TimeDelta::minutes(rng.next(600) as i64);
        let mut station = rng.next(12) as u32 + 1;
        for _ in 0..rng.next(60) {
            let ride = TimeDelta::minutes(rng.next(90) as i64 + 1);
            let destination = rng.next(12) as u32 + 1;
            let stop = clock + ride;
            if stop >= *grid.points().last().unwrap() {
                break;
            }
            trips.push(TripEvent {
                vehicle: VehicleId(vehicle),
                start: clock,
                stop,
                origin: sid(station),
                destination: sid(destination),
            });
            station = if rng.next(5) == 0 {
                rng.next(12) as u32 + 1
            } else {
                destination
            };
            // some pickups share the instant of the previous drop-off
            clock = stop + TimeDelta::minutes(rng.next(900) as i64 * rng.next(2) as i64);
        }
    }
    TripLog::from_trips(trips)
}

/// Stations 1..=10: 11 and 12 are traffic outside the universe.
fn universe() -> StationDirectory {
    StationDirectory::from_ids((1..=10).map(sid))
}

fn fleet() -> (TimelineGrid, TripLog, FleetLocationMatrix) {
    let grid = grid_may(1);
    let log = synthetic_log(40, &grid);
    let vehicles = (1..=45).map(VehicleId);
    let matrix = FleetLocationMatrix::build(vehicles, &log, &grid, &CarryOver::new()).unwrap();
    (grid, log, matrix)
}

#[test]
fn grid_is_hourly_and_complete() {
    for months in 1..=2 {
        let grid = grid_may(months);
        assert_eq!(grid.len(), 24 * 31 * months as usize);
        assert!(grid
            .points()
            .windows(2)
            .all(|pair| pair[1] - pair[0] == TimeDelta::hours(1)));
    }
}

#[test]
fn series_are_dense() {
    let (grid, _, matrix) = fleet();
    assert_eq!(matrix.vehicle_count(), 45);
    for (_, column) in matrix.columns() {
        assert_eq!(column.len(), grid.len());
    }
}

#[test]
fn stays_expand_back_to_series() {
    let (_, _, matrix) = fleet();
    let table = extract_stays(&matrix, &universe());
    for (vehicle, column) in matrix.columns() {
        assert_eq!(table.expand(vehicle), column, "vehicle {vehicle}");
        let stays: Vec<_> = table.for_vehicle(vehicle).collect();
        assert!(stays.iter().all(|stay| stay.hours >= 1));
        // maximal runs: neighbours always differ
        assert!(stays.windows(2).all(|pair| pair[0].location != pair[1].location));
    }
}

#[test]
fn histogram_matches_station_stays() {
    let (_, _, matrix) = fleet();
    let table = extract_stays(&matrix, &universe());
    for vehicle in matrix.vehicles() {
        let station_stays = table
            .for_vehicle(*vehicle)
            .filter(|stay| stay.location.is_station())
            .count() as u32;
        assert_eq!(table.histogram(*vehicle).unwrap().total(), station_stays);
    }
}

#[test]
fn occupancy_is_conserved() {
    let (grid, _, matrix) = fleet();
    let stations = universe();
    let occ = occupancy(&matrix, &stations);
    for (row, point) in grid.iter().enumerate() {
        let docked = occ.docked(row).unwrap() as usize;
        let unaccounted = unaccounted_count(&matrix, &stations, point).unwrap();
        assert_eq!(docked + unaccounted, matrix.vehicle_count(), "at {point}");
        assert_eq!(occ.unaccounted(row).unwrap() as usize, unaccounted);
    }
}

#[test]
fn trips_are_bracketed_by_transit() {
    let (grid, log, matrix) = fleet();
    for (vehicle, trips) in log.iter() {
        let column = matrix.column(vehicle).unwrap();
        for (i, trip) in trips.iter().enumerate() {
            let Some(row) = grid.first_at_or_after(&trip.start) else {
                continue;
            };
            let point = grid.get(row).unwrap();
            if point >= trip.stop {
                // stop in the same hour: the later sighting resolves it,
                // unless the next trip also started before the grid point
                let next_started = trips
                    .get(i + 1)
                    .is_some_and(|next| next.start <= point);
                if !next_started {
                    assert_eq!(column[row], Location::Station(trip.destination));
                }
                continue;
            }
            assert_eq!(column[row], Location::Transit, "vehicle {vehicle} trip {i}");
        }
    }
}

#[test]
fn parallel_build_is_deterministic() {
    let (grid, log, matrix) = fleet();
    let again = FleetLocationMatrix::build(
        (1..=45).rev().map(VehicleId),
        &log,
        &grid,
        &CarryOver::new(),
    )
    .unwrap();
    assert_eq!(matrix, again);
}

#[test]
fn consecutive_windows_chain_through_carry_over() {
    let two_months = grid_may(2);
    let may = grid_may(1);
    let june = TimelineGrid::build(may.end().unwrap(), 1).unwrap();
    // nothing may happen around the boundary: the carried state is the
    // value of the last May hour
    let quiet_from = *may.points().last().unwrap() - TimeDelta::hours(1);
    let quiet_until = june.get(1).unwrap();
    let log = TripLog::from_trips(
        synthetic_log(10, &two_months)
            .trips()
            .filter(|trip| trip.stop <= quiet_from || trip.start >= quiet_until)
            .cloned(),
    );
    let whole = FleetLocationMatrix::from_log(&log, &two_months, &CarryOver::new()).unwrap();

    let first = FleetLocationMatrix::from_log(&log, &may, &CarryOver::new()).unwrap();
    let june_trips = TripLog::from_trips(
        log.trips()
            .filter(|trip| trip.start >= june.start().unwrap())
            .cloned(),
    );
    let second = FleetLocationMatrix::build(
        log.vehicles(),
        &june_trips,
        &june,
        &first.carry_over(),
    )
    .unwrap();

    for vehicle in log.vehicles() {
        let full = whole.column(vehicle).unwrap();
        let (head, tail) = full.split_at(may.len());
        assert_eq!(first.column(vehicle).unwrap(), head);
        assert_eq!(second.column(vehicle).unwrap(), tail, "vehicle {vehicle}");
    }
}

#[test]
fn scenario_two_trips_with_relocation() {
    let grid = grid_may(1);
    let trips = [
        trip(3, "2014-05-01 10:00", "2014-05-01 10:25", 12, 50),
        trip(3, "2014-05-01 15:40", "2014-05-01 16:05", 75, 12),
    ];
    let found = detect_rebalancing(VehicleId(3), &trips, &grid).unwrap();
    let remove = found
        .events
        .iter()
        .find(|e| e.direction == Direction::Remove)
        .unwrap();
    assert_eq!(remove.station, sid(50));
    assert_eq!(remove.at, at("2014-05-01 10:25"));
    assert_eq!(grid.get(remove.hour), Some(at("2014-05-01 11:00")));
    let add = found
        .events
        .iter()
        .find(|e| e.direction == Direction::Add)
        .unwrap();
    assert_eq!(add.station, sid(75));
    assert_eq!(grid.get(add.hour), Some(at("2014-05-01 16:00")));
}

#[test]
fn rebalancing_events_are_attributed_once() {
    let (grid, log, _) = fleet();
    let tables = detect_fleet_rebalancing(&log, &grid).unwrap();
    let mut pairs = 0;
    for (_, trips) in log.iter() {
        pairs += trips
            .windows(2)
            .filter(|pair| pair[0].destination != pair[1].origin)
            .count();
    }
    assert!(pairs > 0);
    assert_eq!(tables.count(Direction::Add), pairs);
    assert_eq!(tables.count(Direction::Remove), pairs);
    for event in tables.events() {
        let point = grid.get(event.hour).unwrap();
        assert!(point >= event.at);
        assert!(point - event.at < TimeDelta::hours(1));
    }
    let stations: Vec<StationId> = (1..=12).map(sid).collect();
    let all = StationDirectory::from_ids(stations);
    let counted: u32 = tables
        .station_hour_counts(Direction::Add, &all)
        .iter()
        .flatten()
        .sum();
    assert!(counted as usize <= pairs);
}
