//! Shared builders for unit tests.

use chrono::NaiveDateTime;
use fleet_core::{
    grid::TimelineGrid,
    ids::{StationId, VehicleId},
    trip::TripEvent,
};
use fleet_utils::dates::{parse_timestamp, parse_window_start};

pub fn at(s: &str) -> NaiveDateTime {
    parse_timestamp(s).unwrap()
}

pub fn sid(id: u32) -> StationId {
    StationId::new(id).unwrap()
}

/// Grid starting 2014-05-01 00:00.
pub fn grid_may(months: i64) -> TimelineGrid {
    TimelineGrid::build(parse_window_start("2014-05-01").unwrap(), months).unwrap()
}

pub fn trip(vehicle: u32, start: &str, stop: &str, origin: u32, destination: u32) -> TripEvent {
    TripEvent {
        vehicle: VehicleId(vehicle),
        start: at(start),
        stop: at(stop),
        origin: sid(origin),
        destination: sid(destination),
    }
}
