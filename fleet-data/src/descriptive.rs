//! Simple descriptive aggregations over trips and hourly series.

use chrono::{NaiveDateTime, Timelike};
use fleet_core::{grid::TimelineGrid, ids::StationId, trip::TripEvent};
use fleet_utils::dates::is_weekday;
use serde::Serialize;

/// A vehicle leaving (`-1`) or arriving at (`+1`) a dock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DockEvent {
    pub at: NaiveDateTime,
    pub station: StationId,
    pub delta: i8,
}

/// Every trip start as a removal at its origin and every stop as an
/// addition at its destination, ordered by time.
pub fn dock_events<'a>(trips: impl IntoIterator<Item = &'a TripEvent>) -> Vec<DockEvent> {
    let mut events: Vec<DockEvent> = trips
        .into_iter()
        .flat_map(|trip| {
            [
                DockEvent {
                    at: trip.start,
                    station: trip.origin,
                    delta: -1,
                },
                DockEvent {
                    at: trip.stop,
                    station: trip.destination,
                    delta: 1,
                },
            ]
        })
        .collect();
    events.sort_by_key(|event| event.at);
    events
}

/// Mean of `series` grouped by hour of day, over Monday-Friday grid points.
///
/// `series` is aligned with `grid`; extra values on either side are ignored.
pub fn weekday_hourly_mean(grid: &TimelineGrid, series: &[f64]) -> [Option<f64>; 24] {
    let mut sums = [0.0f64; 24];
    let mut samples = [0u32; 24];
    for (point, value) in grid.iter().zip(series) {
        if is_weekday(point) {
            let hour = point.hour() as usize;
            sums[hour] += value;
            samples[hour] += 1;
        }
    }
    let mut means = [None; 24];
    for hour in 0..24 {
        if samples[hour] > 0 {
            means[hour] = Some(sums[hour] / samples[hour] as f64);
        }
    }
    means
}
