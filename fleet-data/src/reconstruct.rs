//! Per-vehicle reconstruction of a dense hourly location series.
//!
//! Each trip contributes two sightings: at its start the vehicle goes into
//! transit, at its stop it is docked at the destination. The origin is not
//! recorded as a location. Sightings are merged with the grid and carried
//! forward (last observation wins) so every grid point gets a value.

use chrono::NaiveDateTime;
use fleet_core::{
    grid::TimelineGrid,
    ids::VehicleId,
    location::Location,
    trip::TripEvent,
    FleetError, Result,
};
use log::debug;

/// At a shared instant a vehicle docks before it is taken out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SightingKind {
    Arrival,
    Departure,
}

#[derive(Debug, Clone, Copy)]
struct Sighting {
    at: NaiveDateTime,
    kind: SightingKind,
    location: Location,
}

/// A vehicle's location at every grid point of a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSeries {
    pub vehicle: VehicleId,
    pub values: Vec<Location>,
}

impl LocationSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Last value of the window, the state handed to the next one.
    pub fn last(&self) -> Option<Location> {
        self.values.last().copied()
    }
}

fn sightings(vehicle: VehicleId, trips: &[TripEvent]) -> Result<Vec<Sighting>> {
    let mut out = Vec::with_capacity(trips.len() * 2);
    for trip in trips {
        if trip.vehicle != vehicle {
            return Err(FleetError::VehicleMismatch {
                expected: vehicle,
                found: trip.vehicle,
            });
        }
        trip.validate()?;
        out.push(Sighting {
            at: trip.start,
            kind: SightingKind::Departure,
            location: Location::Transit,
        });
        out.push(Sighting {
            at: trip.stop,
            kind: SightingKind::Arrival,
            location: Location::Station(trip.destination),
        });
    }
    out.sort_by_key(|sighting| (sighting.at, sighting.kind));
    Ok(out)
}

/// Reconstruct one vehicle over `grid`.
///
/// `seed` is the location carried over from the previous window; when
/// present it overrides whatever was sighted at or before the first
/// grid point. Points before the first sighting (and without a seed)
/// are [`Location::Unobserved`].
pub fn reconstruct(
    vehicle: VehicleId,
    trips: &[TripEvent],
    grid: &TimelineGrid,
    seed: Option<Location>,
) -> Result<LocationSeries> {
    let sightings = sightings(vehicle, trips)?;
    let mut pending = sightings.iter().peekable();
    // None until something is known about the vehicle.
    let mut current: Option<Location> = None;
    let mut values = Vec::with_capacity(grid.len());

    for (i, point) in grid.iter().enumerate() {
        while let Some(sighting) = pending.next_if(|s| s.at <= *point) {
            current = Some(sighting.location);
        }
        if i == 0 {
            if let Some(seed) = seed {
                current = Some(seed);
            }
        }
        values.push(current.unwrap_or(Location::Unobserved));
    }

    debug!(
        "vehicle {}: {} trips, {} sightings past the window",
        vehicle,
        trips.len(),
        pending.count()
    );
    Ok(LocationSeries { vehicle, values })
}
