use crate::ids::StationId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code written for a vehicle between an origin and a destination.
pub const TRANSIT_CODE: i64 = 0;

/// Code written for a vehicle with no location data yet.
pub const UNOBSERVED_CODE: i64 = -10;

/// Where a vehicle is at one sample point of the timeline.
///
/// The tagged form keeps the station id space free of sentinels; the
/// numeric codes only exist at the CSV boundary (see [`Location::code`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Location {
    /// Not yet seen in any event and no state carried over.
    Unobserved,
    /// Out on a ride.
    Transit,
    /// Docked at a station.
    Station(StationId),
}

impl Location {
    /// Numeric code: the station id, `0` for transit, `-10` for unobserved.
    pub fn code(&self) -> i64 {
        match self {
            Location::Station(station) => station.get() as i64,
            Location::Transit => TRANSIT_CODE,
            Location::Unobserved => UNOBSERVED_CODE,
        }
    }

    pub fn from_code(code: i64) -> Option<Location> {
        match code {
            TRANSIT_CODE => Some(Location::Transit),
            UNOBSERVED_CODE => Some(Location::Unobserved),
            c if c > 0 => u32::try_from(c)
                .ok()
                .and_then(StationId::new)
                .map(Location::Station),
            _ => None,
        }
    }

    pub fn station(&self) -> Option<StationId> {
        match self {
            Location::Station(station) => Some(*station),
            _ => None,
        }
    }

    pub fn is_station(&self) -> bool {
        matches!(self, Location::Station(_))
    }
}

impl From<Location> for i64 {
    fn from(value: Location) -> Self {
        value.code()
    }
}

impl TryFrom<i64> for Location {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Location::from_code(value).ok_or_else(|| format!("{value} is not a location code"))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
