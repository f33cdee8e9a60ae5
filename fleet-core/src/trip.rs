use crate::{
    error::{FleetError, Result},
    ids::{StationId, VehicleId},
};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, Trim};
use fleet_utils::dates::parse_timestamp;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, io::Read};

/// Columns a trip-log export must carry; everything else is ignored.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "starttime",
    "stoptime",
    "start station id",
    "end station id",
    "bikeid",
];

/// One completed rental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TripEvent {
    pub vehicle: VehicleId,
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    pub origin: StationId,
    pub destination: StationId,
}

impl TripEvent {
    /// A trip must end strictly after it starts.
    pub fn validate(&self) -> Result<()> {
        if self.stop <= self.start {
            return Err(FleetError::MalformedEvent {
                vehicle: self.vehicle,
                start: self.start,
                stop: self.stop,
            });
        }
        Ok(())
    }
}

/// A trip-log row before normalization. Empty cells arrive as `None`.
#[derive(Debug, Deserialize)]
struct TripRow {
    #[serde(rename = "starttime")]
    start: Option<String>,
    #[serde(rename = "stoptime")]
    stop: Option<String>,
    #[serde(rename = "start station id")]
    origin: Option<String>,
    #[serde(rename = "end station id")]
    destination: Option<String>,
    #[serde(rename = "bikeid")]
    vehicle: Option<String>,
}

impl TryFrom<TripRow> for TripEvent {
    type Error = String;

    fn try_from(row: TripRow) -> std::result::Result<Self, Self::Error> {
        let field = |value: &Option<String>, name: &str| -> std::result::Result<String, String> {
            value
                .as_deref()
                .map(str::to_string)
                .ok_or_else(|| format!("missing {name}"))
        };
        let vehicle_raw = field(&row.vehicle, "bikeid")?;
        let vehicle =
            VehicleId::parse(&vehicle_raw).ok_or_else(|| format!("bad bikeid '{vehicle_raw}'"))?;
        let origin_raw = field(&row.origin, "start station id")?;
        let origin = StationId::parse(&origin_raw)
            .ok_or_else(|| format!("bad start station id '{origin_raw}'"))?;
        let destination_raw = field(&row.destination, "end station id")?;
        let destination = StationId::parse(&destination_raw)
            .ok_or_else(|| format!("bad end station id '{destination_raw}'"))?;
        let start = parse_timestamp(&field(&row.start, "starttime")?).map_err(|e| e.to_string())?;
        let stop = parse_timestamp(&field(&row.stop, "stoptime")?).map_err(|e| e.to_string())?;
        let trip = TripEvent {
            vehicle,
            start,
            stop,
            origin,
            destination,
        };
        trip.validate().map_err(|e| e.to_string())?;
        Ok(trip)
    }
}

/// Outcome of reading one trip-log export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub accepted: usize,
    pub skipped: usize,
}

/// Trips indexed by vehicle, each vehicle's trips ordered by start time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripLog {
    by_vehicle: BTreeMap<VehicleId, Vec<TripEvent>>,
}

impl TripLog {
    /// Group trips by vehicle and order each group by (start, stop).
    pub fn from_trips(trips: impl IntoIterator<Item = TripEvent>) -> TripLog {
        let mut by_vehicle: BTreeMap<VehicleId, Vec<TripEvent>> = BTreeMap::new();
        for trip in trips {
            by_vehicle.entry(trip.vehicle).or_default().push(trip);
        }
        for trips in by_vehicle.values_mut() {
            trips.sort_by_key(|trip| (trip.start, trip.stop));
        }
        TripLog { by_vehicle }
    }

    /// Read a trip-log CSV (with headers).
    ///
    /// Rows with missing or unparsable ids or timestamps, or that stop
    /// before they start, are skipped and counted rather than failing
    /// the whole load.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<(TripLog, IngestReport)> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|header| header == column) {
                return Err(FleetError::InvalidRecord(format!(
                    "trip log is missing column '{column}'"
                )));
            }
        }

        let mut report = IngestReport::default();
        let mut trips = Vec::new();
        for (line, result) in rdr.deserialize::<TripRow>().enumerate() {
            let row = match result {
                Ok(row) => row,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    debug!("trip log row {}: {}", line + 2, e);
                    report.skipped += 1;
                    continue;
                }
            };
            match TripEvent::try_from(row) {
                Ok(trip) => {
                    trips.push(trip);
                    report.accepted += 1;
                }
                Err(reason) => {
                    debug!("trip log row {}: {}", line + 2, reason);
                    report.skipped += 1;
                }
            }
        }
        if report.skipped > 0 {
            warn!(
                "trip log: skipped {} malformed rows, kept {}",
                report.skipped, report.accepted
            );
        }
        let log = TripLog::from_trips(trips);
        info!(
            "trip log: {} trips across {} vehicles",
            log.trip_count(),
            log.vehicle_count()
        );
        Ok((log, report))
    }

    pub fn parse_trip_csv(csv_object: &str) -> Result<(TripLog, IngestReport)> {
        TripLog::from_csv_reader(csv_object.as_bytes())
    }

    pub fn vehicles(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.by_vehicle.keys().copied()
    }

    /// Trips of one vehicle in start order; empty for vehicles never seen.
    pub fn trips_for(&self, vehicle: VehicleId) -> &[TripEvent] {
        self.by_vehicle
            .get(&vehicle)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (VehicleId, &[TripEvent])> + '_ {
        self.by_vehicle
            .iter()
            .map(|(vehicle, trips)| (*vehicle, trips.as_slice()))
    }

    pub fn trips(&self) -> impl Iterator<Item = &TripEvent> + '_ {
        self.by_vehicle.values().flatten()
    }

    pub fn vehicle_count(&self) -> usize {
        self.by_vehicle.len()
    }

    pub fn trip_count(&self) -> usize {
        self.by_vehicle.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_vehicle.is_empty()
    }
}
