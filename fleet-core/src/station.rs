use crate::{
    error::{FleetError, Result},
    ids::StationId,
    trip::TripLog,
};
use csv::{ReaderBuilder, Trim};
use fleet_utils::ids::parse_numeric_id;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeSet, HashMap},
    io::Read,
};

/// Station metadata: the raw id from the trip log and its compact id.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Station {
    pub station_id: StationId,
    /// Dense sequential id used by downstream tables.
    pub new_id: u32,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StationRow {
    #[serde(rename = "station id")]
    station_id: String,
    #[serde(rename = "new id", default)]
    new_id: Option<String>,
    #[serde(rename = "station name", default)]
    name: Option<String>,
}

/// The ordered universe of stations known for a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationDirectory {
    stations: Vec<Station>,
    index: HashMap<StationId, usize>,
}

impl StationDirectory {
    /// Build from stations in order; later duplicates of an id are dropped.
    pub fn from_stations(stations: impl IntoIterator<Item = Station>) -> StationDirectory {
        let mut directory = StationDirectory::default();
        let mut compact: HashMap<u32, StationId> = HashMap::new();
        for station in stations {
            if directory.index.contains_key(&station.station_id) {
                warn!("station {} listed twice, keeping the first", station.station_id);
                continue;
            }
            if let Some(other) = compact.insert(station.new_id, station.station_id) {
                warn!(
                    "stations {} and {} share new id {}",
                    other, station.station_id, station.new_id
                );
            }
            directory
                .index
                .insert(station.station_id, directory.stations.len());
            directory.stations.push(station);
        }
        directory
    }

    /// Compact ids are assigned 1, 2, 3, ... in the given order.
    pub fn from_ids(ids: impl IntoIterator<Item = StationId>) -> StationDirectory {
        StationDirectory::from_stations(ids.into_iter().enumerate().map(|(i, station_id)| Station {
            station_id,
            new_id: i as u32 + 1,
            name: None,
        }))
    }

    /// Every origin and destination in the log, in ascending id order.
    pub fn from_trips(log: &TripLog) -> StationDirectory {
        let ids: BTreeSet<StationId> = log
            .trips()
            .flat_map(|trip| [trip.origin, trip.destination])
            .collect();
        StationDirectory::from_ids(ids)
    }

    /// Read station metadata CSV with headers `station id[,new id][,station name]`.
    ///
    /// Rows without a `new id` take their 1-based position in the file.
    /// A `new id` of 0 is rejected since 0 is the transit code.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<StationDirectory> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        let mut stations = Vec::new();
        for (position, row) in rdr.deserialize::<StationRow>().enumerate() {
            let row = row?;
            let station_id = StationId::parse(&row.station_id).ok_or_else(|| {
                FleetError::InvalidRecord(format!("bad station id '{}'", row.station_id))
            })?;
            let new_id = match row.new_id.as_deref() {
                Some(raw) => parse_numeric_id(raw)
                    .filter(|id| *id > 0)
                    .ok_or_else(|| {
                        FleetError::InvalidRecord(format!("bad new id '{raw}' for {station_id}"))
                    })?,
                None => position as u32 + 1,
            };
            stations.push(Station {
                station_id,
                new_id,
                name: row.name.filter(|name| !name.is_empty()),
            });
        }
        let directory = StationDirectory::from_stations(stations);
        info!("station directory: {} stations", directory.len());
        Ok(directory)
    }

    pub fn parse_station_csv(csv_object: &str) -> Result<StationDirectory> {
        StationDirectory::from_csv_reader(csv_object.as_bytes())
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn ids(&self) -> impl Iterator<Item = StationId> + '_ {
        self.stations.iter().map(|station| station.station_id)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn contains(&self, station: StationId) -> bool {
        self.index.contains_key(&station)
    }

    /// Row position of a station in the universe.
    pub fn position(&self, station: StationId) -> Option<usize> {
        self.index.get(&station).copied()
    }

    /// Compact id for a raw station id; `None` for stations outside the universe.
    pub fn remap(&self, station: StationId) -> Option<u32> {
        self.position(station).map(|i| self.stations[i].new_id)
    }
}
