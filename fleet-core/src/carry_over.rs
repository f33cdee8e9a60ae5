use crate::{
    error::{FleetError, Result},
    ids::VehicleId,
    location::Location,
};
use csv::{ReaderBuilder, Trim, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    io::{Read, Write},
};

/// Vehicle locations inherited from the end of the previous window,
/// used to seed the first grid point of the next one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarryOver(HashMap<VehicleId, Location>);

#[derive(Debug, Serialize, Deserialize)]
struct CarryOverRow {
    bikeid: String,
    location: i64,
}

impl CarryOver {
    pub fn new() -> CarryOver {
        CarryOver::default()
    }

    /// Record a known location. Unobserved carries no state and is ignored.
    pub fn insert(&mut self, vehicle: VehicleId, location: Location) {
        if location != Location::Unobserved {
            self.0.insert(vehicle, location);
        }
    }

    pub fn get(&self, vehicle: VehicleId) -> Option<Location> {
        self.0.get(&vehicle).copied()
    }

    pub fn vehicles(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.0.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read `bikeid,location` rows, locations as table codes.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<CarryOver> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        let mut carry = CarryOver::new();
        for row in rdr.deserialize::<CarryOverRow>() {
            let row = row?;
            let vehicle = VehicleId::parse(&row.bikeid)
                .ok_or_else(|| FleetError::InvalidRecord(format!("bad bikeid '{}'", row.bikeid)))?;
            let location = Location::from_code(row.location).ok_or_else(|| {
                FleetError::InvalidRecord(format!("bad location code {} for {vehicle}", row.location))
            })?;
            carry.insert(vehicle, location);
        }
        Ok(carry)
    }

    pub fn parse_carry_over_csv(csv_object: &str) -> Result<CarryOver> {
        CarryOver::from_csv_reader(csv_object.as_bytes())
    }

    /// Write `bikeid,location` rows in ascending vehicle order.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        let mut vehicles: Vec<_> = self.0.iter().collect();
        vehicles.sort_by_key(|(vehicle, _)| **vehicle);
        for (vehicle, location) in vehicles {
            wtr.serialize(CarryOverRow {
                bikeid: vehicle.to_string(),
                location: location.code(),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl FromIterator<(VehicleId, Location)> for CarryOver {
    fn from_iter<T: IntoIterator<Item = (VehicleId, Location)>>(iter: T) -> Self {
        let mut carry = CarryOver::new();
        for (vehicle, location) in iter {
            carry.insert(vehicle, location);
        }
        carry
    }
}
