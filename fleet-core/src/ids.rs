use fleet_utils::ids::parse_numeric_id;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical vehicle identifier.
///
/// Logs spell the same bike as `17`, `"17"` or `17.0`; all of them
/// normalize to `VehicleId(17)` so matrix columns are keyed consistently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub u32);

impl VehicleId {
    pub fn parse(raw: &str) -> Option<VehicleId> {
        parse_numeric_id(raw).map(VehicleId)
    }
}

impl From<u32> for VehicleId {
    fn from(value: u32) -> Self {
        VehicleId(value)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw docking-station identifier as it appears in the trip log.
///
/// Always at least 1: zero and negative numbers are reserved for the
/// transit and unobserved codes used when tables are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StationId(u32);

impl StationId {
    pub fn new(id: u32) -> Option<StationId> {
        (id >= 1).then_some(StationId(id))
    }

    pub fn parse(raw: &str) -> Option<StationId> {
        parse_numeric_id(raw).and_then(StationId::new)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_ids_normalize() {
        assert_eq!(VehicleId::parse("17"), Some(VehicleId(17)));
        assert_eq!(VehicleId::parse("17.0"), Some(VehicleId(17)));
        assert_eq!(VehicleId::parse("bike"), None);
        assert_eq!(VehicleId(21).to_string(), "21");
    }

    #[test]
    fn station_ids_reserve_zero() {
        assert!(StationId::new(0).is_none());
        assert_eq!(StationId::new(72).map(|s| s.get()), Some(72));
        assert_eq!(StationId::parse("519.0"), StationId::new(519));
        assert!(StationId::parse("0").is_none());
        assert!(StationId::parse("").is_none());
    }
}
