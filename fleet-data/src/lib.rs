//! Reconstruction and analysis of vehicle locations from rental trips.
//!
//! Trip starts and stops are sparse, irregular observations of where a
//! vehicle is. This crate resamples them onto the hourly timeline of a
//! window and derives station occupancy, dwell-time stays and operator
//! rebalancing moves from the result.

pub mod descriptive;
pub mod matrix;
pub mod occupancy;
pub mod rebalance;
pub mod reconstruct;
pub mod stays;

#[cfg(test)]
mod fixtures;
#[cfg(test)]
mod properties;

pub use matrix::FleetLocationMatrix;
pub use occupancy::{occupancy, unaccounted_count, StationOccupancy};
pub use rebalance::{detect_fleet_rebalancing, detect_rebalancing, Direction, RebalancingTables};
pub use reconstruct::{reconstruct, LocationSeries};
pub use stays::{extract_stays, Stay, StayTable};
