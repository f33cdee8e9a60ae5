/// Error types for the fleet libraries
use crate::ids::VehicleId;
use chrono::NaiveDateTime;
use thiserror::Error;

/// Main error type for fleet reconstruction and analysis
#[derive(Error, Debug)]
pub enum FleetError {
    /// Window duration is not positive or the start date could not be parsed
    #[error("Invalid analysis window: {0}")]
    InvalidWindow(String),

    /// A trip whose stop is not strictly after its start reached the engine
    #[error("Malformed trip for vehicle {vehicle}: stop {stop} is not after start {start}")]
    MalformedEvent {
        vehicle: VehicleId,
        start: NaiveDateTime,
        stop: NaiveDateTime,
    },

    /// A trip belonging to another vehicle was handed to a per-vehicle stage
    #[error("Trip of vehicle {found} handed to vehicle {expected}")]
    VehicleMismatch {
        expected: VehicleId,
        found: VehicleId,
    },

    /// Failed to read or write CSV
    #[error("Failed to process CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Underlying reader or writer failed
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Input table is structurally unusable (missing column, bad code)
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Type alias for Results using FleetError
pub type Result<T> = std::result::Result<T, FleetError>;
