pub mod carry_over;
pub mod error;
pub mod grid;
pub mod ids;
pub mod location;
pub mod station;
pub mod trip;

pub use error::{FleetError, Result};
