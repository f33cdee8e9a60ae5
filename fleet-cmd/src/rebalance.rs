//! Rebalancing detection command.

use crate::{
    input::{create_output, load_trips},
    WindowArgs,
};
use anyhow::Context;
use fleet_data::{detect_fleet_rebalancing, Direction};
use log::info;
use std::path::Path;

pub fn run_rebalance(
    window: &WindowArgs,
    adds: &Path,
    removes: &Path,
    events: Option<&Path>,
) -> anyhow::Result<()> {
    let grid = window.window()?.grid()?;
    let (log, _) = load_trips(&window.trips)?;
    let tables = detect_fleet_rebalancing(&log, &grid)?;

    for (direction, path) in [(Direction::Add, adds), (Direction::Remove, removes)] {
        tables
            .write_table_csv(direction, create_output(path)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("{:?} table written to {}", direction, path.display());
    }
    if let Some(path) = events {
        tables
            .write_events_csv(create_output(path)?)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("{} events written to {}", tables.events().len(), path.display());
    }
    Ok(())
}
