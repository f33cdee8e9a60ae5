//! Opening trip logs, station and carry-over CSVs and output files.

use anyhow::Context;
use flate2::read::GzDecoder;
use fleet_core::{
    carry_over::CarryOver,
    station::StationDirectory,
    trip::{IngestReport, TripLog},
};
use log::info;
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read},
    path::Path,
};

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Decompress `reader` on the fly when `gzip` is set.
pub fn decoded<'a, R: Read + 'a>(reader: R, gzip: bool) -> Box<dyn Read + 'a> {
    if gzip {
        Box::new(GzDecoder::new(reader))
    } else {
        Box::new(reader)
    }
}

/// Open a CSV for reading; `.gz` files are decompressed transparently.
pub fn open_input(path: &Path) -> anyhow::Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(decoded(BufReader::new(file), is_gzip(path)))
}

pub fn create_output(path: &Path) -> anyhow::Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn load_trips(path: &Path) -> anyhow::Result<(TripLog, IngestReport)> {
    info!("Reading trips from {}", path.display());
    let reader = open_input(path)?;
    TripLog::from_csv_reader(reader).with_context(|| format!("reading trips from {}", path.display()))
}

/// The station universe from `path`, or every station the log mentions.
pub fn load_stations(path: Option<&Path>, log: &TripLog) -> anyhow::Result<StationDirectory> {
    let stations = match path {
        Some(path) => {
            let reader = open_input(path)?;
            StationDirectory::from_csv_reader(reader)
                .with_context(|| format!("reading stations from {}", path.display()))?
        }
        None => StationDirectory::from_trips(log),
    };
    info!("Station universe: {} stations", stations.len());
    Ok(stations)
}

/// Carried-over locations from `path`; empty when no file is given.
pub fn load_carry_over(path: Option<&Path>) -> anyhow::Result<CarryOver> {
    let Some(path) = path else {
        return Ok(CarryOver::new());
    };
    let reader = open_input(path)?;
    let carry = CarryOver::from_csv_reader(reader)
        .with_context(|| format!("reading carry-over from {}", path.display()))?;
    info!("Carried over {} vehicle locations", carry.len());
    Ok(carry)
}
