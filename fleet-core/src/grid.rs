use crate::error::{FleetError, Result};
use chrono::{NaiveDateTime, TimeDelta};
use fleet_utils::dates::parse_window_start;
use std::mem::replace;

/// Every window month is sampled as 31 days of hourly points.
pub const HOURS_PER_MONTH: usize = 24 * 31;

/// Spacing between consecutive grid points.
pub fn step() -> TimeDelta {
    TimeDelta::hours(1)
}

/// An hourly iterator that yields each timestamp from the start
/// up to, but excluding, the end.
#[derive(Clone, Eq, PartialEq, Copy, Debug)]
pub struct HourRange(pub NaiveDateTime, pub NaiveDateTime);

impl Iterator for HourRange {
    type Item = NaiveDateTime;
    fn next(&mut self) -> Option<Self::Item> {
        if self.0 < self.1 {
            let next = self.0.checked_add_signed(step())?;
            Some(replace(&mut self.0, next))
        } else {
            None
        }
    }
}

/// Start and length of one analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub start: NaiveDateTime,
    pub months: u32,
}

impl WindowConfig {
    pub fn new(start: NaiveDateTime, months: i64) -> Result<WindowConfig> {
        if months <= 0 {
            return Err(FleetError::InvalidWindow(format!(
                "window must span at least one month, got {months}"
            )));
        }
        let months = u32::try_from(months)
            .map_err(|_| FleetError::InvalidWindow(format!("{months} months is too long")))?;
        Ok(WindowConfig { start, months })
    }

    /// Parse a `YYYY-MM-DD` (or full timestamp) start plus a month count.
    pub fn parse(start: &str, months: i64) -> Result<WindowConfig> {
        let start = parse_window_start(start)
            .map_err(|e| FleetError::InvalidWindow(format!("start '{start}': {e}")))?;
        WindowConfig::new(start, months)
    }

    pub fn hours(&self) -> usize {
        HOURS_PER_MONTH * self.months as usize
    }

    pub fn grid(&self) -> Result<TimelineGrid> {
        TimelineGrid::build(self.start, self.months as i64)
    }
}

/// The ordered hourly sample points of one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineGrid {
    points: Vec<NaiveDateTime>,
}

impl TimelineGrid {
    /// `24 * 31 * months` points, one hour apart, starting at `start`.
    pub fn build(start: NaiveDateTime, months: i64) -> Result<TimelineGrid> {
        let window = WindowConfig::new(start, months)?;
        let hours = i64::try_from(window.hours())
            .map_err(|_| FleetError::InvalidWindow(format!("{months} months is too long")))?;
        let end = TimeDelta::try_hours(hours)
            .and_then(|span| start.checked_add_signed(span))
            .ok_or_else(|| FleetError::InvalidWindow(format!("window from {start} overflows")))?;
        let points: Vec<NaiveDateTime> = HourRange(start, end).collect();
        if points.len() != window.hours() {
            return Err(FleetError::InvalidWindow(format!(
                "window from {start} overflows"
            )));
        }
        Ok(TimelineGrid { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[NaiveDateTime] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &NaiveDateTime> + '_ {
        self.points.iter()
    }

    pub fn get(&self, index: usize) -> Option<NaiveDateTime> {
        self.points.get(index).copied()
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        self.points.first().copied()
    }

    /// First instant after the window (last point plus one step).
    pub fn end(&self) -> Option<NaiveDateTime> {
        self.points
            .last()
            .and_then(|last| last.checked_add_signed(step()))
    }

    /// Index of a timestamp that is exactly a grid point.
    pub fn index_of(&self, ts: &NaiveDateTime) -> Option<usize> {
        self.points.binary_search(ts).ok()
    }

    /// Index of the first grid point at or after `ts`.
    pub fn first_at_or_after(&self, ts: &NaiveDateTime) -> Option<usize> {
        let index = self.points.partition_point(|point| point < ts);
        (index < self.points.len()).then_some(index)
    }

    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        match (self.start(), self.end()) {
            (Some(start), Some(end)) => *ts >= start && *ts < end,
            _ => false,
        }
    }
}
