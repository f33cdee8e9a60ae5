//! Shared utility functions for the fleet crates.

/// Date and timestamp utility functions
pub mod dates {
    use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

    /// Timestamp layouts seen across trip-log exports, tried in order.
    pub const TIMESTAMP_FORMATS: [&str; 6] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%m/%d/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M",
        "%Y-%m-%dT%H:%M:%S",
    ];

    /// Format used when writing grid timestamps.
    pub const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Format a timestamp as "YYYY-MM-DD HH:MM:SS"
    pub fn format_timestamp(ts: &NaiveDateTime) -> String {
        ts.format(OUTPUT_FORMAT).to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
    }

    /// Parse a trip-log timestamp in any of [`TIMESTAMP_FORMATS`].
    pub fn parse_timestamp(s: &str) -> anyhow::Result<NaiveDateTime> {
        let s = s.trim();
        for format in TIMESTAMP_FORMATS {
            if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(ts);
            }
        }
        Err(crate::error::DateError(format!("unrecognized timestamp '{s}'")).into())
    }

    /// Parse the start of an analysis window: a bare date means midnight.
    pub fn parse_window_start(s: &str) -> anyhow::Result<NaiveDateTime> {
        match parse_date(s) {
            Ok(date) => Ok(date.and_time(NaiveTime::MIN)),
            Err(_) => parse_timestamp(s),
        }
    }

    /// Monday through Friday.
    pub fn is_weekday(ts: &NaiveDateTime) -> bool {
        !matches!(ts.weekday(), Weekday::Sat | Weekday::Sun)
    }

}

/// Identifier normalization
pub mod ids {
    /// Normalize a numeric identifier as it appears in exported logs.
    ///
    /// Spreadsheet round-trips turn `17` into `17.0`; both map to `17`.
    /// Empty cells, `NULL`, negative or fractional values yield `None`.
    pub fn parse_numeric_id(s: &str) -> Option<u32> {
        let s = s.trim().trim_matches('"');
        if s.is_empty() {
            return None;
        }
        if let Ok(id) = s.parse::<u32>() {
            return Some(id);
        }
        let value = s.parse::<f64>().ok()?;
        if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
            Some(value as u32)
        } else {
            None
        }
    }

}

/// Error types
pub mod error {
    use std::fmt;

    #[derive(Debug)]
    pub struct DateError(pub String);

    impl fmt::Display for DateError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Date error: {}", self.0)
        }
    }

    impl std::error::Error for DateError {}
}
