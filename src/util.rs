//! File-name-safe timestamps and elapsed time formatting

use crate::error::{EraseError, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::{path::Path, time::Duration};

/// `YYYY-MM-DD`
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// `YYYY-MM-DDTHH-MM-SS` (ISO 8601 with colons replaced for file systems)
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Name for a timestamp, e.g. `2024-03-01T09-15-00.log`
#[must_use]
pub fn datetime_to_name(when: &NaiveDateTime, ext: Option<&str>) -> String {
    with_extension(when.format(DATETIME_FORMAT).to_string(), ext)
}

/// Name for a date, e.g. `2024-03-01.csv`
#[must_use]
pub fn date_to_name(when: &NaiveDate, ext: Option<&str>) -> String {
    with_extension(when.format(DATE_FORMAT).to_string(), ext)
}

/// Name for the current local time
#[must_use]
pub fn now_name(ext: Option<&str>) -> String {
    datetime_to_name(&Local::now().naive_local(), ext)
}

/// Name for the current local date
#[must_use]
pub fn today_name(ext: Option<&str>) -> String {
    date_to_name(&Local::now().date_naive(), ext)
}

/// Parse a name produced by [`datetime_to_name`] or [`date_to_name`]
///
/// Accepts full paths and ignores the extension. Date-only names resolve to
/// midnight.
pub fn datetime_from_name(name: &str) -> Result<NaiveDateTime> {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| EraseError::invalid_input(format!("No timestamp in name '{}'", name)))?;

    // a datetime name has two dashes in the date and two in the time
    if stem.matches('-').count() == 4 {
        NaiveDateTime::parse_from_str(stem, DATETIME_FORMAT).map_err(|e| {
            EraseError::invalid_input(format!("Invalid timestamp name '{}': {}", name, e))
        })
    } else {
        let date = NaiveDate::parse_from_str(stem, DATE_FORMAT).map_err(|e| {
            EraseError::invalid_input(format!("Invalid date name '{}': {}", name, e))
        })?;
        date.and_hms_opt(0, 0, 0)
            .ok_or_else(|| EraseError::internal(format!("Midnight does not exist on {}", date)))
    }
}

/// Parse the date part of a timestamp or date name
pub fn date_from_name(name: &str) -> Result<NaiveDate> {
    datetime_from_name(name).map(|dt| dt.date())
}

fn with_extension(mut name: String, ext: Option<&str>) -> String {
    if let Some(ext) = ext.filter(|e| !e.is_empty()) {
        if !ext.starts_with('.') {
            name.push('.');
        }
        name.push_str(ext);
    }
    name
}

/// Format a duration as `H:MM:SS[.ffffff]`, prefixed with days when needed
///
/// Microseconds are only shown when non-zero, e.g. `0:00:01.250000`.
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_seconds = elapsed.as_secs();
    let micros = elapsed.subsec_micros();
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{} day{}, ", days, if days == 1 { "" } else { "s" }));
    }
    out.push_str(&format!("{}:{:02}:{:02}", hours, minutes, seconds));
    if micros > 0 {
        out.push_str(&format!(".{:06}", micros));
    }
    out
}
