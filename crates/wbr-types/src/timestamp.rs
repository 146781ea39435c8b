//! Capture timestamp conversions.
//!
//! Index records carry 14-digit `YYYYMMDDhhmmss` timestamps, WARC headers
//! carry ISO-8601 dates, and Memento headers carry RFC 1123 HTTP dates. All
//! values are UTC with second precision.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{TypeError, TypeResult};

/// Length of a fully specified capture timestamp.
pub const TIMESTAMP_LEN: usize = 14;

/// Pad a partial timestamp (e.g. `"2014"`, `"201401"`) to 14 digits,
/// filling missing components with their earliest value.
///
/// Non-digit characters are ignored and anything past 14 digits is dropped.
pub fn pad_timestamp(ts: &str) -> String {
    const EARLIEST: &str = "00000101000000";

    let mut digits: String = ts.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.truncate(TIMESTAMP_LEN);
    let fill = &EARLIEST[digits.len().min(TIMESTAMP_LEN)..];
    digits.push_str(fill);
    digits
}

/// Convert a (possibly partial) capture timestamp to a UTC datetime.
///
/// Out-of-range components are clamped rather than rejected: month 13
/// becomes December, day 31 in April becomes the 30th, hour 25 becomes 23.
pub fn timestamp_to_datetime(ts: &str) -> TypeResult<DateTime<Utc>> {
    let digit_count = ts.chars().filter(|c| c.is_ascii_digit()).count();
    if digit_count < 4 {
        return Err(TypeError::InvalidTimestamp(ts.to_string()));
    }
    let padded = pad_timestamp(ts);
    let part = |range: std::ops::Range<usize>| -> u32 {
        padded[range].parse::<u32>().unwrap_or(0)
    };

    let year = part(0..4) as i32;
    let month = part(4..6).clamp(1, 12);
    let mut day = part(6..8).max(1);
    let hour = part(8..10).min(23);
    let minute = part(10..12).min(59);
    let second = part(12..14).min(59);

    let date = loop {
        match NaiveDate::from_ymd_opt(year, month, day) {
            Some(date) => break date,
            None if day > 28 => day -= 1,
            None => return Err(TypeError::InvalidTimestamp(ts.to_string())),
        }
    };

    date.and_hms_opt(hour, minute, second)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TypeError::InvalidTimestamp(ts.to_string()))
}

/// Format a datetime as a 14-digit capture timestamp.
pub fn datetime_to_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y%m%d%H%M%S").to_string()
}

/// Format a datetime as an RFC 1123 HTTP date (`Mon, 27 Jan 2014 17:12:00 GMT`).
pub fn datetime_to_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Format a datetime as a second-precision ISO-8601 date (`2014-01-27T17:12:00Z`).
pub fn datetime_to_iso_date(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse an ISO-8601 / RFC 3339 date as found in `WARC-Date` headers.
///
/// Fractional seconds are accepted and truncated; a missing `Z` is treated
/// as UTC.
pub fn iso_date_to_datetime(value: &str) -> TypeResult<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(truncate_subsec(dt.with_timezone(&Utc)));
    }

    let bare = trimmed.trim_end_matches('Z');
    chrono::NaiveDateTime::parse_from_str(bare, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(bare, "%Y-%m-%dT%H:%M:%S"))
        .map(|naive| truncate_subsec(naive.and_utc()))
        .map_err(|_| TypeError::InvalidTimestamp(value.to_string()))
}

/// Convert an ISO-8601 date straight to a 14-digit capture timestamp.
pub fn iso_date_to_timestamp(value: &str) -> TypeResult<String> {
    iso_date_to_datetime(value).map(|dt| datetime_to_timestamp(&dt))
}

/// Seconds since the UNIX epoch for a (possibly partial) capture timestamp.
pub fn timestamp_to_sec(ts: &str) -> TypeResult<i64> {
    timestamp_to_datetime(ts).map(|dt| dt.timestamp())
}

fn truncate_subsec(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(dt.timestamp(), 0).unwrap_or(dt)
}
