use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};

use crate::error::{AppError, Result};

/// Render a UTC instant the way the output document expects (`...Z`).
pub fn iso_utc(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Convert an epoch-millisecond candle timestamp into an ISO-8601 UTC string.
pub fn iso_from_millis(millis: i64) -> Result<String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .map(iso_utc)
        .ok_or_else(|| AppError::message(format!("timestamp {millis} is out of range")))
}

/// Accept either a bare `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 instant.
pub fn parse_date_bound(value: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let Some(naive) = date.and_hms_opt(0, 0, 0) else {
            return Err(AppError::message(format!("invalid date `{trimmed}`")));
        };
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Ok(DateTime::parse_from_rfc3339(trimmed)?.with_timezone(&Utc))
}

/// Format a duration as `HH:MM:SS` for the progress line.
pub fn format_clock(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
