// SPDX-License-Identifier: MIT

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Format an epoch-milliseconds timestamp as `DD/MM/YYYY`.
///
/// Out-of-range timestamps render as a placeholder rather than panicking,
/// mirroring how the dashboard shows unparseable dates.
pub fn format_millis_ddmmyyyy(millis: i64) -> String {
    match Utc.timestamp_millis_opt(millis).single() {
        Some(dt) => dt.format("%d/%m/%Y").to_string(),
        None => "--/--/----".to_string(),
    }
}
