use chrono::{DateTime, NaiveDate, Utc};

/// Local-date bucket for analyzer grouping, §4.3: always derived from the
/// transcript's own UTC `start_time`, never from a caller-supplied
/// `time_stamp` — see SPEC_FULL.md §4.3 / Open Question (i).
pub fn local_date_of_utc(t: DateTime<Utc>) -> NaiveDate {
    t.date_naive()
}

/// Parses an IANA timezone name, returning `VesperError::InvalidTimezone` on
/// failure rather than silently falling back — callers decide the fallback.
pub fn parse_timezone(name: &str) -> Result<chrono_tz::Tz, crate::VesperError> {
    name.parse::<chrono_tz::Tz>()
        .map_err(|_| crate::VesperError::InvalidTimezone(name.to_string()))
}
