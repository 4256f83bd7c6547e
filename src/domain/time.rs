//! ISO-8601 timestamp parsing

use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;

use super::error::DomainError;

fn iso_8601_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d{1,3})?(?:Z|[+-]\d{2}:\d{2})$")
            .expect("static ISO-8601 pattern is valid")
    })
}

/// Parse an ISO-8601 date-time string into a UTC timestamp.
///
/// Accepts `YYYY-MM-DDTHH:MM:SS`, an optional fraction of up to three digits,
/// and either `Z` or a `+HH:MM`/`-HH:MM` offset. Strings with the right shape
/// that do not name a real instant (month 13, Feb 30) are rejected too.
pub fn parse_iso8601(value: &str) -> Result<DateTime<Utc>, DomainError> {
    if !iso_8601_pattern().is_match(value) {
        return Err(DomainError::MalformedTimestamp(value.to_string()));
    }

    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DomainError::InvalidTimestampValue(value.to_string()))
}

/// Format a timestamp the way it goes over the wire (millisecond precision, `Z`)
pub fn format_iso8601(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
