//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};

/// Current UTC timestamp, truncated to the microsecond precision kept in
/// the database
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 form used for stored timestamps
///
/// Fixed width keeps lexical order equal to chronological order, so text
/// columns sort correctly.
pub fn to_db_string(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 timestamp as stored in the database
pub fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_parse_rfc3339_round_trips_stored_form() {
        let original = now();
        let parsed = parse_rfc3339(&original.to_rfc3339()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_db_string_round_trips_now() {
        let original = now();
        let stored = to_db_string(&original);
        assert!(stored.ends_with('Z'));
        assert_eq!(parse_rfc3339(&stored).unwrap(), original);
    }

    #[test]
    fn test_db_string_sorts_chronologically() {
        let earlier = parse_rfc3339("2025-04-03T06:24:59Z").unwrap();
        let later = parse_rfc3339("2025-04-03T06:24:59.5Z").unwrap();
        assert!(to_db_string(&earlier) < to_db_string(&later));
    }

    #[test]
    fn test_parse_rfc3339_normalizes_offset() {
        let parsed = parse_rfc3339("2025-04-03T08:24:59+02:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-04-03T06:24:59+00:00");
    }

    #[test]
    fn test_parse_rfc3339_rejects_garbage() {
        assert!(parse_rfc3339("yesterday").is_err());
    }
}
