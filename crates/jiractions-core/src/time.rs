//! Timestamp parsing for issue-tracker payloads.
//!
//! Tracker exports are not consistent about datetime formats: REST payloads
//! carry `2016-08-01T10:30:00.000-0600` (no colon in the offset), while run
//! configuration is usually written as `2016-08-01` or
//! `2016-08-01 10:30:00`. Everything is normalized to UTC on parse.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

/// Error returned when a datetime string matches none of the accepted forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeParseError {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for TimeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unrecognized datetime '{}': expected RFC 3339, \
             YYYY-MM-DDTHH:MM:SS.mmm±zzzz, YYYY-MM-DD HH:MM:SS, or YYYY-MM-DD",
            self.raw
        )
    }
}

impl std::error::Error for TimeParseError {}

/// Parse a datetime in any of the accepted forms, normalized to UTC.
///
/// Accepted, in order of preference:
/// 1. RFC 3339 (`2016-08-01T10:30:00+00:00`)
/// 2. REST changelog form (`2016-08-01T10:30:00.000-0600`)
/// 3. Space-separated local form, read as UTC (`2016-08-01 10:30:00`)
/// 4. Bare date, read as UTC midnight (`2016-08-01`)
///
/// # Errors
///
/// Returns [`TimeParseError`] when the input matches none of the forms.
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(TimeParseError {
        raw: trimmed.to_string(),
    })
}

/// Serde adapter for timestamp fields in tracker payloads.
///
/// Use with `#[serde(with = "crate::time::flexible")]`. Deserializes any
/// form accepted by [`parse_datetime`]; serializes as RFC 3339.
pub mod flexible {
    use super::parse_datetime;
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a UTC datetime as RFC 3339 with millisecond precision.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Deserialize a datetime in any accepted form.
    ///
    /// # Errors
    ///
    /// Fails when the string matches none of the accepted forms.
    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_datetime(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn parses_rfc3339() {
        let dt = parse_datetime("2016-08-01T10:30:00+00:00").expect("should parse");
        assert_eq!(dt, Utc.with_ymd_and_hms(2016, 8, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn parses_rest_offset_without_colon() {
        let dt = parse_datetime("2016-08-01T10:30:00.000-0600").expect("should parse");
        assert_eq!(dt, Utc.with_ymd_and_hms(2016, 8, 1, 16, 30, 0).unwrap());
    }

    #[test]
    fn parses_space_separated_as_utc() {
        let dt = parse_datetime("2016-08-01 00:00:00").expect("should parse");
        assert_eq!(dt, Utc.with_ymd_and_hms(2016, 8, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn parses_bare_date_as_midnight() {
        let dt = parse_datetime("2016-08-07").expect("should parse");
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt, Utc.with_ymd_and_hms(2016, 8, 7, 0, 0, 0).unwrap());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let dt = parse_datetime("  2016-08-01 12:00:00\n").expect("should parse");
        assert_eq!(dt, Utc.with_ymd_and_hms(2016, 8, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        let err = parse_datetime("next tuesday").unwrap_err();
        assert_eq!(err.raw, "next tuesday");
        assert!(err.to_string().contains("next tuesday"));
    }

    #[test]
    fn serde_adapter_roundtrips() {
        use serde::{Deserialize, Serialize};

        #[derive(Serialize, Deserialize)]
        struct Stamped {
            #[serde(with = "flexible")]
            at: DateTime<Utc>,
        }

        let json = r#"{"at":"2016-08-01T10:30:00.000-0600"}"#;
        let stamped: Stamped = serde_json::from_str(json).unwrap();
        assert_eq!(
            stamped.at,
            Utc.with_ymd_and_hms(2016, 8, 1, 16, 30, 0).unwrap()
        );

        let rendered = serde_json::to_string(&stamped).unwrap();
        assert!(rendered.contains("2016-08-01T16:30:00.000Z"));
    }
}
