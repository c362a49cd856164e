//! Timestamp parsing with a UTC default for offset-less values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Default timestamp format for candle and signal sources.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse `raw` with `format` into a UTC instant.
///
/// Resolution order:
/// 1. offset-aware parse (format contains `%z` or similar) → converted to UTC
/// 2. naive date-time → assumed UTC
/// 3. naive date (date-only formats) → midnight UTC
pub fn parse_timestamp(raw: &str, format: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_str(raw, format) {
        return Ok(dt.with_timezone(&Utc));
    }
    match NaiveDateTime::parse_from_str(raw, format) {
        Ok(naive) => Ok(Utc.from_utc_datetime(&naive)),
        Err(err) => {
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                    return Ok(Utc.from_utc_datetime(&naive));
                }
            }
            Err(format!("invalid timestamp '{raw}' for format '{format}': {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naive_value_is_utc() {
        let ts = parse_timestamp("2024-03-01 12:30:00", DEFAULT_TIMESTAMP_FORMAT).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
    }

    #[test]
    fn offset_value_is_converted_to_utc() {
        let ts = parse_timestamp("2024-03-01 12:30:00 +0200", "%Y-%m-%d %H:%M:%S %z").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn date_only_format_is_midnight() {
        let ts = parse_timestamp("2024-03-01", "%Y-%m-%d").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert!(parse_timestamp("  2024-03-01 00:00:00 ", DEFAULT_TIMESTAMP_FORMAT).is_ok());
    }

    #[test]
    fn mismatched_format_errors() {
        let err = parse_timestamp("01/03/2024", DEFAULT_TIMESTAMP_FORMAT).unwrap_err();
        assert!(err.contains("01/03/2024"));
    }
}
