//! Instant handling.
//!
//! Everything inside the core works on epoch milliseconds (`i64`). Callers
//! and persisted plans may hand us either a number or an ISO-8601 string, so
//! inputs arrive as [`TimeInput`] and are normalised here.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};

pub const MS_PER_MINUTE: i64 = 60_000;
pub const MS_PER_HOUR: i64 = 3_600_000;

/// 0001-01-01T00:00:00.000Z
pub const MIN_EPOCH_MS: i64 = -62_135_596_800_000;

/// 9999-12-31T23:59:59.999Z
pub const MAX_EPOCH_MS: i64 = 253_402_300_799_999;

/// Whether `ms` is an instant we can format and parse back as ISO-8601
pub fn is_valid_epoch_ms(ms: i64) -> bool {
    (MIN_EPOCH_MS..=MAX_EPOCH_MS).contains(&ms)
}

/// An instant as supplied by a caller: epoch ms or an ISO-8601 string
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeInput {
    Millis(i64),
    /// JSON numbers with a fractional part or exponent
    Float(f64),
    Text(String),
}

impl TimeInput {
    /// Normalise to epoch milliseconds, `None` when the value is unusable
    /// or outside years 1..=9999
    pub fn to_epoch_ms(&self) -> Option<i64> {
        let ms = match self {
            TimeInput::Millis(ms) => *ms,
            TimeInput::Float(f) => {
                if !(f.is_finite() && f.abs() < i64::MAX as f64) {
                    return None;
                }
                f.round() as i64
            }
            TimeInput::Text(s) => parse_iso(s)?,
        };
        is_valid_epoch_ms(ms).then_some(ms)
    }

    /// ISO-8601 form used when writing plans back out
    pub fn iso(ms: i64) -> Self {
        TimeInput::Text(to_iso(ms))
    }
}

impl From<i64> for TimeInput {
    fn from(ms: i64) -> Self {
        TimeInput::Millis(ms)
    }
}

impl From<DateTime<Utc>> for TimeInput {
    fn from(dt: DateTime<Utc>) -> Self {
        TimeInput::Millis(dt.timestamp_millis())
    }
}

impl From<&str> for TimeInput {
    fn from(s: &str) -> Self {
        TimeInput::Text(s.to_string())
    }
}

/// Parse an ISO-8601 / RFC 3339 string into epoch ms.
///
/// Strings without an offset are read as UTC.
pub fn parse_iso(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }
    None
}

/// Format epoch ms as RFC 3339 with millisecond precision (`...T20:00:00.000Z`)
pub fn to_iso(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => ms.to_string(),
    }
}

/// Convert fractional hours to whole milliseconds, saturating at the `i64` bounds
pub fn hours_to_ms(hours: f64) -> i64 {
    (hours * MS_PER_HOUR as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let utc = parse_iso("2026-10-18T20:00:00Z").unwrap();
        let cest = parse_iso("2026-10-18T22:00:00+02:00").unwrap();
        assert_eq!(utc, cest);
    }

    #[test]
    fn test_naive_string_is_utc() {
        assert_eq!(
            parse_iso("2026-10-18T20:00:00"),
            parse_iso("2026-10-18T20:00:00Z")
        );
        assert_eq!(
            parse_iso("2026-10-18 20:00"),
            parse_iso("2026-10-18T20:00:00Z")
        );
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(TimeInput::from("not a date").to_epoch_ms(), None);
        assert_eq!(TimeInput::Float(f64::NAN).to_epoch_ms(), None);
        assert_eq!(TimeInput::Float(f64::INFINITY).to_epoch_ms(), None);
    }

    #[test]
    fn test_number_and_string_agree() {
        let ms = parse_iso("2026-10-18T20:00:00.250Z").unwrap();
        assert_eq!(TimeInput::Millis(ms).to_epoch_ms(), Some(ms));
        assert_eq!(TimeInput::iso(ms).to_epoch_ms(), Some(ms));
        assert_eq!(to_iso(ms), "2026-10-18T20:00:00.250Z");
    }

    #[test]
    fn test_untagged_deserialize() {
        let from_num: TimeInput = serde_json::from_str("1760817600000").unwrap();
        let from_str: TimeInput = serde_json::from_str("\"2025-10-18T20:00:00Z\"").unwrap();
        assert_eq!(from_num.to_epoch_ms(), from_str.to_epoch_ms());
    }

    #[test]
    fn test_out_of_range_epochs_rejected() {
        assert_eq!(TimeInput::Millis(i64::MAX - 1_000).to_epoch_ms(), None);
        assert_eq!(TimeInput::Millis(i64::MIN).to_epoch_ms(), None);
        assert_eq!(TimeInput::Float(1e18).to_epoch_ms(), None);
        assert_eq!(TimeInput::Millis(MAX_EPOCH_MS).to_epoch_ms(), Some(MAX_EPOCH_MS));

        // The bounds survive an ISO round trip
        assert_eq!(TimeInput::iso(MIN_EPOCH_MS).to_epoch_ms(), Some(MIN_EPOCH_MS));
        assert_eq!(to_iso(MAX_EPOCH_MS), "9999-12-31T23:59:59.999Z");
    }

    #[test]
    fn test_hours_to_ms() {
        assert_eq!(hours_to_ms(2.25), 8_100_000);
        assert_eq!(hours_to_ms(0.0), 0);
    }
}
