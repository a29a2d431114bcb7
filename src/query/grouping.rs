//! Grouping directives
//!
//! A `GroupBy` selects how the aggregator bundles readings into buckets:
//! not at all, by calendar period, or into a target number of buckets.
//! Parsing is permissive: anything that is not a calendar unit or a
//! positive integer means "no grouping".

use crate::query::error::{QueryError, QueryResult};
use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

/// Calendar units usable for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarUnit {
    Year,
    Month,
    /// ISO week number (weeks start on Monday) within the calendar year
    Week,
    Day,
    Hour,
    Minute,
}

/// Identity of the calendar period a timestamp falls in
///
/// Only comparable between keys of the same unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodKey(i32, u32, u32, u32);

impl CalendarUnit {
    /// All units, coarsest first
    pub fn all() -> &'static [CalendarUnit] {
        &[
            CalendarUnit::Year,
            CalendarUnit::Month,
            CalendarUnit::Week,
            CalendarUnit::Day,
            CalendarUnit::Hour,
            CalendarUnit::Minute,
        ]
    }

    /// Parse a unit name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "year" => Some(Self::Year),
            "month" => Some(Self::Month),
            "week" => Some(Self::Week),
            "day" => Some(Self::Day),
            "hour" => Some(Self::Hour),
            "minute" => Some(Self::Minute),
            _ => None,
        }
    }

    /// Period of a millisecond timestamp on the wall clock of `tz`
    ///
    /// Returns `None` for timestamps chrono cannot represent.
    pub fn period_of<Tz: TimeZone>(&self, timestamp: i64, tz: &Tz) -> Option<PeriodKey> {
        let dt: DateTime<Tz> = tz.timestamp_millis_opt(timestamp).single()?;

        let key = match self {
            Self::Year => PeriodKey(dt.year(), 0, 0, 0),
            Self::Month => PeriodKey(dt.year(), dt.month(), 0, 0),
            // Calendar year, not ISO year: a week crossing New Year splits
            Self::Week => PeriodKey(dt.year(), dt.iso_week().week(), 0, 0),
            Self::Day => PeriodKey(dt.year(), dt.ordinal(), 0, 0),
            Self::Hour => PeriodKey(dt.year(), dt.ordinal(), dt.hour(), 0),
            Self::Minute => PeriodKey(
                dt.year(),
                dt.ordinal(),
                dt.hour(),
                dt.minute(),
            ),
        };
        Some(key)
    }
}

impl std::fmt::Display for CalendarUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Year => write!(f, "year"),
            Self::Month => write!(f, "month"),
            Self::Week => write!(f, "week"),
            Self::Day => write!(f, "day"),
            Self::Hour => write!(f, "hour"),
            Self::Minute => write!(f, "minute"),
        }
    }
}

/// How readings are bundled into buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupBy {
    /// One bucket per reading
    #[default]
    None,
    /// One bucket per calendar period present in the data
    Calendar(CalendarUnit),
    /// A target number of equal-size buckets
    Count(usize),
}

impl GroupBy {
    /// Parse a grouping directive, falling back to `None` for anything unknown
    ///
    /// Accepts calendar unit names and positive integers.
    pub fn parse(s: &str) -> Self {
        if let Some(unit) = CalendarUnit::parse(s) {
            return Self::Calendar(unit);
        }
        let s = s.trim();
        match s.parse::<i64>() {
            Ok(n) => Self::count(n),
            // Fractional counts truncate like an integer cast
            Err(_) => match s.parse::<f64>() {
                Ok(f) if f.is_finite() => Self::count(f as i64),
                _ => Self::None,
            },
        }
    }

    /// Target-count grouping, or `None` unless `n` is positive
    pub fn count(n: i64) -> Self {
        match usize::try_from(n) {
            Ok(n) if n > 0 => Self::Count(n),
            _ => Self::None,
        }
    }

    /// Interpret a JSON query parameter
    ///
    /// Strings and numbers are coerced like `parse`; `null` means no
    /// grouping. Booleans, arrays and objects cannot be coerced.
    pub fn from_json(value: &serde_json::Value) -> QueryResult<Self> {
        use serde_json::Value;

        match value {
            Value::Null => Ok(Self::None),
            Value::String(s) => Ok(Self::parse(s)),
            Value::Number(n) => match n.as_i64() {
                Some(n) => Ok(Self::count(n)),
                // Fractional counts truncate like an integer cast
                None => Ok(n.as_f64().map_or(Self::None, |f| Self::count(f as i64))),
            },
            other => Err(QueryError::InvalidGrouping(other.to_string())),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

impl From<Option<&str>> for GroupBy {
    fn from(value: Option<&str>) -> Self {
        value.map(Self::parse).unwrap_or_default()
    }
}

impl std::fmt::Display for GroupBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Calendar(unit) => write!(f, "{}", unit),
            Self::Count(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn ms(rfc3339: &str) -> i64 {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn test_parse_calendar_units() {
        assert_eq!(GroupBy::parse("day"), GroupBy::Calendar(CalendarUnit::Day));
        assert_eq!(GroupBy::parse("MONTH"), GroupBy::Calendar(CalendarUnit::Month));
        for unit in CalendarUnit::all() {
            assert_eq!(GroupBy::parse(&unit.to_string()), GroupBy::Calendar(*unit));
        }
    }

    #[test]
    fn test_parse_counts_and_fallback() {
        assert_eq!(GroupBy::parse("24"), GroupBy::Count(24));
        assert_eq!(GroupBy::parse(" 3 "), GroupBy::Count(3));
        assert_eq!(GroupBy::parse("0"), GroupBy::None);
        assert_eq!(GroupBy::parse("-4"), GroupBy::None);
        assert_eq!(GroupBy::parse("fortnight"), GroupBy::None);
        assert_eq!(GroupBy::parse(""), GroupBy::None);
        assert_eq!(GroupBy::parse("2.7"), GroupBy::Count(2));
        assert_eq!(GroupBy::parse("0.9"), GroupBy::None);
        assert_eq!(GroupBy::parse("-2.5"), GroupBy::None);
        assert_eq!(GroupBy::parse("NaN"), GroupBy::None);
        assert_eq!(GroupBy::parse("inf"), GroupBy::None);
        assert_eq!(GroupBy::parse("2.7"), GroupBy::from_json(&json!(2.7)).unwrap());
        assert_eq!(GroupBy::from(None), GroupBy::None);
        assert_eq!(GroupBy::from(Some("hour")), GroupBy::Calendar(CalendarUnit::Hour));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(GroupBy::from_json(&json!(null)).unwrap(), GroupBy::None);
        assert_eq!(GroupBy::from_json(&json!("week")).unwrap(), GroupBy::Calendar(CalendarUnit::Week));
        assert_eq!(GroupBy::from_json(&json!(5)).unwrap(), GroupBy::Count(5));
        assert_eq!(GroupBy::from_json(&json!("5")).unwrap(), GroupBy::Count(5));
        assert_eq!(GroupBy::from_json(&json!(-2)).unwrap(), GroupBy::None);
        assert_eq!(GroupBy::from_json(&json!(2.7)).unwrap(), GroupBy::Count(2));
        assert_eq!(GroupBy::from_json(&json!(0.5)).unwrap(), GroupBy::None);

        assert!(matches!(
            GroupBy::from_json(&json!(true)),
            Err(QueryError::InvalidGrouping(_))
        ));
        assert!(GroupBy::from_json(&json!({"unit": "day"})).is_err());
        assert!(GroupBy::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_period_boundaries_utc() {
        let a = ms("2024-03-10T23:59:59Z");
        let b = ms("2024-03-11T00:00:00Z");

        let day = CalendarUnit::Day;
        assert_ne!(day.period_of(a, &Utc), day.period_of(b, &Utc));

        let month = CalendarUnit::Month;
        assert_eq!(month.period_of(a, &Utc), month.period_of(b, &Utc));

        let hour = CalendarUnit::Hour;
        assert_eq!(
            hour.period_of(ms("2024-03-10T10:00:00Z"), &Utc),
            hour.period_of(ms("2024-03-10T10:59:59.999Z"), &Utc)
        );
        assert_ne!(
            hour.period_of(ms("2024-03-10T10:59:59.999Z"), &Utc),
            hour.period_of(ms("2024-03-10T11:00:00Z"), &Utc)
        );
    }

    #[test]
    fn test_week_splits_at_new_year() {
        // 2024-12-31 and 2025-01-01 are both ISO week 1 but in different years
        let week = CalendarUnit::Week;
        assert_ne!(
            week.period_of(ms("2024-12-31T12:00:00Z"), &Utc),
            week.period_of(ms("2025-01-01T12:00:00Z"), &Utc)
        );
        assert_eq!(
            week.period_of(ms("2025-01-01T12:00:00Z"), &Utc),
            week.period_of(ms("2025-01-05T12:00:00Z"), &Utc)
        );
        // Sunday 2024-12-29 belongs to the previous week
        assert_ne!(
            week.period_of(ms("2024-12-29T12:00:00Z"), &Utc),
            week.period_of(ms("2024-12-30T12:00:00Z"), &Utc)
        );
        assert_eq!(
            week.period_of(ms("2024-12-30T12:00:00Z"), &Utc),
            week.period_of(ms("2024-12-31T23:00:00Z"), &Utc)
        );

        let year = CalendarUnit::Year;
        assert_ne!(
            year.period_of(ms("2024-12-31T23:59:59Z"), &Utc),
            year.period_of(ms("2025-01-01T00:00:00Z"), &Utc)
        );
    }

    #[test]
    fn test_period_respects_timezone() {
        use chrono::FixedOffset;

        // 23:30 UTC is already the next day at UTC+2
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let a = ms("2024-06-01T21:30:00Z");
        let b = ms("2024-06-01T23:30:00Z");

        let day = CalendarUnit::Day;
        assert_eq!(day.period_of(a, &Utc), day.period_of(b, &Utc));
        assert_ne!(day.period_of(a, &plus_two), day.period_of(b, &plus_two));
    }

    #[test]
    fn test_display() {
        assert_eq!(GroupBy::None.to_string(), "none");
        assert_eq!(GroupBy::Count(12).to_string(), "12");
        assert_eq!(GroupBy::Calendar(CalendarUnit::Minute).to_string(), "minute");
    }
}
