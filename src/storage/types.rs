//! Core data types for the reading store
//!
//! This module defines the fundamental types used throughout the storage layer:
//! - `Reading`: A single timestamped value owned by a channel
//! - `NewReading`: A reading as submitted to a channel, before it is scoped
//! - `TimeFilter`: The optional exclusive bounds shared by scan, delete and statistics
//! - `ValueSummary`: Count/min/max/sum over a filtered range
//! - `ChannelRecord` and `NewChannel`: Persisted channel metadata

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A single stored reading
///
/// Immutable once written. The store does not enforce uniqueness of
/// `(channel_id, timestamp)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    /// Owning channel
    pub channel_id: i64,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// The measured value
    pub value: f64,
}

impl Reading {
    pub fn new(channel_id: i64, timestamp: i64, value: f64) -> Self {
        Self {
            channel_id,
            timestamp,
            value,
        }
    }
}

/// A reading submitted to a channel (the channel supplies its id)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NewReading {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// The measured value
    pub value: f64,
}

impl NewReading {
    /// Create a reading with a specific timestamp
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Create a reading stamped with the current time
    pub fn now(value: f64) -> Self {
        Self::new(Utc::now().timestamp_millis(), value)
    }

    /// Scope this reading to a channel
    pub fn for_channel(self, channel_id: i64) -> Reading {
        Reading::new(channel_id, self.timestamp, self.value)
    }
}

/// Optional time bounds for scans, deletes and statistics
///
/// Both bounds are exclusive. `from` only applies when it is positive;
/// `to` only applies when it does not lie in the future, so a `to` beyond
/// "now" means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFilter {
    /// Exclusive lower bound in milliseconds
    #[serde(default)]
    pub from: Option<i64>,
    /// Exclusive upper bound in milliseconds
    #[serde(default)]
    pub to: Option<i64>,
}

impl TimeFilter {
    /// A filter matching every reading
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter from optional bounds
    pub fn new(from: Option<i64>, to: Option<i64>) -> Self {
        Self { from, to }
    }

    /// Builder method: set the exclusive lower bound
    pub fn after(mut self, from: i64) -> Self {
        self.from = Some(from);
        self
    }

    /// Builder method: set the exclusive upper bound
    pub fn before(mut self, to: i64) -> Self {
        self.to = Some(to);
        self
    }

    /// Bounds that actually apply at `now_ms`
    pub fn bounds_at(&self, now_ms: i64) -> (Option<i64>, Option<i64>) {
        let lower = self.from.filter(|from| *from > 0);
        let upper = self.to.filter(|to| *to <= now_ms);
        (lower, upper)
    }

    /// Bounds that apply right now
    pub fn bounds(&self) -> (Option<i64>, Option<i64>) {
        self.bounds_at(Utc::now().timestamp_millis())
    }

    /// Check whether a timestamp passes the filter at `now_ms`
    pub fn contains_at(&self, timestamp: i64, now_ms: i64) -> bool {
        let (lower, upper) = self.bounds_at(now_ms);
        lower.map_or(true, |from| timestamp > from) && upper.map_or(true, |to| timestamp < to)
    }
}

/// Reduction of the values in a filtered range
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueSummary {
    /// Number of raw readings
    pub count: u64,
    /// Smallest value, `None` for an empty range
    pub min: Option<f64>,
    /// Largest value, `None` for an empty range
    pub max: Option<f64>,
    /// Sum of all values (0.0 for an empty range)
    pub sum: f64,
}

impl ValueSummary {
    /// Fold one value into the summary
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Arithmetic mean weighted by raw reading count
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// A persisted channel definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecord {
    /// Unique identifier assigned by the store
    pub id: i64,
    /// Type tag selecting the channel kind (e.g. "meter", "sensor")
    pub kind: String,
    /// Human-readable title
    pub title: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Creation time in milliseconds
    pub created_at: i64,
}

/// A channel definition before the store assigns an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChannel {
    /// Type tag selecting the channel kind
    pub kind: String,
    /// Human-readable title
    pub title: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
}

impl NewChannel {
    pub fn new(kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            description: None,
        }
    }

    /// Builder: set description
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_reading_scoping() {
        let reading = NewReading::new(1000, 7.5).for_channel(3);

        assert_eq!(reading.channel_id, 3);
        assert_eq!(reading.timestamp, 1000);
        assert_eq!(reading.value, 7.5);
    }

    #[test]
    fn test_time_filter_exclusive_bounds() {
        let now = 10_000;
        let filter = TimeFilter::all().after(2000).before(4000);

        assert!(!filter.contains_at(2000, now));
        assert!(filter.contains_at(3000, now));
        assert!(!filter.contains_at(4000, now));
    }

    #[test]
    fn test_time_filter_ignores_non_positive_from() {
        let filter = TimeFilter::all().after(0);
        assert_eq!(filter.bounds_at(10_000), (None, None));

        let filter = TimeFilter::all().after(-5);
        assert!(filter.contains_at(-100, 10_000));
    }

    #[test]
    fn test_time_filter_future_to_is_unbounded() {
        let now = 10_000;
        let filter = TimeFilter::all().before(20_000);
        assert_eq!(filter.bounds_at(now), (None, None));
        assert!(filter.contains_at(15_000, now));

        // A bound exactly at "now" still applies
        let filter = TimeFilter::all().before(now);
        assert_eq!(filter.bounds_at(now), (None, Some(now)));
    }

    #[test]
    fn test_value_summary() {
        let mut summary = ValueSummary::default();
        assert!(summary.is_empty());
        assert_eq!(summary.average(), None);
        assert_eq!(summary.min, None);

        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            summary.push(value);
        }

        assert_eq!(summary.count, 5);
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.max, Some(5.0));
        assert_eq!(summary.sum, 15.0);
        assert_eq!(summary.average(), Some(3.0));
    }

    #[test]
    fn test_channel_record_serialization() {
        let record = ChannelRecord {
            id: 7,
            kind: "meter".to_string(),
            title: "Kitchen".to_string(),
            description: None,
            created_at: 1000,
        };
        let json = serde_json::to_string(&record).unwrap();
        let restored: ChannelRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(record, restored);
    }
}
