//! Aggregator
//!
//! Turns a newest-first reading sequence (as produced by
//! `ReadingStore::scan`) into buckets ordered oldest first.
//!
//! # Pipeline
//!
//! ```text
//! scan (DESC) → bundle newest first → reverse → buckets (ASC)
//! ```
//!
//! A bucket's timestamp is the latest timestamp among its readings, its
//! value the sum of their values and its count the number of readings.
//! Values are summed newest to oldest.

use crate::query::grouping::{CalendarUnit, GroupBy};
use crate::storage::Reading;
use chrono::{Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One output unit of a data query
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Latest timestamp among the bucket's readings (ms)
    pub timestamp: i64,
    /// Sum of the bucket's values
    pub value: f64,
    /// Number of readings in the bucket
    pub count: u64,
}

impl Bucket {
    fn open(reading: &Reading) -> Self {
        Self {
            timestamp: reading.timestamp,
            value: reading.value,
            count: 1,
        }
    }

    fn merge(&mut self, reading: &Reading) {
        self.value += reading.value;
        self.count += 1;
    }

    /// Mean of the bucket's readings
    pub fn mean(&self) -> f64 {
        self.value / self.count as f64
    }
}

/// Wall clock used to derive calendar periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarZone {
    /// The process's local timezone
    #[default]
    Local,
    Utc,
}

impl CalendarZone {
    /// Parse a zone name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Some(Self::Local),
            "utc" => Some(Self::Utc),
            _ => None,
        }
    }
}

impl std::fmt::Display for CalendarZone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Utc => write!(f, "utc"),
        }
    }
}

/// Bundle newest-first readings into oldest-first buckets
pub fn aggregate(readings: &[Reading], group_by: &GroupBy, zone: CalendarZone) -> Vec<Bucket> {
    let mut buckets = match *group_by {
        GroupBy::Count(packages) if packages < readings.len() => by_count(readings, packages),
        GroupBy::Calendar(unit) => match zone {
            CalendarZone::Local => by_calendar(readings, unit, &Local),
            CalendarZone::Utc => by_calendar(readings, unit, &Utc),
        },
        _ => readings.iter().map(Bucket::open).collect(),
    };

    buckets.reverse();
    buckets
}

/// One bucket per run of readings sharing a calendar period
fn by_calendar<Tz: TimeZone>(readings: &[Reading], unit: CalendarUnit, tz: &Tz) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut active = None;

    for reading in readings {
        let period = unit.period_of(reading.timestamp, tz);
        match buckets.last_mut() {
            // Unrepresentable timestamps never share a bucket
            Some(bucket) if period.is_some() && period == active => bucket.merge(reading),
            _ => {
                buckets.push(Bucket::open(reading));
                active = period;
            }
        }
    }

    buckets
}

/// Exactly `packages` buckets of `len / packages` readings each, the
/// oldest bucket taking the remainder
fn by_count(readings: &[Reading], packages: usize) -> Vec<Bucket> {
    let size = (readings.len() / packages) as u64;
    let mut buckets: Vec<Bucket> = Vec::with_capacity(packages);

    for reading in readings {
        let last_package = buckets.len() == packages;
        match buckets.last_mut() {
            Some(bucket) if bucket.count < size || last_package => bucket.merge(reading),
            _ => buckets.push(Bucket::open(reading)),
        }
    }

    buckets
}
