//! meterdb Query Engine
//!
//! Bucketed aggregation over readings fetched from a store:
//!
//! - **grouping**: Grouping directives (none, calendar unit, target count)
//! - **aggregator**: Bundles newest-first readings into oldest-first buckets
//! - **params**: Caller-supplied data query parameters
//!
//! # Grouping directives
//!
//! ```text
//! none                      one bucket per reading
//! year|month|week|day|hour|minute
//!                           one bucket per calendar period present
//! N (positive integer)      N equal-size buckets, oldest takes the remainder;
//!                           raw when N >= number of readings
//! ```
//!
//! # Example
//!
//! ```rust
//! use meterdb::query::{aggregate, CalendarZone, GroupBy};
//! use meterdb::storage::Reading;
//!
//! let readings: Vec<Reading> = (1..=5)
//!     .rev()
//!     .map(|i| Reading::new(1, i * 1000, i as f64))
//!     .collect();
//!
//! let buckets = aggregate(&readings, &GroupBy::parse("2"), CalendarZone::Utc);
//! assert_eq!(buckets.len(), 2);
//! assert_eq!(buckets[0].count, 3);
//! ```

mod aggregator;
mod error;
mod grouping;
mod params;

pub use aggregator::{aggregate, Bucket, CalendarZone};
pub use error::{QueryError, QueryResult};
pub use grouping::{CalendarUnit, GroupBy, PeriodKey};
pub use params::DataQuery;
