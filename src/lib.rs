//! # meterdb
//!
//! Channel time-series storage and aggregation: append-only numeric readings
//! keyed by channel and millisecond timestamp, with range queries, range
//! deletion, statistics and bucketed aggregation.
//!
//! ## Modules
//!
//! - [`storage`]: Reading and channel-record stores (SQLite, in-memory)
//! - [`query`]: Grouping directives and the bucket aggregator
//! - [`channel`]: Typed channel entities and the channel catalog
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use meterdb::channel::{ChannelCatalog, ChannelKindRegistry};
//! use meterdb::query::{CalendarUnit, CalendarZone, GroupBy};
//! use meterdb::storage::{NewChannel, NewReading, SqliteStore, TimeFilter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(SqliteStore::open("./meterdb.db")?);
//!     let catalog = ChannelCatalog::with_store(
//!         store,
//!         ChannelKindRegistry::with_defaults(),
//!         CalendarZone::Local,
//!     );
//!
//!     let power = catalog.create(NewChannel::new("meter", "Power")).await?;
//!     power.add_data(NewReading::now(12.0)).await?;
//!
//!     // Consumption per day over everything stored
//!     let days = power
//!         .get_data(TimeFilter::all(), GroupBy::Calendar(CalendarUnit::Day))
//!         .await?;
//!     println!("{} days", days.len());
//!
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod logging;
pub mod query;
pub mod storage;

// Re-export top-level types for convenience
pub use channel::{Channel, ChannelCatalog, ChannelError, ChannelKind, ChannelKindRegistry, ChannelResult};

pub use query::{aggregate, Bucket, CalendarUnit, CalendarZone, DataQuery, GroupBy, QueryError};

pub use storage::{
    ChannelRecord, ChannelStore, MemoryStore, NewChannel, NewReading, Reading, ReadingStore,
    SqliteStore, StorageError, StorageResult, TimeFilter, ValueSummary,
};

pub use config::{Config, ConfigError, LoggingConfig, StorageBackend};
