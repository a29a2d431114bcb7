//! meterdb Channels
//!
//! Typed channel entities on top of the storage and query layers:
//!
//! - **kind**: Channel kinds (meter, sensor) and the tag registry
//! - **entity**: `Channel`, the per-series data operations
//! - **catalog**: `ChannelCatalog`, one shared instance per channel id
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust
//! use meterdb::channel::{ChannelCatalog, ChannelKindRegistry};
//! use meterdb::query::{CalendarZone, GroupBy};
//! use meterdb::storage::{MemoryStore, NewChannel, NewReading, TimeFilter};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = ChannelCatalog::with_store(
//!         Arc::new(MemoryStore::new()),
//!         ChannelKindRegistry::with_defaults(),
//!         CalendarZone::Utc,
//!     );
//!
//!     let channel = catalog.create(NewChannel::new("meter", "Power")).await?;
//!     for i in 1..=5 {
//!         channel.add_data(NewReading::new(i * 1000, i as f64)).await?;
//!     }
//!
//!     let buckets = channel.get_data(TimeFilter::all(), GroupBy::Count(2)).await?;
//!     assert_eq!(buckets[0].count, 3);
//!     Ok(())
//! }
//! ```

mod catalog;
mod entity;
mod error;
mod kind;

pub use catalog::ChannelCatalog;
pub use entity::Channel;
pub use error::{ChannelError, ChannelResult};
pub use kind::{append_reading, load_buckets, ChannelKind, ChannelKindRegistry, Meter, Sensor};
