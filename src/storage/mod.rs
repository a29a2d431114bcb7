//! meterdb Storage Layer
//!
//! This module provides durable, ordered storage of channel readings:
//!
//! - **types**: Core data structures (Reading, TimeFilter, ChannelRecord)
//! - **sqlite**: SQLite-backed store (the persistent backend)
//! - **memory**: Ordered in-memory store (tests and ephemeral use)
//! - **error**: Error types
//!
//! # Store boundary
//!
//! ```text
//! append(reading)                      one row, atomic
//! scan(channel, filter)       → Vec    newest first
//! delete_range(channel, filter) → n    atomic
//! summarize(channel, filter)  → ValueSummary
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use meterdb::storage::{NewChannel, NewReading, ReadingStore, ChannelStore, SqliteStore, TimeFilter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::open("./data.db")?;
//!
//!     let channel = store.insert_channel(&NewChannel::new("sensor", "Outdoor")).await?;
//!     store.append(&NewReading::now(21.5).for_channel(channel.id)).await?;
//!
//!     let readings = store.scan(channel.id, &TimeFilter::all()).await?;
//!     println!("{} readings", readings.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod memory;
pub mod sqlite;
pub mod types;

use async_trait::async_trait;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{ChannelRecord, NewChannel, NewReading, Reading, TimeFilter, ValueSummary};

/// Append-only storage of readings scoped by channel
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Insert one reading. No uniqueness or ordering check.
    async fn append(&self, reading: &Reading) -> StorageResult<()>;

    /// Readings of a channel passing `filter`, newest first.
    ///
    /// Readings sharing a timestamp come back most recently appended first.
    async fn scan(&self, channel_id: i64, filter: &TimeFilter) -> StorageResult<Vec<Reading>>;

    /// Remove readings of a channel passing `filter`, returning how many went.
    async fn delete_range(&self, channel_id: i64, filter: &TimeFilter) -> StorageResult<u64>;

    /// Count, min, max and sum of the values passing `filter`.
    async fn summarize(&self, channel_id: i64, filter: &TimeFilter) -> StorageResult<ValueSummary>;
}

/// Persistence of channel records
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Insert a channel, assigning its id
    async fn insert_channel(&self, channel: &NewChannel) -> StorageResult<ChannelRecord>;

    /// Load one channel record
    async fn load_channel(&self, id: i64) -> StorageResult<Option<ChannelRecord>>;

    /// All channel records, optionally restricted to one type tag, ascending by id
    async fn list_channels(&self, kind: Option<&str>) -> StorageResult<Vec<ChannelRecord>>;

    /// Remove a channel record. Readings are not touched.
    async fn remove_channel(&self, id: i64) -> StorageResult<bool>;
}
