//! Channel kinds
//!
//! A channel's type tag selects a `ChannelKind`. Kinds may specialise how
//! readings are accepted and how data is shaped; the default methods run
//! the plain store/aggregator plumbing, which overrides can call through
//! `append_reading` and `load_buckets`.
//!
//! Kinds are resolved through a `ChannelKindRegistry` populated at startup.
//! Unknown tags are rejected with `ChannelError::InvalidChannelType`.

use crate::channel::error::{ChannelError, ChannelResult};
use crate::query::{aggregate, Bucket, CalendarZone, GroupBy};
use crate::storage::{NewReading, ReadingStore, TimeFilter};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Store a reading for a channel
///
/// Only finite values are stored; NaN and infinities are refused the same
/// way on every backend.
pub async fn append_reading(
    store: &dyn ReadingStore,
    channel_id: i64,
    reading: NewReading,
) -> ChannelResult<()> {
    if !reading.value.is_finite() {
        return Err(ChannelError::InvalidReading(format!(
            "channel {} only accepts finite values, got {}",
            channel_id, reading.value
        )));
    }
    store.append(&reading.for_channel(channel_id)).await?;
    Ok(())
}

/// Scan a channel and aggregate the result, oldest bucket first
pub async fn load_buckets(
    store: &dyn ReadingStore,
    channel_id: i64,
    filter: &TimeFilter,
    group_by: &GroupBy,
    zone: CalendarZone,
) -> ChannelResult<Vec<Bucket>> {
    let readings = store.scan(channel_id, filter).await?;
    Ok(aggregate(&readings, group_by, zone))
}

/// Behaviour selected by a channel's type tag
#[async_trait]
pub trait ChannelKind: Send + Sync + std::fmt::Debug {
    /// Type tag stored with the channel record
    fn tag(&self) -> &'static str;

    /// Human-readable description
    fn describe(&self) -> &'static str;

    /// Accept a reading for this channel
    async fn add_data(
        &self,
        store: &dyn ReadingStore,
        channel_id: i64,
        reading: NewReading,
    ) -> ChannelResult<()> {
        append_reading(store, channel_id, reading).await
    }

    /// Fetch this channel's data as oldest-first buckets
    async fn get_data(
        &self,
        store: &dyn ReadingStore,
        channel_id: i64,
        filter: &TimeFilter,
        group_by: &GroupBy,
        zone: CalendarZone,
    ) -> ChannelResult<Vec<Bucket>> {
        load_buckets(store, channel_id, filter, group_by, zone).await
    }
}

/// A channel of arbitrary instantaneous values (temperature, power, ...)
#[derive(Debug, Default)]
pub struct Sensor;

impl Sensor {
    pub const TAG: &'static str = "sensor";
}

#[async_trait]
impl ChannelKind for Sensor {
    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn describe(&self) -> &'static str {
        "Instantaneous measurements"
    }
}

/// A consumption counter: each reading is a non-negative pulse or energy count
#[derive(Debug, Default)]
pub struct Meter;

impl Meter {
    pub const TAG: &'static str = "meter";
}

#[async_trait]
impl ChannelKind for Meter {
    fn tag(&self) -> &'static str {
        Self::TAG
    }

    fn describe(&self) -> &'static str {
        "Consumption counter (pulses per interval)"
    }

    async fn add_data(
        &self,
        store: &dyn ReadingStore,
        channel_id: i64,
        reading: NewReading,
    ) -> ChannelResult<()> {
        if reading.value < 0.0 {
            return Err(ChannelError::InvalidReading(format!(
                "meter channel {} only accepts non-negative values, got {}",
                channel_id, reading.value
            )));
        }
        append_reading(store, channel_id, reading).await
    }
}

/// Tag → kind lookup, filled once at startup
#[derive(Debug, Clone, Default)]
pub struct ChannelKindRegistry {
    kinds: BTreeMap<String, Arc<dyn ChannelKind>>,
}

impl ChannelKindRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in meter and sensor kinds
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Meter));
        registry.register(Arc::new(Sensor));
        registry
    }

    /// Register a kind under its tag, replacing any previous one
    pub fn register(&mut self, kind: Arc<dyn ChannelKind>) {
        self.kinds.insert(kind.tag().to_string(), kind);
    }

    /// Look up the kind for a tag
    pub fn resolve(&self, tag: &str) -> ChannelResult<Arc<dyn ChannelKind>> {
        self.kinds
            .get(tag)
            .cloned()
            .ok_or_else(|| ChannelError::InvalidChannelType(tag.to_string()))
    }

    /// Registered tags in sorted order
    pub fn tags(&self) -> Vec<&str> {
        self.kinds.keys().map(String::as_str).collect()
    }
}
