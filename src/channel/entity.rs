//! Channel entity
//!
//! Binds a channel record to its kind and to the shared stores. Data
//! operations are scoped to the channel's id; aggregation and input checks
//! go through the channel's kind.

use crate::channel::error::ChannelResult;
use crate::channel::kind::ChannelKind;
use crate::query::{Bucket, CalendarZone, DataQuery, GroupBy};
use crate::storage::{ChannelRecord, ChannelStore, NewReading, ReadingStore, TimeFilter, ValueSummary};
use std::sync::Arc;

/// One logical time series (a meter, a sensor, ...)
pub struct Channel {
    record: ChannelRecord,
    kind: Arc<dyn ChannelKind>,
    readings: Arc<dyn ReadingStore>,
    channels: Arc<dyn ChannelStore>,
    zone: CalendarZone,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("record", &self.record)
            .field("kind", &self.kind.tag())
            .field("zone", &self.zone)
            .finish()
    }
}

impl Channel {
    pub(crate) fn new(
        record: ChannelRecord,
        kind: Arc<dyn ChannelKind>,
        readings: Arc<dyn ReadingStore>,
        channels: Arc<dyn ChannelStore>,
        zone: CalendarZone,
    ) -> Self {
        Self {
            record,
            kind,
            readings,
            channels,
            zone,
        }
    }

    pub fn id(&self) -> i64 {
        self.record.id
    }

    pub fn title(&self) -> &str {
        &self.record.title
    }

    pub fn record(&self) -> &ChannelRecord {
        &self.record
    }

    pub fn kind(&self) -> &dyn ChannelKind {
        self.kind.as_ref()
    }

    /// Append a reading. Out-of-order timestamps are accepted.
    pub async fn add_data(&self, reading: NewReading) -> ChannelResult<()> {
        self.kind
            .add_data(self.readings.as_ref(), self.id(), reading)
            .await
    }

    /// Readings in `(from, to)` bundled per `group_by`, oldest first
    pub async fn get_data(&self, filter: TimeFilter, group_by: GroupBy) -> ChannelResult<Vec<Bucket>> {
        self.kind
            .get_data(self.readings.as_ref(), self.id(), &filter, &group_by, self.zone)
            .await
    }

    /// `get_data` driven by caller-supplied parameters
    pub async fn query(&self, params: &DataQuery) -> ChannelResult<Vec<Bucket>> {
        let group_by = params.group_by()?;
        self.get_data(params.filter(), group_by).await
    }

    /// Delete readings in `(from, to)`; `TimeFilter::all()` clears the channel
    pub async fn reset(&self, filter: TimeFilter) -> ChannelResult<u64> {
        let removed = self.readings.delete_range(self.id(), &filter).await?;
        tracing::info!(channel = self.id(), removed, "Reset channel data");
        Ok(removed)
    }

    /// Count/min/max/sum of readings in `(from, to)`
    pub async fn summary(&self, filter: TimeFilter) -> ChannelResult<ValueSummary> {
        Ok(self.readings.summarize(self.id(), &filter).await?)
    }

    /// Smallest value in range, `None` when the range is empty
    pub async fn min(&self, filter: TimeFilter) -> ChannelResult<Option<f64>> {
        Ok(self.summary(filter).await?.min)
    }

    /// Largest value in range, `None` when the range is empty
    pub async fn max(&self, filter: TimeFilter) -> ChannelResult<Option<f64>> {
        Ok(self.summary(filter).await?.max)
    }

    /// Mean over raw readings in range, `None` when the range is empty
    pub async fn average(&self, filter: TimeFilter) -> ChannelResult<Option<f64>> {
        Ok(self.summary(filter).await?.average())
    }

    /// Number of readings in range
    pub async fn count(&self, filter: TimeFilter) -> ChannelResult<u64> {
        Ok(self.summary(filter).await?.count)
    }

    /// Remove all readings, then the channel record itself
    ///
    /// The stores have no cascading delete, so readings go first. Only
    /// reachable through `ChannelCatalog::delete`, which also evicts the
    /// cached instance.
    pub(crate) async fn delete(&self) -> ChannelResult<()> {
        self.reset(TimeFilter::all()).await?;
        self.channels.remove_channel(self.id()).await?;
        tracing::info!(channel = self.id(), "Deleted channel '{}'", self.record.title);
        Ok(())
    }
}
