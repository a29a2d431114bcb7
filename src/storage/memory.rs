//! In-memory reading store
//!
//! Readings live in one ordered map keyed by `(channel, timestamp, seq)`,
//! where `seq` is a store-wide append counter. A reverse range over one
//! channel yields newest first, with duplicates of a timestamp ordered by
//! most recent append, matching the SQLite backend.

use crate::storage::error::StorageResult;
use crate::storage::types::{ChannelRecord, NewChannel, Reading, TimeFilter, ValueSummary};
use crate::storage::{ChannelStore, ReadingStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

type ReadingKey = (i64, i64, u64);

#[derive(Debug, Default)]
struct MemoryState {
    readings: BTreeMap<ReadingKey, f64>,
    channels: BTreeMap<i64, ChannelRecord>,
    next_seq: u64,
    next_channel_id: i64,
}

impl MemoryState {
    /// Keys of one channel passing `filter`, newest first
    fn matching_keys(&self, channel_id: i64, filter: &TimeFilter) -> Vec<ReadingKey> {
        let (from, to) = filter.bounds();
        let lower = from.map_or(i64::MIN, |from| from.saturating_add(1));
        let upper = to.map_or(i64::MAX, |to| to.saturating_sub(1));
        if lower > upper {
            return Vec::new();
        }

        self.readings
            .range((channel_id, lower, 0)..=(channel_id, upper, u64::MAX))
            .rev()
            .map(|(key, _)| *key)
            .collect()
    }
}

/// Ordered in-memory store, lost on drop
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of readings across all channels
    pub async fn len(&self) -> usize {
        self.state.read().await.readings.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn append(&self, reading: &Reading) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let seq = state.next_seq;
        state.next_seq += 1;
        state
            .readings
            .insert((reading.channel_id, reading.timestamp, seq), reading.value);
        Ok(())
    }

    async fn scan(&self, channel_id: i64, filter: &TimeFilter) -> StorageResult<Vec<Reading>> {
        let state = self.state.read().await;
        let readings = state
            .matching_keys(channel_id, filter)
            .into_iter()
            .map(|key| Reading::new(key.0, key.1, state.readings[&key]))
            .collect();
        Ok(readings)
    }

    async fn delete_range(&self, channel_id: i64, filter: &TimeFilter) -> StorageResult<u64> {
        let mut state = self.state.write().await;
        let keys = state.matching_keys(channel_id, filter);
        for key in &keys {
            state.readings.remove(key);
        }

        tracing::debug!(channel_id, removed = keys.len(), "Deleted readings");
        Ok(keys.len() as u64)
    }

    async fn summarize(&self, channel_id: i64, filter: &TimeFilter) -> StorageResult<ValueSummary> {
        let state = self.state.read().await;
        let mut summary = ValueSummary::default();
        for key in state.matching_keys(channel_id, filter) {
            summary.push(state.readings[&key]);
        }
        Ok(summary)
    }
}

#[async_trait]
impl ChannelStore for MemoryStore {
    async fn insert_channel(&self, channel: &NewChannel) -> StorageResult<ChannelRecord> {
        let mut state = self.state.write().await;
        state.next_channel_id += 1;

        let record = ChannelRecord {
            id: state.next_channel_id,
            kind: channel.kind.clone(),
            title: channel.title.clone(),
            description: channel.description.clone(),
            created_at: Utc::now().timestamp_millis(),
        };
        state.channels.insert(record.id, record.clone());

        tracing::debug!(id = record.id, kind = %record.kind, "Inserted channel record");
        Ok(record)
    }

    async fn load_channel(&self, id: i64) -> StorageResult<Option<ChannelRecord>> {
        Ok(self.state.read().await.channels.get(&id).cloned())
    }

    async fn list_channels(&self, kind: Option<&str>) -> StorageResult<Vec<ChannelRecord>> {
        let state = self.state.read().await;
        Ok(state
            .channels
            .values()
            .filter(|record| kind.map_or(true, |kind| record.kind == kind))
            .cloned()
            .collect())
    }

    async fn remove_channel(&self, id: i64) -> StorageResult<bool> {
        Ok(self.state.write().await.channels.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store_with(values: &[(i64, f64)]) -> MemoryStore {
        let store = MemoryStore::new();
        for &(timestamp, value) in values {
            store.append(&Reading::new(1, timestamp, value)).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_scan_order_and_ties() {
        let store = store_with(&[(2000, 2.0), (1000, 1.0), (2000, 2.5), (3000, 3.0)]).await;

        let readings = store.scan(1, &TimeFilter::all()).await.unwrap();
        let pairs: Vec<(i64, f64)> = readings.iter().map(|r| (r.timestamp, r.value)).collect();

        assert_eq!(
            pairs,
            vec![(3000, 3.0), (2000, 2.5), (2000, 2.0), (1000, 1.0)]
        );
    }

    #[tokio::test]
    async fn test_negative_timestamps_without_bounds() {
        let store = store_with(&[(-5000, 1.0), (0, 2.0), (5000, 3.0)]).await;

        let readings = store.scan(1, &TimeFilter::all()).await.unwrap();
        assert_eq!(readings.len(), 3);
        assert_eq!(readings[2].timestamp, -5000);
    }

    #[tokio::test]
    async fn test_empty_window() {
        let store = store_with(&[(1000, 1.0), (2000, 2.0)]).await;

        // (1000, 1001) holds no integer timestamp
        let filter = TimeFilter::all().after(1000).before(1001);
        assert!(store.scan(1, &filter).await.unwrap().is_empty());
        assert_eq!(store.delete_range(1, &filter).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_range_scoped() {
        let store = store_with(&[(1000, 1.0), (2000, 2.0), (3000, 3.0)]).await;
        store.append(&Reading::new(2, 2000, 9.0)).await.unwrap();

        let removed = store
            .delete_range(1, &TimeFilter::all().after(1000))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len().await, 2);
        assert_eq!(store.scan(2, &TimeFilter::all()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_summarize() {
        let store = store_with(&[(1000, 4.0), (2000, -1.0), (3000, 0.5)]).await;

        let summary = store.summarize(1, &TimeFilter::all()).await.unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, Some(-1.0));
        assert_eq!(summary.max, Some(4.0));
        assert_eq!(summary.sum, 3.5);
    }

    #[tokio::test]
    async fn test_channel_records() {
        let store = MemoryStore::new();
        let a = store
            .insert_channel(&NewChannel::new("meter", "A"))
            .await
            .unwrap();
        let b = store
            .insert_channel(&NewChannel::new("sensor", "B"))
            .await
            .unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.list_channels(Some("sensor")).await.unwrap(), vec![b]);
        assert!(store.remove_channel(a.id).await.unwrap());
        assert!(store.load_channel(a.id).await.unwrap().is_none());
    }
}
