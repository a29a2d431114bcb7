//! Channel catalog
//!
//! Resolves channel ids to `Channel` instances. At most one instance per id
//! lives in the catalog at a time, so callers resolving the same id share
//! the same object.

use crate::channel::entity::Channel;
use crate::channel::error::{ChannelError, ChannelResult};
use crate::channel::kind::ChannelKindRegistry;
use crate::query::CalendarZone;
use crate::storage::{ChannelRecord, ChannelStore, NewChannel, ReadingStore};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Explicit registry of live channels
pub struct ChannelCatalog {
    readings: Arc<dyn ReadingStore>,
    channels: Arc<dyn ChannelStore>,
    kinds: ChannelKindRegistry,
    zone: CalendarZone,
    cache: RwLock<HashMap<i64, Arc<Channel>>>,
}

impl ChannelCatalog {
    /// Create a catalog over a store serving both readings and channel records
    pub fn with_store<S>(store: Arc<S>, kinds: ChannelKindRegistry, zone: CalendarZone) -> Self
    where
        S: ReadingStore + ChannelStore + 'static,
    {
        Self::new(store.clone(), store, kinds, zone)
    }

    pub fn new(
        readings: Arc<dyn ReadingStore>,
        channels: Arc<dyn ChannelStore>,
        kinds: ChannelKindRegistry,
        zone: CalendarZone,
    ) -> Self {
        Self {
            readings,
            channels,
            kinds,
            zone,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn kinds(&self) -> &ChannelKindRegistry {
        &self.kinds
    }

    pub fn zone(&self) -> CalendarZone {
        self.zone
    }

    /// Persist a new channel and return its instance
    ///
    /// The type tag is checked before anything is written.
    pub async fn create(&self, channel: NewChannel) -> ChannelResult<Arc<Channel>> {
        self.kinds.resolve(&channel.kind)?;

        let record = self.channels.insert_channel(&channel).await?;
        info!(
            channel = record.id,
            kind = %record.kind,
            "Created channel '{}'",
            record.title
        );
        self.admit(record).await
    }

    /// The instance for `id`, loading it on first use
    pub async fn resolve(&self, id: i64) -> ChannelResult<Arc<Channel>> {
        if let Some(channel) = self.cache.read().await.get(&id) {
            return Ok(Arc::clone(channel));
        }

        let record = self
            .channels
            .load_channel(id)
            .await?
            .ok_or(ChannelError::ChannelNotFound(id))?;
        self.admit(record).await
    }

    /// All channels of one type, keyed by id
    pub async fn find_by_type(&self, tag: &str) -> ChannelResult<BTreeMap<i64, Arc<Channel>>> {
        self.kinds.resolve(tag)?;
        let records = self.channels.list_channels(Some(tag)).await?;
        self.admit_all(records).await
    }

    /// Every channel, keyed by id
    pub async fn all(&self) -> ChannelResult<BTreeMap<i64, Arc<Channel>>> {
        let records = self.channels.list_channels(None).await?;
        self.admit_all(records).await
    }

    /// Delete a channel with all its readings and drop it from the catalog
    pub async fn delete(&self, id: i64) -> ChannelResult<()> {
        let channel = self.resolve(id).await?;
        channel.delete().await?;
        self.cache.write().await.remove(&id);
        Ok(())
    }

    /// Forget every cached instance. Stored data is untouched.
    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Number of cached instances
    pub async fn cached(&self) -> usize {
        self.cache.read().await.len()
    }

    async fn admit_all(&self, records: Vec<ChannelRecord>) -> ChannelResult<BTreeMap<i64, Arc<Channel>>> {
        let mut found = BTreeMap::new();
        for record in records {
            let id = record.id;
            found.insert(id, self.admit(record).await?);
        }
        Ok(found)
    }

    /// Wrap a record in an instance unless one is already cached
    async fn admit(&self, record: ChannelRecord) -> ChannelResult<Arc<Channel>> {
        let mut cache = self.cache.write().await;

        // Another task may have loaded it while we were reading the store
        if let Some(existing) = cache.get(&record.id) {
            return Ok(Arc::clone(existing));
        }

        let kind = self.kinds.resolve(&record.kind)?;
        let id = record.id;
        let channel = Arc::new(Channel::new(
            record,
            kind,
            Arc::clone(&self.readings),
            Arc::clone(&self.channels),
            self.zone,
        ));
        cache.insert(id, Arc::clone(&channel));
        debug!(channel = id, "Cached channel instance");

        Ok(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::GroupBy;
    use crate::storage::{MemoryStore, NewReading, SqliteStore, TimeFilter};
    use tempfile::tempdir;

    fn create_test_catalog() -> (ChannelCatalog, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let catalog = ChannelCatalog::with_store(
            store.clone(),
            ChannelKindRegistry::with_defaults(),
            CalendarZone::Utc,
        );
        (catalog, store)
    }

    #[tokio::test]
    async fn test_create_and_resolve_share_instance() {
        let (catalog, _) = create_test_catalog();

        let created = catalog
            .create(NewChannel::new("sensor", "Outdoor").description("north wall"))
            .await
            .unwrap();
        let resolved = catalog.resolve(created.id()).await.unwrap();

        assert!(Arc::ptr_eq(&created, &resolved));
        assert_eq!(resolved.record().description.as_deref(), Some("north wall"));
        assert_eq!(catalog.cached().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_resolve_converges() {
        let (catalog, store) = create_test_catalog();
        let id = store
            .insert_channel(&NewChannel::new("meter", "Power"))
            .await
            .unwrap()
            .id;
        let catalog = Arc::new(catalog);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let catalog = Arc::clone(&catalog);
            handles.push(tokio::spawn(async move {
                catalog.resolve(id).await.unwrap()
            }));
        }

        let mut instances = Vec::new();
        for handle in handles {
            instances.push(handle.await.unwrap());
        }

        assert!(instances.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(catalog.cached().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_type_is_rejected_before_insert() {
        let (catalog, store) = create_test_catalog();

        let err = catalog
            .create(NewChannel::new("Toaster", "Kitchen"))
            .await
            .unwrap_err();

        assert!(matches!(err, ChannelError::InvalidChannelType(_)));
        assert!(store.list_channels(None).await.unwrap().is_empty());
        assert!(matches!(
            catalog.find_by_type("Toaster").await,
            Err(ChannelError::InvalidChannelType(_))
        ));
    }

    #[tokio::test]
    async fn test_stored_record_with_unknown_type() {
        let (catalog, store) = create_test_catalog();
        let record = store
            .insert_channel(&NewChannel::new("retired", "Old"))
            .await
            .unwrap();

        assert!(matches!(
            catalog.resolve(record.id).await,
            Err(ChannelError::InvalidChannelType(_))
        ));
        assert_eq!(catalog.cached().await, 0);
    }

    #[tokio::test]
    async fn test_resolve_missing() {
        let (catalog, _) = create_test_catalog();

        assert!(matches!(
            catalog.resolve(99).await,
            Err(ChannelError::ChannelNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_find_by_type_and_all() {
        let (catalog, _) = create_test_catalog();
        let meter = catalog.create(NewChannel::new("meter", "Power")).await.unwrap();
        let sensor = catalog.create(NewChannel::new("sensor", "Temp")).await.unwrap();
        catalog.clear().await;

        let meters = catalog.find_by_type("meter").await.unwrap();
        assert_eq!(meters.keys().copied().collect::<Vec<_>>(), vec![meter.id()]);

        let all = catalog.all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[&sensor.id()].kind().tag(), "sensor");

        // Lookups after a clear hand out fresh, shared instances
        let again = catalog.resolve(meter.id()).await.unwrap();
        assert!(Arc::ptr_eq(&again, &meters[&meter.id()]));
        assert!(!Arc::ptr_eq(&again, &meter));
    }

    #[tokio::test]
    async fn test_delete_removes_everything() {
        let (catalog, store) = create_test_catalog();
        let keep = catalog.create(NewChannel::new("sensor", "Keep")).await.unwrap();
        let gone = catalog.create(NewChannel::new("sensor", "Gone")).await.unwrap();
        for i in 1..=4 {
            keep.add_data(NewReading::new(i * 1000, 1.0)).await.unwrap();
            gone.add_data(NewReading::new(i * 1000, 2.0)).await.unwrap();
        }

        catalog.delete(gone.id()).await.unwrap();

        assert!(matches!(
            catalog.resolve(gone.id()).await,
            Err(ChannelError::ChannelNotFound(_))
        ));
        assert_eq!(store.len().await, 4);
        assert_eq!(keep.count(TimeFilter::all()).await.unwrap(), 4);
        assert_eq!(catalog.cached().await, 1);
    }

    #[tokio::test]
    async fn test_sqlite_backed_catalog_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meterdb.db");

        let id = {
            let store = Arc::new(SqliteStore::open(&path).unwrap());
            let catalog =
                ChannelCatalog::with_store(store, ChannelKindRegistry::with_defaults(), CalendarZone::Utc);
            let channel = catalog.create(NewChannel::new("meter", "Power")).await.unwrap();
            for i in 1..=5 {
                channel.add_data(NewReading::new(i * 1000, i as f64)).await.unwrap();
            }
            channel.id()
        };

        let store = Arc::new(SqliteStore::open(&path).unwrap());
        let catalog =
            ChannelCatalog::with_store(store, ChannelKindRegistry::with_defaults(), CalendarZone::Utc);
        let channel = catalog.resolve(id).await.unwrap();

        let buckets = channel
            .get_data(TimeFilter::all(), GroupBy::Count(2))
            .await
            .unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].timestamp, 3000);
        assert_eq!(buckets[0].value, 6.0);
        assert_eq!(channel.record().title, "Power");
    }
}
