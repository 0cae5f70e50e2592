#![allow(dead_code)]

use std::collections::HashMap;
use std::future::pending;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use agora::application::analytics::AnalyticsService;
use agora::application::events::EventService;
use agora::application::locations::LocationService;
use agora::application::mutation::MutationPipeline;
use agora::application::repos::{
    AnalyticsRepo, CreateEventParams, CreateLocationParams, EventsRepo, EventsWriteRepo,
    LocationsRepo, LocationsWriteRepo, RepoError, StoreHealth, UpdateEventParams,
    UpdateLocationParams,
};
use agora::cache::{
    CacheAside, CacheConfig, CacheError, CacheStore, InvalidationCoordinator, MemoryCacheStore,
};
use agora::domain::entities::{AnalyticsSummary, EventRecord, LocationEventCount, LocationRecord};
use agora::realtime::{Change, ChangePublisher, PublishError};
use tokio::sync::Notify;

pub const STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Ordered record of side effects across fakes, used to assert
/// write, invalidate, publish order.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().expect("journal lock").push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("journal lock").clone()
    }

    pub fn clear(&self) {
        self.0.lock().expect("journal lock").clear();
    }
}

#[derive(Default)]
struct Tables {
    events: HashMap<Uuid, EventRecord>,
    locations: HashMap<Uuid, LocationRecord>,
}

/// Pauses one event listing after it has taken its snapshot.
#[derive(Clone, Default)]
pub struct ListGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Durable store held in memory. Implements every repository trait.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    journal: Journal,
    event_list_calls: AtomicUsize,
    summary_calls: AtomicUsize,
    fail_writes: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
    commit_stall: Mutex<Option<Duration>>,
    list_gate: Mutex<Option<ListGate>>,
    healthy: AtomicBool,
}

impl InMemoryStore {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            journal,
            healthy: AtomicBool::new(true),
            ..Default::default()
        })
    }

    pub fn event_list_calls(&self) -> usize {
        self.event_list_calls.load(Ordering::SeqCst)
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn delay_writes(&self, delay: Duration) {
        *self.write_delay.lock().expect("delay lock") = Some(delay);
    }

    /// Commit creates first, then hang for `stall` before returning.
    pub fn stall_after_commit(&self, stall: Duration) {
        *self.commit_stall.lock().expect("stall lock") = Some(stall);
    }

    pub fn gate_next_event_list(&self) -> ListGate {
        let gate = ListGate::default();
        *self.list_gate.lock().expect("gate lock") = Some(gate.clone());
        gate
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn stored_event(&self, id: Uuid) -> Option<EventRecord> {
        self.tables.lock().expect("tables").events.get(&id).cloned()
    }

    async fn begin_write(&self, op: &str) -> Result<(), RepoError> {
        let delay = *self.write_delay.lock().expect("delay lock");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            self.journal.record(format!("write-failed:{op}"));
            return Err(RepoError::from_persistence("disk full"));
        }
        self.journal.record(format!("write:{op}"));
        Ok(())
    }

    async fn after_commit(&self) {
        let stall = *self.commit_stall.lock().expect("stall lock");
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
    }

    fn location_name(tables: &Tables, id: Option<Uuid>) -> Option<String> {
        id.and_then(|id| tables.locations.get(&id).map(|l| l.name.clone()))
    }
}

#[async_trait]
impl EventsRepo for InMemoryStore {
    async fn list_events(&self) -> Result<Vec<EventRecord>, RepoError> {
        self.event_list_calls.fetch_add(1, Ordering::SeqCst);
        let events = {
            let tables = self.tables.lock().expect("tables");
            let mut events: Vec<EventRecord> = tables
                .events
                .values()
                .cloned()
                .map(|mut event| {
                    event.location_name = Self::location_name(&tables, event.location_id);
                    event
                })
                .collect();
            events.sort_by(|a, b| (a.date, &a.title, a.id).cmp(&(b.date, &b.title, b.id)));
            events
        };
        let gate = self.list_gate.lock().expect("gate lock").take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Ok(events)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRecord>, RepoError> {
        let tables = self.tables.lock().expect("tables");
        Ok(tables.events.get(&id).cloned().map(|mut event| {
            event.location_name = Self::location_name(&tables, event.location_id);
            event
        }))
    }
}

#[async_trait]
impl EventsWriteRepo for InMemoryStore {
    async fn create_event(&self, params: CreateEventParams) -> Result<EventRecord, RepoError> {
        self.begin_write("events").await?;
        let now = OffsetDateTime::now_utc();
        let record = {
            let mut tables = self.tables.lock().expect("tables");
            let record = EventRecord {
                id: Uuid::new_v4(),
                title: params.title,
                date: params.date,
                location_id: params.location_id,
                location_name: Self::location_name(&tables, params.location_id),
                description: params.description,
                created_at: now,
                updated_at: now,
            };
            tables.events.insert(record.id, record.clone());
            record
        };
        self.after_commit().await;
        Ok(record)
    }

    async fn update_event(&self, params: UpdateEventParams) -> Result<EventRecord, RepoError> {
        self.begin_write("events").await?;
        let mut tables = self.tables.lock().expect("tables");
        let location_name = Self::location_name(&tables, params.location_id);
        let record = tables
            .events
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        record.title = params.title;
        record.date = params.date;
        record.location_id = params.location_id;
        record.location_name = location_name;
        record.description = params.description;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), RepoError> {
        self.begin_write("events").await?;
        let mut tables = self.tables.lock().expect("tables");
        tables
            .events
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl LocationsRepo for InMemoryStore {
    async fn list_locations(&self) -> Result<Vec<LocationRecord>, RepoError> {
        let tables = self.tables.lock().expect("tables");
        let mut locations: Vec<LocationRecord> = tables.locations.values().cloned().collect();
        locations.sort_by_key(|l| l.name.to_lowercase());
        Ok(locations)
    }

    async fn find_location(&self, id: Uuid) -> Result<Option<LocationRecord>, RepoError> {
        Ok(self.tables.lock().expect("tables").locations.get(&id).cloned())
    }
}

#[async_trait]
impl LocationsWriteRepo for InMemoryStore {
    async fn create_location(
        &self,
        params: CreateLocationParams,
    ) -> Result<LocationRecord, RepoError> {
        self.begin_write("locations").await?;
        let now = OffsetDateTime::now_utc();
        let record = LocationRecord {
            id: Uuid::new_v4(),
            name: params.name,
            address: params.address,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .lock()
            .expect("tables")
            .locations
            .insert(record.id, record.clone());
        self.after_commit().await;
        Ok(record)
    }

    async fn update_location(
        &self,
        params: UpdateLocationParams,
    ) -> Result<LocationRecord, RepoError> {
        self.begin_write("locations").await?;
        let mut tables = self.tables.lock().expect("tables");
        let record = tables
            .locations
            .get_mut(&params.id)
            .ok_or(RepoError::NotFound)?;
        record.name = params.name;
        record.address = params.address;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }

    async fn delete_location(&self, id: Uuid) -> Result<(), RepoError> {
        self.begin_write("locations").await?;
        let mut tables = self.tables.lock().expect("tables");
        tables.locations.remove(&id).ok_or(RepoError::NotFound)?;
        for event in tables.events.values_mut() {
            if event.location_id == Some(id) {
                event.location_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AnalyticsRepo for InMemoryStore {
    async fn load_summary(&self, today: Date) -> Result<AnalyticsSummary, RepoError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables.lock().expect("tables");
        let mut events_per_location: Vec<LocationEventCount> = tables
            .locations
            .values()
            .map(|location| LocationEventCount {
                location_id: location.id,
                name: location.name.clone(),
                event_count: tables
                    .events
                    .values()
                    .filter(|event| event.location_id == Some(location.id))
                    .count() as u64,
            })
            .collect();
        events_per_location.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(AnalyticsSummary {
            total_events: tables.events.len() as u64,
            upcoming_events: tables
                .events
                .values()
                .filter(|event| event.date >= today)
                .count() as u64,
            total_locations: tables.locations.len() as u64,
            events_per_location,
            generated_at: OffsetDateTime::now_utc(),
        })
    }
}

#[async_trait]
impl StoreHealth for InMemoryStore {
    async fn health_check(&self) -> Result<(), RepoError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepoError::from_persistence("connection refused"))
        }
    }
}

/// Memory cache that journals deletes and can be told to fail them.
pub struct JournalingCacheStore {
    inner: MemoryCacheStore,
    journal: Journal,
    fail_deletes: AtomicBool,
}

impl JournalingCacheStore {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryCacheStore::new(NonZeroUsize::new(64).expect("non-zero")),
            journal,
            fail_deletes: AtomicBool::new(false),
        })
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CacheStore for JournalingCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set(key, value, ttl).await
    }

    async fn generation(&self, key: &str) -> Result<u64, CacheError> {
        self.inner.generation(key).await
    }

    async fn set_if_generation(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Duration,
        generation: u64,
    ) -> Result<bool, CacheError> {
        self.inner.set_if_generation(key, value, ttl, generation).await
    }

    async fn delete(&self, keys: &[&str]) -> Result<(), CacheError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            self.journal.record("invalidate-failed");
            return Err(CacheError::unavailable("connection reset"));
        }
        self.journal.record(format!("invalidate:{}", keys.join(",")));
        self.inner.delete(keys).await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "journaling"
    }
}

/// Every operation fails as if the connection were refused.
pub struct UnreachableCacheStore;

#[async_trait]
impl CacheStore for UnreachableCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn generation(&self, _key: &str) -> Result<u64, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn set_if_generation(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Duration,
        _generation: u64,
    ) -> Result<bool, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn delete(&self, _keys: &[&str]) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    fn backend(&self) -> &'static str {
        "unreachable"
    }
}

/// Every operation hangs forever.
pub struct HangingCacheStore;

#[async_trait]
impl CacheStore for HangingCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        pending().await
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        pending().await
    }

    async fn generation(&self, _key: &str) -> Result<u64, CacheError> {
        pending().await
    }

    async fn set_if_generation(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _ttl: Duration,
        _generation: u64,
    ) -> Result<bool, CacheError> {
        pending().await
    }

    async fn delete(&self, _keys: &[&str]) -> Result<(), CacheError> {
        pending().await
    }

    async fn ping(&self) -> Result<(), CacheError> {
        pending().await
    }

    fn backend(&self) -> &'static str {
        "hanging"
    }
}

/// Publisher that journals and keeps every change it receives.
#[derive(Default)]
pub struct RecordingPublisher {
    journal: Journal,
    changes: Mutex<Vec<Change>>,
}

impl RecordingPublisher {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            journal,
            changes: Mutex::new(Vec::new()),
        })
    }

    pub fn changes(&self) -> Vec<Change> {
        self.changes.lock().expect("changes lock").clone()
    }
}

impl ChangePublisher for RecordingPublisher {
    fn publish(&self, change: Change) -> Result<u64, PublishError> {
        self.journal.record(format!(
            "publish:{}:{}",
            change.collection,
            change.kind.as_str()
        ));
        let mut changes = self.changes.lock().expect("changes lock");
        changes.push(change);
        Ok(changes.len() as u64)
    }
}

/// Services wired over one in-memory store and one cache store.
pub struct Harness {
    pub repo: Arc<InMemoryStore>,
    pub cache_store: Arc<dyn CacheStore>,
    pub invalidation: InvalidationCoordinator,
    pub events: Arc<EventService>,
    pub locations: Arc<LocationService>,
    pub analytics: Arc<AnalyticsService>,
}

impl Harness {
    pub fn new(
        journal: Journal,
        cache_store: Arc<dyn CacheStore>,
        publisher: Arc<dyn ChangePublisher>,
    ) -> Self {
        Self::with_config(journal, cache_store, publisher, CacheConfig::default())
    }

    pub fn with_config(
        journal: Journal,
        cache_store: Arc<dyn CacheStore>,
        publisher: Arc<dyn ChangePublisher>,
        config: CacheConfig,
    ) -> Self {
        let repo = InMemoryStore::new(journal);
        let cache = CacheAside::new(Arc::clone(&cache_store), config);
        let invalidation = InvalidationCoordinator::new(Arc::clone(&cache_store));
        let pipeline = Arc::new(MutationPipeline::new(
            invalidation.clone(),
            publisher,
            STORE_TIMEOUT,
        ));

        let events = Arc::new(EventService::new(
            repo.clone(),
            repo.clone(),
            repo.clone(),
            cache.clone(),
            pipeline.clone(),
        ));
        let locations = Arc::new(LocationService::new(
            repo.clone(),
            repo.clone(),
            cache.clone(),
            pipeline,
        ));
        let analytics = Arc::new(AnalyticsService::new(repo.clone(), cache));

        Self {
            repo,
            cache_store,
            invalidation,
            events,
            locations,
            analytics,
        }
    }
}

pub fn memory_cache() -> Arc<dyn CacheStore> {
    Arc::new(MemoryCacheStore::new(
        NonZeroUsize::new(64).expect("non-zero"),
    ))
}
