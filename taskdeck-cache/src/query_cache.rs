//! Query cache with in-flight deduplication and cancellable fetches.
//!
//! Each [`QueryCache`] serves one namespace (task lists, projects, ...). The
//! only ways to change cached data are [`QueryCache::write`],
//! [`QueryCache::patch`], [`QueryCache::invalidate`] and the fetch path, plus
//! the snapshot/restore pair used for optimistic rollback.
//!
//! Every fetch gets a unique id recorded in its entry. A response is applied
//! only if its id is still the entry's in-flight id when it arrives;
//! cancelling or invalidating an entry clears the id, so a late response is
//! discarded instead of overwriting newer local state.
//!
//! All methods must be called from within a Tokio runtime, since fetches are
//! driven by spawned tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use taskdeck_core::RemoteError;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::freshness::{CacheConfig, CacheEntry, EntryStatus};
use crate::key::CacheKey;
use crate::traits::{CacheStats, QueryFetcher};

/// Failure of a cache fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The fetch was cancelled or superseded before its response arrived.
    #[error("Fetch for {key} was cancelled")]
    Cancelled { key: String },
}

impl CacheError {
    fn cancelled<K: CacheKey>(key: &K) -> Self {
        Self::Cancelled {
            key: format!("{:?}", key),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

type SharedFetch<V> = Shared<BoxFuture<'static, CacheResult<Arc<V>>>>;

struct InFlight<V> {
    id: u64,
    future: SharedFetch<V>,
}

struct Slot<V> {
    data: Option<Arc<V>>,
    status: EntryStatus,
    last_error: Option<RemoteError>,
    updated_at: Option<Instant>,
    in_flight: Option<InFlight<V>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            data: None,
            status: EntryStatus::Empty,
            last_error: None,
            updated_at: None,
            in_flight: None,
        }
    }
}

impl<V> Slot<V> {
    fn view(&self, now: Instant) -> CacheEntry<V> {
        CacheEntry {
            data: self.data.clone(),
            status: self.status,
            last_error: self.last_error.clone(),
            is_fetching: self.in_flight.is_some(),
            age: self.updated_at.map(|at| now.saturating_duration_since(at)),
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    joined: AtomicU64,
    discarded: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

struct Inner<K, V> {
    name: &'static str,
    slots: Mutex<HashMap<K, Slot<V>>>,
    fetcher: Arc<dyn QueryFetcher<K, V>>,
    config: CacheConfig,
    next_fetch_id: AtomicU64,
    epoch: AtomicU64,
    counters: Counters,
}

impl<K: CacheKey, V: Send + Sync + 'static> Inner<K, V> {
    fn lock_slots(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        // Every mutation below is a plain field assignment, so a panic in
        // another holder cannot leave a slot half-written.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, key: &K, id: u64, result: Result<V, RemoteError>) -> CacheResult<Arc<V>> {
        let mut slots = self.lock_slots();
        let slot = slots
            .get_mut(key)
            .filter(|slot| slot.in_flight.as_ref().is_some_and(|f| f.id == id));
        let Some(slot) = slot else {
            bump(&self.counters.discarded);
            debug!(cache = self.name, key = ?key, fetch_id = id, "Discarding response of cancelled fetch");
            return Err(CacheError::cancelled(key));
        };

        slot.in_flight = None;
        match result {
            Ok(value) => {
                let value = Arc::new(value);
                slot.data = Some(Arc::clone(&value));
                slot.status = EntryStatus::Fresh;
                slot.last_error = None;
                slot.updated_at = Some(Instant::now());
                trace!(cache = self.name, key = ?key, fetch_id = id, "Fetch applied");
                Ok(value)
            }
            Err(err) => {
                warn!(
                    cache = self.name,
                    key = ?key,
                    fetch_id = id,
                    error = %err,
                    kept_data = slot.data.is_some(),
                    "Fetch failed"
                );
                slot.status = EntryStatus::Error;
                slot.last_error = Some(err.clone());
                Err(CacheError::Remote(err))
            }
        }
    }
}

/// Snapshot of a set of entries, for exact restoration.
pub struct CacheSnapshot<K, V> {
    epoch: u64,
    entries: Vec<SnapshotEntry<K, V>>,
}

struct SnapshotEntry<K, V> {
    key: K,
    data: Option<Arc<V>>,
    status: EntryStatus,
    last_error: Option<RemoteError>,
    updated_at: Option<Instant>,
}

impl<K: CacheKey, V> CacheSnapshot<K, V> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|entry| &entry.key)
    }

    /// Data captured for `key`, if the snapshot covers it.
    pub fn data(&self, key: &K) -> Option<&Arc<V>> {
        self.entries
            .iter()
            .find(|entry| &entry.key == key)
            .and_then(|entry| entry.data.as_ref())
    }
}

/// Cache of one query namespace.
pub struct QueryCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for QueryCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: CacheKey, V: Send + Sync + 'static> QueryCache<K, V> {
    /// Create a cache for the namespace `name`, filled by `fetcher`.
    pub fn new(name: &'static str, fetcher: Arc<dyn QueryFetcher<K, V>>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                slots: Mutex::new(HashMap::new()),
                fetcher,
                config,
                next_fetch_id: AtomicU64::new(1),
                epoch: AtomicU64::new(0),
                counters: Counters::default(),
            }),
        }
    }

    pub fn with_defaults(name: &'static str, fetcher: Arc<dyn QueryFetcher<K, V>>) -> Self {
        Self::new(name, fetcher, CacheConfig::default())
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        self.inner.lock_slots()
    }

    /// Register a new fetch on `slot`. The caller must spawn the returned
    /// future after releasing the lock.
    fn begin_fetch(&self, key: &K, slot: &mut Slot<V>) -> SharedFetch<V> {
        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let fetcher = Arc::clone(&self.inner.fetcher);
        let weak: Weak<Inner<K, V>> = Arc::downgrade(&self.inner);
        let owned_key = key.clone();

        let future = async move {
            let result = fetcher.fetch(&owned_key).await;
            match weak.upgrade() {
                Some(inner) => inner.settle(&owned_key, id, result),
                None => Err(CacheError::cancelled(&owned_key)),
            }
        }
        .boxed()
        .shared();

        slot.in_flight = Some(InFlight {
            id,
            future: future.clone(),
        });
        if slot.data.is_none() {
            slot.status = EntryStatus::Loading;
        }
        bump(&self.inner.counters.fetches);
        debug!(cache = self.inner.name, key = ?key, fetch_id = id, "Starting fetch");
        future
    }

    /// Return the entry for `key` immediately, starting a background fetch
    /// if it is absent, stale or older than the configured refresh age.
    ///
    /// While a fetch for `key` is in flight, no second fetch is started.
    pub fn read(&self, key: &K) -> CacheEntry<V> {
        let now = Instant::now();
        let (entry, started) = {
            let mut slots = self.lock();
            let slot = slots.entry(key.clone()).or_default();

            let expired = slot.status == EntryStatus::Fresh
                && slot
                    .updated_at
                    .is_some_and(|at| self.inner.config.is_expired(now.saturating_duration_since(at)));
            if expired {
                slot.status = EntryStatus::Stale;
            }

            let started = if slot.in_flight.is_none() && slot.status.needs_fetch() {
                Some(self.begin_fetch(key, slot))
            } else {
                None
            };
            if started.is_none() && slot.in_flight.is_some() {
                bump(&self.inner.counters.joined);
            }
            (slot.view(now), started)
        };

        match started {
            Some(future) => {
                bump(&self.inner.counters.misses);
                tokio::spawn(future);
            }
            None => bump(&self.inner.counters.hits),
        }
        entry
    }

    /// Fetch `key`, joining the in-flight fetch if there is one.
    ///
    /// Unlike [`QueryCache::read`] this always waits for a response, even
    /// when the cached data is fresh.
    pub async fn fetch(&self, key: &K) -> CacheResult<Arc<V>> {
        let (future, started) = {
            let mut slots = self.lock();
            let slot = slots.entry(key.clone()).or_default();
            let joined = slot.in_flight.as_ref().map(|f| f.future.clone());
            match joined {
                Some(future) => {
                    bump(&self.inner.counters.joined);
                    debug!(cache = self.inner.name, key = ?key, "Joining in-flight fetch");
                    (future, false)
                }
                None => (self.begin_fetch(key, slot), true),
            }
        };
        if started {
            tokio::spawn(future.clone());
        }
        future.await
    }

    /// Return fresh cached data, or fetch it.
    pub async fn get(&self, key: &K) -> CacheResult<Arc<V>> {
        let cached = {
            let slots = self.lock();
            slots.get(key).and_then(|slot| {
                let expired = slot.updated_at.is_some_and(|at| {
                    self.inner
                        .config
                        .is_expired(Instant::now().saturating_duration_since(at))
                });
                (slot.status == EntryStatus::Fresh && !expired)
                    .then(|| slot.data.clone())
                    .flatten()
            })
        };
        match cached {
            Some(data) => {
                bump(&self.inner.counters.hits);
                Ok(data)
            }
            None => self.fetch(key).await,
        }
    }

    /// Current entry for `key` without triggering a fetch.
    pub fn peek(&self, key: &K) -> CacheEntry<V> {
        let now = Instant::now();
        self.lock()
            .get(key)
            .map(|slot| slot.view(now))
            .unwrap_or_else(CacheEntry::empty)
    }

    /// Replace the data for `key` and mark it fresh.
    pub fn write(&self, key: K, data: V) {
        let mut slots = self.lock();
        let slot = slots.entry(key).or_default();
        slot.data = Some(Arc::new(data));
        slot.status = EntryStatus::Fresh;
        slot.last_error = None;
        slot.updated_at = Some(Instant::now());
    }

    /// Apply `mapper` to the data of every entry whose key matches.
    ///
    /// `mapper` returns `None` to leave an entry untouched. Entry status is
    /// not changed; patched data is a local override until the next fetch.
    /// Entries without data are skipped. Returns the number patched.
    pub fn patch<P, F>(&self, predicate: P, mut mapper: F) -> usize
    where
        P: Fn(&K) -> bool,
        F: FnMut(&V) -> Option<V>,
    {
        let mut slots = self.lock();
        let mut patched = 0;
        for (_, slot) in slots.iter_mut().filter(|(key, _)| predicate(key)) {
            let Some(current) = slot.data.as_deref() else {
                continue;
            };
            if let Some(next) = mapper(current) {
                slot.data = Some(Arc::new(next));
                patched += 1;
            }
        }
        debug!(cache = self.inner.name, patched, "Patched entries");
        patched
    }

    /// Mark matching entries stale so their next read refetches.
    ///
    /// Data stays visible until the refetch resolves. A fetch already in
    /// flight for a matching key is superseded and its response discarded,
    /// since it may predate the change that caused the invalidation.
    pub fn invalidate<P>(&self, predicate: P) -> usize
    where
        P: Fn(&K) -> bool,
    {
        let mut slots = self.lock();
        let mut invalidated = 0;
        for (_, slot) in slots.iter_mut().filter(|(key, _)| predicate(key)) {
            slot.in_flight = None;
            slot.status = if slot.data.is_some() {
                EntryStatus::Stale
            } else {
                EntryStatus::Empty
            };
            invalidated += 1;
        }
        debug!(cache = self.inner.name, invalidated, "Invalidated entries");
        invalidated
    }

    /// Invalidate every entry of this namespace.
    pub fn invalidate_all(&self) -> usize {
        self.invalidate(|_| true)
    }

    /// Cancel in-flight fetches for matching keys. Their responses will be
    /// discarded. Returns the number cancelled.
    pub fn cancel<P>(&self, predicate: P) -> usize
    where
        P: Fn(&K) -> bool,
    {
        let mut slots = self.lock();
        let mut cancelled = 0;
        for (_, slot) in slots.iter_mut().filter(|(key, _)| predicate(key)) {
            if slot.in_flight.take().is_some() {
                if slot.status == EntryStatus::Loading {
                    slot.status = EntryStatus::Empty;
                }
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!(cache = self.inner.name, cancelled, "Cancelled in-flight fetches");
        }
        cancelled
    }

    /// Capture the state of every matching entry.
    pub fn snapshot<P>(&self, predicate: P) -> CacheSnapshot<K, V>
    where
        P: Fn(&K) -> bool,
    {
        self.capture(|key, _| predicate(key))
    }

    /// Capture the state of every entry whose data satisfies `predicate`.
    /// Entries without data are never captured.
    pub fn snapshot_matching<P>(&self, predicate: P) -> CacheSnapshot<K, V>
    where
        P: Fn(&K, &V) -> bool,
    {
        self.capture(|key, data| data.is_some_and(|data| predicate(key, data)))
    }

    fn capture<P>(&self, predicate: P) -> CacheSnapshot<K, V>
    where
        P: Fn(&K, Option<&V>) -> bool,
    {
        let slots = self.lock();
        let entries = slots
            .iter()
            .filter(|(key, slot)| predicate(key, slot.data.as_deref()))
            .map(|(key, slot)| SnapshotEntry {
                key: key.clone(),
                data: slot.data.clone(),
                status: slot.status,
                last_error: slot.last_error.clone(),
                updated_at: slot.updated_at,
            })
            .collect();
        CacheSnapshot {
            epoch: self.inner.epoch.load(Ordering::Acquire),
            entries,
        }
    }

    /// Put every captured entry back exactly as it was.
    ///
    /// A snapshot taken before [`QueryCache::clear`] is ignored, so a
    /// rollback cannot resurrect data from before a sign-out. Entries whose
    /// key was removed since the snapshot stay removed.
    pub fn restore(&self, snapshot: CacheSnapshot<K, V>) -> usize {
        let mut slots = self.lock();
        if snapshot.epoch != self.inner.epoch.load(Ordering::Acquire) {
            debug!(cache = self.inner.name, "Ignoring snapshot taken before clear");
            return 0;
        }
        let mut restored = 0;
        for entry in snapshot.entries {
            let Some(slot) = slots.get_mut(&entry.key) else {
                continue;
            };
            restored += 1;
            slot.data = entry.data;
            slot.last_error = entry.last_error;
            slot.updated_at = entry.updated_at;
            slot.status = match entry.status {
                EntryStatus::Loading if slot.in_flight.is_none() => EntryStatus::Empty,
                status => status,
            };
        }
        debug!(cache = self.inner.name, restored, "Restored snapshot");
        restored
    }

    /// Drop matching entries entirely.
    pub fn remove<P>(&self, predicate: P) -> usize
    where
        P: Fn(&K) -> bool,
    {
        let mut slots = self.lock();
        let before = slots.len();
        slots.retain(|key, _| !predicate(key));
        before - slots.len()
    }

    /// Drop every entry. In-flight responses are discarded.
    pub fn clear(&self) {
        let mut slots = self.lock();
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
        let dropped = slots.len();
        slots.clear();
        debug!(cache = self.inner.name, dropped, "Cleared cache");
    }

    /// Keys currently held.
    pub fn keys(&self) -> Vec<K> {
        self.lock().keys().cloned().collect()
    }

    pub fn stats(&self) -> CacheStats {
        let counters = &self.inner.counters;
        CacheStats {
            hits: counters.hits.load(Ordering::Relaxed),
            misses: counters.misses.load(Ordering::Relaxed),
            fetches: counters.fetches.load(Ordering::Relaxed),
            joined: counters.joined.load(Ordering::Relaxed),
            discarded: counters.discarded.load(Ordering::Relaxed),
            entry_count: self.lock().len() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Returns `key * 10 + n` for the n-th call, after a permit is granted.
    struct GatedFetcher {
        calls: AtomicUsize,
        gate: Semaphore,
        fail: std::sync::atomic::AtomicBool,
    }

    impl GatedFetcher {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                gate: Semaphore::new(0),
                fail: std::sync::atomic::AtomicBool::new(false),
            })
        }

        fn open() -> Arc<Self> {
            let fetcher = Self::new();
            fetcher.gate.add_permits(1_000);
            fetcher
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QueryFetcher<u32, u32> for GatedFetcher {
        async fn fetch(&self, key: &u32) -> Result<u32, RemoteError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as u32 + 1;
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| RemoteError::transport("gate closed"))?;
            permit.forget();
            if self.fail.load(Ordering::SeqCst) {
                return Err(RemoteError::transport("offline"));
            }
            Ok(key * 10 + n)
        }
    }

    fn cache(fetcher: &Arc<GatedFetcher>) -> QueryCache<u32, u32> {
        QueryCache::with_defaults("numbers", Arc::clone(fetcher) as Arc<dyn QueryFetcher<u32, u32>>)
    }

    #[tokio::test]
    async fn test_read_miss_starts_one_fetch() {
        let fetcher = GatedFetcher::new();
        let cache = cache(&fetcher);

        let first = cache.read(&1);
        assert!(first.is_loading());
        assert_eq!(first.status, EntryStatus::Loading);

        let second = cache.read(&1);
        assert!(second.is_fetching);

        fetcher.gate.add_permits(1);
        let value = cache.fetch(&1).await.unwrap();
        assert_eq!(*value, 11);
        assert_eq!(fetcher.calls(), 1);

        let entry = cache.read(&1);
        assert!(entry.is_fresh());
        assert_eq!(entry.value(), Some(&11));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_known_good() {
        let fetcher = GatedFetcher::open();
        let cache = cache(&fetcher);
        cache.fetch(&2).await.unwrap();

        fetcher.fail.store(true, Ordering::SeqCst);
        cache.invalidate_all();
        let err = cache.fetch(&2).await.unwrap_err();
        assert_eq!(err, CacheError::Remote(RemoteError::transport("offline")));

        let entry = cache.peek(&2);
        assert_eq!(entry.status, EntryStatus::Error);
        assert_eq!(entry.value(), Some(&21));
        assert!(entry.last_error.is_some());
    }

    #[tokio::test]
    async fn test_error_entry_is_not_refetched_by_read() {
        let fetcher = GatedFetcher::open();
        fetcher.fail.store(true, Ordering::SeqCst);
        let cache = cache(&fetcher);
        assert!(cache.fetch(&3).await.is_err());

        let entry = cache.read(&3);
        assert_eq!(entry.status, EntryStatus::Error);
        assert!(!entry.is_fetching);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_keeps_data_visible() {
        let fetcher = GatedFetcher::new();
        let cache = cache(&fetcher);
        cache.write(4, 400);

        assert_eq!(cache.invalidate(|k| *k == 4), 1);
        let entry = cache.read(&4);
        assert_eq!(entry.status, EntryStatus::Stale);
        assert_eq!(entry.value(), Some(&400));
        assert!(entry.is_fetching);
        assert!(!entry.is_loading());

        fetcher.gate.add_permits(1);
        assert_eq!(*cache.fetch(&4).await.unwrap(), 41);
    }

    #[tokio::test]
    async fn test_cancelled_response_is_discarded() {
        let fetcher = GatedFetcher::new();
        let cache = cache(&fetcher);
        cache.write(5, 500);
        cache.invalidate_all();
        cache.read(&5);

        let joiner = cache.clone();
        let pending = tokio::spawn(async move { joiner.fetch(&5).await });
        tokio::task::yield_now().await;

        assert_eq!(cache.cancel(|_| true), 1);
        cache.patch(|_| true, |v| Some(v + 1));
        fetcher.gate.add_permits(1);

        let result = pending.await.unwrap();
        assert!(matches!(result, Err(CacheError::Cancelled { .. })));
        assert_eq!(cache.peek(&5).value(), Some(&501));
        assert_eq!(cache.stats().discarded, 1);
    }

    #[tokio::test]
    async fn test_snapshot_restore_is_exact() {
        let fetcher = GatedFetcher::new();
        let cache = cache(&fetcher);
        cache.write(1, 10);
        cache.write(2, 20);
        cache.invalidate(|k| *k == 2);

        let snapshot = cache.snapshot(|_| true);
        let original = Arc::clone(snapshot.data(&1).unwrap());
        cache.patch(|_| true, |v| Some(v * 100));
        assert_eq!(cache.peek(&1).value(), Some(&1000));

        assert_eq!(cache.restore(snapshot), 2);
        let restored = cache.peek(&1).data.unwrap();
        assert!(Arc::ptr_eq(&restored, &original));
        assert_eq!(cache.peek(&2).status, EntryStatus::Stale);
    }

    #[tokio::test]
    async fn test_snapshot_matching_filters_on_data() {
        let fetcher = GatedFetcher::new();
        let cache = cache(&fetcher);
        cache.write(1, 10);
        cache.write(2, 25);
        cache.read(&3);

        let snapshot = cache.snapshot_matching(|_, v| v % 2 == 0);
        assert_eq!(snapshot.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn test_restore_after_clear_is_ignored() {
        let fetcher = GatedFetcher::new();
        let cache = cache(&fetcher);
        cache.write(1, 10);
        let snapshot = cache.snapshot(|_| true);
        cache.clear();
        assert_eq!(cache.restore(snapshot), 0);
        assert!(cache.keys().is_empty());
    }

    #[tokio::test]
    async fn test_restore_skips_removed_keys() {
        let fetcher = GatedFetcher::new();
        let cache = cache(&fetcher);
        cache.write(1, 10);
        cache.write(2, 20);
        let snapshot = cache.snapshot(|_| true);

        assert_eq!(cache.remove(|k| *k == 2), 1);
        assert_eq!(cache.restore(snapshot), 1);
        assert_eq!(cache.keys(), vec![1]);
        assert_eq!(cache.peek(&2).status, EntryStatus::Empty);
    }

    #[tokio::test]
    async fn test_patch_skips_entries_without_data() {
        let fetcher = GatedFetcher::new();
        let cache = cache(&fetcher);
        cache.read(&1);
        cache.write(2, 20);
        assert_eq!(cache.patch(|_| true, |v| Some(v + 1)), 1);
        assert_eq!(cache.patch(|_| true, |_| None), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_refreshes_in_background() {
        let fetcher = GatedFetcher::open();
        let cache = QueryCache::new(
            "numbers",
            Arc::clone(&fetcher) as Arc<dyn QueryFetcher<u32, u32>>,
            CacheConfig::new().with_stale_after(Duration::from_secs(30)),
        );
        cache.fetch(&1).await.unwrap();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!cache.read(&1).is_fetching);

        tokio::time::advance(Duration::from_secs(25)).await;
        let entry = cache.read(&1);
        assert_eq!(entry.status, EntryStatus::Stale);
        assert!(entry.is_fetching);
        assert_eq!(entry.value(), Some(&11));
        assert_eq!(*cache.fetch(&1).await.unwrap(), 12);
    }
}
