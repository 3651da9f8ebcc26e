//! Time-boxed cache with a cooldown on manual refreshes
//!
//! Entries are stored as JSON envelopes under `<namespace>:<key>` in a
//! [`Store`]. An entry is served while it is younger than the configured
//! cache duration and evicted on the first read after that. Manual refreshes
//! are throttled per key by a separate cooldown.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::store::{Store, StoreError};
use crate::config::CacheConfig;

/// Envelope persisted for every cached value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached payload
    pub data: T,
    /// When the payload was stored
    pub fetched_at: DateTime<Utc>,
    /// When the payload was last stored by a manual refresh, if it was
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_manual_refresh_at: Option<DateTime<Utc>>,
}

/// Freshness and cooldown summary of a stored entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStatus {
    pub fetched_at: DateTime<Utc>,
    /// Time since the entry was stored
    pub age: Duration,
    pub is_valid: bool,
    /// Validity left before the entry expires, zero once expired
    pub expires_in: Duration,
    pub last_manual_refresh_at: Option<DateTime<Utc>>,
    /// Whole seconds until a manual refresh is allowed again
    pub remaining_cooldown_secs: u64,
}

/// Cache of serializable values with absolute expiry
///
/// All store failures are absorbed here: a failed read is a miss and a
/// failed write is logged and dropped. Errors from the fetch function given
/// to [`TimedCache::fetch_with_cache`] are never absorbed.
#[derive(Debug, Clone)]
pub struct TimedCache<S, C = SystemClock> {
    store: S,
    clock: C,
    config: CacheConfig,
}

impl<S: Store> TimedCache<S, SystemClock> {
    /// Creates a cache over `store` using the system clock
    pub fn new(store: S, config: CacheConfig) -> Self {
        Self::with_clock(store, config, SystemClock)
    }
}

impl<S: Store, C: Clock> TimedCache<S, C> {
    /// Creates a cache with an explicit time source
    pub fn with_clock(store: S, config: CacheConfig, clock: C) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Store key for a logical cache key
    fn store_key(&self, key: &str) -> String {
        format!("{}:{}", self.config.namespace, key)
    }

    fn namespace_prefix(&self) -> String {
        format!("{}:", self.config.namespace)
    }

    /// Whether `entry` is still inside the cache window
    pub fn is_valid<T>(&self, entry: Option<&CacheEntry<T>>) -> bool {
        match entry {
            Some(entry) => self.clock.now() - entry.fetched_at < self.config.cache_duration,
            None => false,
        }
    }

    /// Whether a manual refresh is allowed for `entry`
    pub fn can_manual_refresh<T>(&self, entry: Option<&CacheEntry<T>>) -> bool {
        match entry.and_then(|entry| entry.last_manual_refresh_at) {
            Some(last) => self.clock.now() - last >= self.config.manual_refresh_cooldown,
            None => true,
        }
    }

    /// Whole seconds left before a manual refresh is allowed, rounded up
    pub fn remaining_cooldown_secs<T>(&self, entry: Option<&CacheEntry<T>>) -> u64 {
        let Some(last) = entry.and_then(|entry| entry.last_manual_refresh_at) else {
            return 0;
        };
        let elapsed = self.clock.now() - last;
        let remaining_ms = (self.config.manual_refresh_cooldown - elapsed).num_milliseconds();
        if remaining_ms <= 0 {
            0
        } else {
            // ceil(ms / 1000)
            ((remaining_ms + 999) / 1000) as u64
        }
    }

    /// Reads and decodes the raw entry for `key` without checking expiry
    pub fn entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let store_key = self.store_key(key);
        let bytes = match self.store.get(&store_key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %store_key, error = %e, "cache read failed");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key = %store_key, error = %e, "cache entry could not be decoded");
                None
            }
        }
    }

    /// Reads the entry for `key`, evicting it if it has expired
    fn valid_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.entry::<T>(key)?;
        if self.is_valid(Some(&entry)) {
            return Some(entry);
        }

        let store_key = self.store_key(key);
        debug!(key = %store_key, "cache entry expired, removing");
        if let Err(e) = self.store.delete(&store_key) {
            warn!(key = %store_key, error = %e, "failed to remove expired cache entry");
        }
        None
    }

    /// Returns the cached value for `key` if it is still valid
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.valid_entry(key).map(|entry| entry.data)
    }

    /// Stores `data` under `key`, replacing the whole entry
    ///
    /// The manual-refresh timestamp is recorded only when `is_manual_refresh`
    /// is set. A routine write therefore clears any earlier cooldown.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, is_manual_refresh: bool) {
        let now = self.clock.now();
        let entry = CacheEntry {
            data,
            fetched_at: now,
            last_manual_refresh_at: is_manual_refresh.then_some(now),
        };
        let store_key = self.store_key(key);
        if let Err(e) = self.write_entry(&store_key, &entry) {
            warn!(key = %store_key, error = %e, "cache write failed");
        }
    }

    fn write_entry<T: Serialize>(
        &self,
        store_key: &str,
        entry: &CacheEntry<T>,
    ) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(entry)?;
        self.store.set(store_key, &bytes)
    }

    /// Last manual refresh recorded for `key`, whatever its payload type
    pub fn last_manual_refresh(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entry::<IgnoredAny>(key)?.last_manual_refresh_at
    }

    /// Records a manual refresh for an existing entry without touching its data
    ///
    /// Does nothing when there is no entry for `key`.
    pub fn mark_manual_refresh(&self, key: &str) {
        let Some(mut entry) = self.entry::<serde_json::Value>(key) else {
            return;
        };
        entry.last_manual_refresh_at = Some(self.clock.now());
        let store_key = self.store_key(key);
        if let Err(e) = self.write_entry(&store_key, &entry) {
            warn!(key = %store_key, error = %e, "failed to update manual refresh timestamp");
        }
    }

    /// [`can_manual_refresh`](Self::can_manual_refresh) for the entry stored under `key`
    pub fn can_manual_refresh_key(&self, key: &str) -> bool {
        self.can_manual_refresh(self.entry::<IgnoredAny>(key).as_ref())
    }

    /// [`remaining_cooldown_secs`](Self::remaining_cooldown_secs) for the entry stored under `key`
    pub fn remaining_cooldown_secs_key(&self, key: &str) -> u64 {
        self.remaining_cooldown_secs(self.entry::<IgnoredAny>(key).as_ref())
    }

    /// Freshness summary for `key`, without evicting expired entries
    pub fn status(&self, key: &str) -> Option<EntryStatus> {
        let entry = self.entry::<IgnoredAny>(key)?;
        let age = self.clock.now() - entry.fetched_at;
        let expires_in = (self.config.cache_duration - age).max(Duration::zero());
        Some(EntryStatus {
            fetched_at: entry.fetched_at,
            age,
            is_valid: self.is_valid(Some(&entry)),
            expires_in,
            last_manual_refresh_at: entry.last_manual_refresh_at,
            remaining_cooldown_secs: self.remaining_cooldown_secs(Some(&entry)),
        })
    }

    /// Returns the cached value for `key`, or fetches, stores and returns a fresh one
    ///
    /// With `force_refresh` the cache is bypassed and the write is recorded as
    /// a manual refresh. `fetch_fn` runs at most once and its error is
    /// returned unchanged. A failed cache write does not affect the result.
    pub async fn fetch_with_cache<T, E, F, Fut>(
        &self,
        key: &str,
        fetch_fn: F,
        force_refresh: bool,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !force_refresh {
            if let Some(entry) = self.valid_entry::<T>(key) {
                let remaining = self.config.cache_duration - (self.clock.now() - entry.fetched_at);
                debug!(key, valid_for_minutes = remaining.num_minutes(), "cache hit");
                return Ok(entry.data);
            }
        }

        info!(key, force_refresh, "fetching fresh data");
        let data = fetch_fn().await?;
        self.set(key, &data, force_refresh);
        Ok(data)
    }

    /// Removes every entry under this cache's namespace
    pub fn clear_all(&self) {
        let prefix = self.namespace_prefix();
        let keys = match self.store.list_keys(&prefix) {
            Ok(keys) => keys,
            Err(e) => {
                warn!(namespace = %self.config.namespace, error = %e, "failed to list cache entries");
                return;
            }
        };

        for key in keys {
            if let Err(e) = self.store.delete(&key) {
                warn!(key = %key, error = %e, "failed to remove cache entry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, MemoryStore};
    use std::sync::atomic::{AtomicUsize, Ordering};

    type TestCache = TimedCache<MemoryStore, ManualClock>;

    fn epoch() -> DateTime<Utc> {
        DateTime::from_timestamp(0, 0).unwrap()
    }

    fn create_test_cache() -> (TestCache, ManualClock) {
        let clock = ManualClock::new(epoch());
        let cache = TimedCache::with_clock(MemoryStore::new(), CacheConfig::default(), clock.clone());
        (cache, clock)
    }

    fn entry_at(fetched_at: DateTime<Utc>, manual: Option<DateTime<Utc>>) -> CacheEntry<u32> {
        CacheEntry {
            data: 7,
            fetched_at,
            last_manual_refresh_at: manual,
        }
    }

    /// Store whose every operation fails
    struct BrokenStore;

    impl Store for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Err(StoreError::Poisoned)
        }
        fn set(&self, _key: &str, _value: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        fn delete(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Poisoned)
        }
        fn list_keys(&self, _prefix: &str) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Poisoned)
        }
    }

    #[test]
    fn test_is_valid_boundary() {
        let (cache, clock) = create_test_cache();
        let entry = entry_at(epoch(), None);

        clock.set(epoch() + Duration::seconds(3599));
        assert!(cache.is_valid(Some(&entry)));

        clock.set(epoch() + Duration::seconds(3600));
        assert!(!cache.is_valid(Some(&entry)));
    }

    #[test]
    fn test_is_valid_without_entry_is_false() {
        let (cache, _clock) = create_test_cache();
        assert!(!cache.is_valid::<u32>(None));
    }

    #[test]
    fn test_can_manual_refresh_boundary() {
        let (cache, clock) = create_test_cache();
        let entry = entry_at(epoch(), Some(epoch()));

        clock.set(epoch() + Duration::seconds(299));
        assert!(!cache.can_manual_refresh(Some(&entry)));

        clock.set(epoch() + Duration::seconds(300));
        assert!(cache.can_manual_refresh(Some(&entry)));
    }

    #[test]
    fn test_can_manual_refresh_without_prior_refresh() {
        let (cache, _clock) = create_test_cache();
        assert!(cache.can_manual_refresh::<u32>(None));
        assert!(cache.can_manual_refresh(Some(&entry_at(epoch(), None))));
    }

    #[test]
    fn test_remaining_cooldown_counts_down_to_zero() {
        let (cache, clock) = create_test_cache();
        let entry = entry_at(epoch(), Some(epoch()));

        let mut previous = u64::MAX;
        for second in 0..300 {
            clock.set(epoch() + Duration::seconds(second));
            let remaining = cache.remaining_cooldown_secs(Some(&entry));
            assert_eq!(remaining, (300 - second) as u64);
            assert!(remaining < previous, "remaining cooldown must strictly decrease");
            previous = remaining;
        }

        for second in 300..310 {
            clock.set(epoch() + Duration::seconds(second));
            assert_eq!(cache.remaining_cooldown_secs(Some(&entry)), 0);
        }
    }

    #[test]
    fn test_remaining_cooldown_rounds_partial_seconds_up() {
        let (cache, clock) = create_test_cache();
        let entry = entry_at(epoch(), Some(epoch()));

        clock.set(epoch() + Duration::milliseconds(299_001));
        assert_eq!(cache.remaining_cooldown_secs(Some(&entry)), 1);
    }

    #[test]
    fn test_remaining_cooldown_without_prior_refresh_is_zero() {
        let (cache, _clock) = create_test_cache();
        assert_eq!(cache.remaining_cooldown_secs(Some(&entry_at(epoch(), None))), 0);
        assert_eq!(cache.remaining_cooldown_secs::<u32>(None), 0);
    }

    #[test]
    fn test_get_returns_valid_data() {
        let (cache, clock) = create_test_cache();
        cache.set("rates", &vec![1.5_f64, 2.5], false);

        clock.advance(Duration::minutes(59));

        assert_eq!(cache.get::<Vec<f64>>("rates"), Some(vec![1.5, 2.5]));
    }

    #[test]
    fn test_get_evicts_expired_entry() {
        let (cache, clock) = create_test_cache();
        cache.set("rates", &42u32, false);
        assert!(cache.store().get("api_cache:rates").unwrap().is_some());

        clock.advance(Duration::hours(1));

        assert_eq!(cache.get::<u32>("rates"), None);
        assert!(cache.store().get("api_cache:rates").unwrap().is_none());
    }

    #[test]
    fn test_get_treats_corrupt_entry_as_miss() {
        let (cache, _clock) = create_test_cache();
        cache.store().set("api_cache:rates", b"not json").unwrap();

        assert_eq!(cache.get::<u32>("rates"), None);
    }

    #[test]
    fn test_get_with_wrong_payload_type_is_miss() {
        let (cache, _clock) = create_test_cache();
        cache.set("rates", &"text", false);

        assert_eq!(cache.get::<u32>("rates"), None);
    }

    #[test]
    fn test_set_records_manual_refresh_only_when_flagged() {
        let (cache, clock) = create_test_cache();
        clock.set(epoch() + Duration::seconds(10));

        cache.set("manual", &1u32, true);
        cache.set("routine", &1u32, false);

        let manual = cache.entry::<u32>("manual").unwrap();
        assert_eq!(manual.fetched_at, epoch() + Duration::seconds(10));
        assert_eq!(manual.last_manual_refresh_at, Some(epoch() + Duration::seconds(10)));
        assert_eq!(cache.entry::<u32>("routine").unwrap().last_manual_refresh_at, None);
    }

    #[test]
    fn test_routine_set_clears_previous_cooldown() {
        let (cache, clock) = create_test_cache();
        cache.set("rates", &1u32, true);
        assert!(!cache.can_manual_refresh_key("rates"));

        clock.advance(Duration::seconds(30));
        cache.set("rates", &2u32, false);

        assert!(cache.can_manual_refresh_key("rates"));
        assert_eq!(cache.last_manual_refresh("rates"), None);
    }

    #[test]
    fn test_routine_set_omits_manual_refresh_field() {
        let (cache, _clock) = create_test_cache();
        cache.set("rates", &1u32, false);

        let raw = cache.store().get("api_cache:rates").unwrap().unwrap();
        let text = String::from_utf8(raw).unwrap();
        assert!(text.contains("fetched_at"));
        assert!(!text.contains("last_manual_refresh_at"));
    }

    #[test]
    fn test_mark_manual_refresh_preserves_data() {
        let (cache, clock) = create_test_cache();
        cache.set("news", &vec!["headline".to_string()], false);

        clock.advance(Duration::seconds(45));
        cache.mark_manual_refresh("news");

        let entry = cache.entry::<Vec<String>>("news").unwrap();
        assert_eq!(entry.data, vec!["headline".to_string()]);
        assert_eq!(entry.fetched_at, epoch());
        assert_eq!(entry.last_manual_refresh_at, Some(epoch() + Duration::seconds(45)));
        assert_eq!(cache.remaining_cooldown_secs_key("news"), 300);
    }

    #[test]
    fn test_mark_manual_refresh_on_missing_key_does_nothing() {
        let (cache, _clock) = create_test_cache();
        cache.mark_manual_refresh("missing");

        assert!(cache.store().is_empty());
        assert_eq!(cache.last_manual_refresh("missing"), None);
    }

    #[test]
    fn test_status_reports_age_and_cooldown() {
        let (cache, clock) = create_test_cache();
        cache.set("rates", &1u32, true);

        clock.advance(Duration::seconds(120));
        let status = cache.status("rates").unwrap();

        assert_eq!(status.age, Duration::seconds(120));
        assert!(status.is_valid);
        assert_eq!(status.expires_in, Duration::seconds(3480));
        assert_eq!(status.remaining_cooldown_secs, 180);

        clock.advance(Duration::hours(2));
        let status = cache.status("rates").unwrap();
        assert!(!status.is_valid);
        assert_eq!(status.expires_in, Duration::zero());
        assert_eq!(status.remaining_cooldown_secs, 0);
        assert!(cache.status("missing").is_none());
    }

    #[tokio::test]
    async fn test_fetch_with_cache_hit_skips_fetch() {
        let (cache, _clock) = create_test_cache();
        cache.set("rates", &vec![1u32, 2, 3], false);
        let calls = AtomicUsize::new(0);

        let result = cache
            .fetch_with_cache(
                "rates",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(vec![9u32])
                },
                false,
            )
            .await;

        assert_eq!(result, Ok(vec![1, 2, 3]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_with_cache_miss_fetches_once_and_stores() {
        let (cache, clock) = create_test_cache();
        clock.set(epoch() + Duration::seconds(5));
        let calls = AtomicUsize::new(0);

        let result = cache
            .fetch_with_cache(
                "rates",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(vec![4u32, 5])
                },
                false,
            )
            .await;

        assert_eq!(result, Ok(vec![4, 5]));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get::<Vec<u32>>("rates"), Some(vec![4, 5]));
        assert_eq!(cache.last_manual_refresh("rates"), None);
    }

    #[tokio::test]
    async fn test_fetch_with_cache_force_refresh_bypasses_hit() {
        let (cache, clock) = create_test_cache();
        cache.set("rates", &1u32, false);
        clock.advance(Duration::seconds(60));
        let calls = AtomicUsize::new(0);

        let result = cache
            .fetch_with_cache(
                "rates",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(2u32)
                },
                true,
            )
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let entry = cache.entry::<u32>("rates").unwrap();
        assert_eq!(entry.data, 2);
        assert_eq!(entry.last_manual_refresh_at, Some(epoch() + Duration::seconds(60)));
    }

    #[tokio::test]
    async fn test_fetch_with_cache_expired_entry_refetches() {
        let (cache, clock) = create_test_cache();
        cache.set("rates", &1u32, false);
        clock.advance(Duration::hours(2));

        let result = cache
            .fetch_with_cache("rates", || async { Ok::<_, String>(3u32) }, false)
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(cache.get::<u32>("rates"), Some(3));
    }

    #[tokio::test]
    async fn test_fetch_with_cache_propagates_fetch_error() {
        let (cache, _clock) = create_test_cache();

        let result = cache
            .fetch_with_cache::<u32, _, _, _>(
                "rates",
                || async { Err("upstream unavailable".to_string()) },
                false,
            )
            .await;

        assert_eq!(result, Err("upstream unavailable".to_string()));
        assert!(cache.store().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_with_cache_survives_broken_store() {
        let cache = TimedCache::new(BrokenStore, CacheConfig::default());

        let result = cache
            .fetch_with_cache("rates", || async { Ok::<_, String>(11u32) }, false)
            .await;

        assert_eq!(result, Ok(11));
        assert_eq!(cache.get::<u32>("rates"), None);
        cache.clear_all();
    }

    #[test]
    fn test_clear_all_only_touches_own_namespace() {
        let (cache, _clock) = create_test_cache();
        cache.set("rates", &1u32, false);
        cache.set("news", &2u32, false);
        cache.store().set("theme", b"dark").unwrap();
        cache.store().set("api_cache_legacy:x", b"1").unwrap();

        cache.clear_all();

        assert_eq!(cache.get::<u32>("rates"), None);
        assert_eq!(cache.get::<u32>("news"), None);
        assert_eq!(cache.store().get("theme").unwrap(), Some(b"dark".to_vec()));
        assert!(cache.store().get("api_cache_legacy:x").unwrap().is_some());
    }

    #[test]
    fn test_custom_namespace_and_durations() {
        let clock = ManualClock::new(epoch());
        let config = CacheConfig::default()
            .with_namespace("markets")
            .with_cache_duration(Duration::seconds(10));
        let cache = TimedCache::with_clock(MemoryStore::new(), config, clock.clone());

        cache.set("ibov", &1u32, false);
        assert!(cache.store().get("markets:ibov").unwrap().is_some());

        clock.advance(Duration::seconds(10));
        assert_eq!(cache.get::<u32>("ibov"), None);
    }
}
