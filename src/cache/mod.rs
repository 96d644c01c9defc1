//! In-process content cache.
//!
//! A TTL + size-bounded key/value store sitting in front of the content
//! sources, so repeated requests don't re-fetch, re-parse and re-validate
//! markdown.
//!
//! # Policies
//!
//! - **TTL**: every entry expires at `inserted + ttl`; an entry is expired
//!   when `now >= expires_at`. Expired entries are dropped lazily on access
//!   and in bulk by [`ContentCache::cleanup`].
//! - **Capacity**: after an insertion pushes the cache over `max_entries`
//!   or `max_size_bytes`, expired entries go first, then entries in
//!   insertion order (oldest first; an overwrite counts as a new
//!   insertion). The entry being inserted is never evicted.
//! - **Statistics**: `get` records a hit or a miss; `has` does not.
//! - **Invalidation**: glob patterns (`*` only) or regular expressions.

pub mod keys;

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Size charged for values that cannot be serialized
pub const FALLBACK_ENTRY_SIZE: usize = 1024;

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Default time-to-live for entries
    #[serde(default = "default_ttl", with = "duration_secs")]
    pub ttl: Duration,

    /// Maximum number of live entries
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Maximum aggregate size of entries in bytes
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: usize,

    /// How often the background task sweeps expired entries
    #[serde(default = "default_cleanup_interval", with = "duration_secs")]
    pub cleanup_interval: Duration,
}

fn default_ttl() -> Duration {
    Duration::from_secs(300)
} // 5 min
fn default_max_entries() -> usize {
    500
}
fn default_max_size_bytes() -> usize {
    50 * 1024 * 1024
} // 50MB
fn default_cleanup_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: default_ttl(),
            max_entries: default_max_entries(),
            max_size_bytes: default_max_size_bytes(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

/// Snapshot of cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Successful lookups since creation
    pub hits: u64,
    /// Failed lookups (absent or expired) since creation
    pub misses: u64,
    /// Live entries
    pub entry_count: usize,
    /// Aggregate size of live entries in bytes
    pub current_size: usize,
    /// Configured size limit in bytes
    pub max_size: usize,
}

/// Pattern used for bulk invalidation
#[derive(Debug, Clone)]
pub enum InvalidationPattern {
    /// Glob where only `*` is special
    Glob(Pattern),
    /// Regular expression tested against the whole key
    Regex(Regex),
    /// Literal key
    Exact(String),
}

impl InvalidationPattern {
    /// Build a glob pattern in which `*` matches any run of characters and
    /// every other character is literal.
    pub fn glob(raw: &str) -> Self {
        if !raw.contains('*') {
            return Self::Exact(raw.to_string());
        }

        let mut collapsed = raw.to_string();
        while collapsed.contains("**") {
            collapsed = collapsed.replace("**", "*");
        }

        let escaped: Vec<String> = collapsed.split('*').map(Pattern::escape).collect();
        match Pattern::new(&escaped.join("*")) {
            Ok(pattern) => Self::Glob(pattern),
            Err(_) => Self::Exact(raw.to_string()),
        }
    }

    /// Test a key against the pattern
    pub fn matches(&self, key: &str) -> bool {
        match self {
            InvalidationPattern::Glob(pattern) => pattern.matches(key),
            InvalidationPattern::Regex(regex) => regex.is_match(key),
            InvalidationPattern::Exact(literal) => literal == key,
        }
    }
}

impl From<&str> for InvalidationPattern {
    fn from(raw: &str) -> Self {
        Self::glob(raw)
    }
}

impl From<String> for InvalidationPattern {
    fn from(raw: String) -> Self {
        Self::glob(&raw)
    }
}

impl From<Regex> for InvalidationPattern {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex)
    }
}

impl From<&Regex> for InvalidationPattern {
    fn from(regex: &Regex) -> Self {
        Self::Regex(regex.clone())
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    size_bytes: usize,
    sequence: u64,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Insertion sequence -> key, oldest first
    order: BTreeMap<u64, String>,
    next_sequence: u64,
    current_size: usize,
    hits: u64,
    misses: u64,
}

impl<V> CacheInner<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_sequence: 0,
            current_size: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.sequence);
        self.current_size = self.current_size.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    fn remove_where<F>(&mut self, predicate: F) -> usize
    where
        F: Fn(&str, &CacheEntry<V>) -> bool,
    {
        let doomed: Vec<String> = self
            .entries
            .iter()
            .filter(|(key, entry)| predicate(key, entry))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }

    fn over_capacity(&self, max_entries: usize, max_size: usize) -> bool {
        self.entries.len() > max_entries || self.current_size > max_size
    }
}

/// TTL + size-bounded cache with statistics and pattern invalidation.
pub struct ContentCache<V> {
    inner: Mutex<CacheInner<V>>,
    default_ttl: Duration,
    max_entries: usize,
    max_size: usize,
}

impl<V: Clone + Serialize> ContentCache<V> {
    /// Create a cache from settings
    pub fn new(settings: &CacheSettings) -> Self {
        Self::with_limits(settings.ttl, settings.max_entries, settings.max_size_bytes)
    }

    /// Create a cache with explicit limits
    pub fn with_limits(default_ttl: Duration, max_entries: usize, max_size: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::new()),
            default_ttl,
            max_entries,
            max_size,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Default TTL applied by [`ContentCache::set`]
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Store a value with the default TTL
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Store a value with an explicit TTL, replacing any existing entry
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let size_bytes = estimate_size(&value);
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(365 * 24 * 60 * 60));

        let mut inner = self.lock();
        inner.remove(&key);

        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        inner.order.insert(sequence, key.clone());
        inner.current_size += size_bytes;
        inner.entries.insert(
            key.clone(),
            CacheEntry {
                value,
                expires_at,
                size_bytes,
                sequence,
            },
        );

        if inner.over_capacity(self.max_entries, self.max_size) {
            let evicted = self.evict(&mut inner, &key, now);
            debug!("Cache over capacity, evicted {} entries", evicted);
        }
    }

    fn evict(&self, inner: &mut CacheInner<V>, keep: &str, now: Instant) -> usize {
        let mut evicted = inner.remove_where(|key, entry| key != keep && entry.is_expired(now));

        while inner.over_capacity(self.max_entries, self.max_size) {
            let victim = inner.order.values().find(|key| key.as_str() != keep).cloned();
            match victim {
                Some(key) => {
                    inner.remove(&key);
                    evicted += 1;
                }
                None => break,
            }
        }

        evicted
    }

    /// Look up a value, recording a hit or miss
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.lock();

        let live = match inner.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                inner.remove(key);
                None
            }
            None => None,
        };

        if live.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        live
    }

    /// Check for a live entry without touching statistics
    pub fn has(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut inner = self.lock();

        match inner.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => true,
            Some(_) => {
                inner.remove(key);
                false
            }
            None => false,
        }
    }

    /// Remove an entry; returns whether it was present
    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Drop all entries (statistics are kept)
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
        inner.current_size = 0;
    }

    /// Remove all expired entries, returning how many were dropped
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        self.lock().remove_where(|_, entry| entry.is_expired(now))
    }

    /// Remove all entries whose key matches the pattern
    pub fn invalidate(&self, pattern: impl Into<InvalidationPattern>) -> usize {
        let pattern = pattern.into();
        let removed = self.lock().remove_where(|key, _| pattern.matches(key));
        debug!("Invalidated {} cache entries ({:?})", removed, pattern);
        removed
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entry_count: inner.entries.len(),
            current_size: inner.current_size,
            max_size: self.max_size,
        }
    }

    /// Hit ratio as a percentage (0 when nothing was looked up yet)
    pub fn hit_ratio(&self) -> f64 {
        let inner = self.lock();
        let total = inner.hits + inner.misses;
        if total == 0 {
            return 0.0;
        }
        inner.hits as f64 / total as f64 * 100.0
    }

    /// Live keys, oldest insertion first
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let inner = self.lock();
        inner
            .order
            .values()
            .filter(|key| {
                inner
                    .entries
                    .get(key.as_str())
                    .is_some_and(|entry| !entry.is_expired(now))
            })
            .cloned()
            .collect()
    }
}

/// Shortest sweep period
pub const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically sweep expired entries until the runtime shuts down.
///
/// Intervals shorter than [`MIN_CLEANUP_INTERVAL`] are raised to it.
pub fn spawn_cleanup_task<V>(
    cache: Arc<ContentCache<V>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()>
where
    V: Clone + Serialize + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_CLEANUP_INTERVAL));
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.cleanup();
            if removed > 0 {
                debug!("Cache cleanup removed {} expired entries", removed);
            }
        }
    })
}

/// Approximate the serialized size of a value without allocating it.
fn estimate_size<V: Serialize>(value: &V) -> usize {
    let mut counter = ByteCounter(0);
    match serde_json::to_writer(&mut counter, value) {
        Ok(()) => counter.0,
        Err(_) => FALLBACK_ENTRY_SIZE,
    }
}

struct ByteCounter(usize);

impl io::Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0 += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> ContentCache<String> {
        ContentCache::with_limits(Duration::from_secs(60), 100, 1024 * 1024)
    }

    #[test]
    fn test_set_and_get() {
        let cache = cache();
        cache.set("story:en:a", "value".to_string());

        assert_eq!(cache.get("story:en:a"), Some("value".to_string()));
        assert!(cache.has("story:en:a"));
    }

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let cache = cache();
        cache.set("k", "first".to_string());
        cache.set("k", "a much longer second value".to_string());

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 1);
        assert_eq!(stats.current_size, estimate_size(&"a much longer second value"));
        assert_eq!(cache.get("k").unwrap(), "a much longer second value");
    }

    #[test]
    fn test_zero_ttl_is_expired() {
        let cache = cache();
        cache.set_with_ttl("k", "v".to_string(), Duration::ZERO);

        assert!(!cache.has("k"));
        assert_eq!(cache.stats().entry_count, 0);
    }

    #[test]
    fn test_has_does_not_touch_stats() {
        let cache = cache();
        cache.set("k", "v".to_string());
        cache.has("k");
        cache.has("missing");

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_evicts_oldest_when_over_max_entries() {
        let cache: ContentCache<u32> = ContentCache::with_limits(Duration::from_secs(60), 2, 1024);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("c", 3);

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert!(cache.has("c"));
        assert_eq!(cache.keys(), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_overwrite_counts_as_fresh_insertion() {
        let cache: ContentCache<u32> = ContentCache::with_limits(Duration::from_secs(60), 2, 1024);
        cache.set("a", 1);
        cache.set("b", 2);
        cache.set("a", 10);
        cache.set("c", 3);

        assert!(!cache.has("b"));
        assert_eq!(cache.get("a"), Some(10));
    }

    #[test]
    fn test_expired_entries_are_evicted_first() {
        let cache: ContentCache<u32> = ContentCache::with_limits(Duration::from_secs(60), 2, 1024);
        cache.set("old", 1);
        cache.set_with_ttl("stale", 2, Duration::ZERO);
        cache.set("new", 3);

        assert!(cache.has("old"));
        assert!(cache.has("new"));
    }

    #[test]
    fn test_size_limit_eviction_keeps_new_entry() {
        let cache: ContentCache<String> =
            ContentCache::with_limits(Duration::from_secs(60), 100, 20);
        cache.set("a", "0123456789".to_string());
        cache.set("b", "abcdefghijklmnopqrstuvwxyz".to_string());

        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert_eq!(cache.stats().entry_count, 1);
    }

    #[test]
    fn test_unserializable_value_uses_fallback_size() {
        let mut map = HashMap::new();
        map.insert((1u8, 2u8), "tuple keys are not valid JSON keys");

        assert_eq!(estimate_size(&map), FALLBACK_ENTRY_SIZE);

        let cache: ContentCache<HashMap<(u8, u8), &str>> = ContentCache::with_limits(
            Duration::from_secs(60),
            10,
            1024 * 1024,
        );
        cache.set("weird", map);
        assert_eq!(cache.stats().current_size, FALLBACK_ENTRY_SIZE);
    }

    #[test]
    fn test_glob_pattern_is_literal_except_star() {
        let pattern = InvalidationPattern::glob("page:[a]?:*");
        assert!(pattern.matches("page:[a]?:x"));
        assert!(!pattern.matches("page:a?:x"));
        assert!(!pattern.matches("page:[a]b:x"));

        let collapsed = InvalidationPattern::glob("blog**");
        assert!(collapsed.matches("blogpost:en:x"));

        let exact = InvalidationPattern::glob("story:en:a");
        assert!(exact.matches("story:en:a"));
        assert!(!exact.matches("story:en:ab"));
    }

    #[test]
    fn test_clear_keeps_statistics() {
        let cache = cache();
        cache.set("k", "v".to_string());
        cache.get("k");
        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.current_size, 0);
        assert_eq!(stats.hits, 1);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = CacheSettings::default();
        assert_eq!(settings.ttl, Duration::from_secs(300));
        assert_eq!(settings.max_entries, 500);
        assert_eq!(settings.max_size_bytes, 50 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_cleanup_task_sweeps_expired_entries() {
        let cache = Arc::new(cache());
        cache.set_with_ttl("short", "v".to_string(), Duration::from_millis(5));

        let handle = spawn_cleanup_task(Arc::clone(&cache), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert_eq!(cache.stats().entry_count, 0);
    }

    #[tokio::test]
    async fn test_cleanup_task_with_zero_interval_keeps_running() {
        let cache = Arc::new(cache());
        cache.set_with_ttl("short", "v".to_string(), Duration::from_millis(5));

        let handle = spawn_cleanup_task(Arc::clone(&cache), Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(!handle.is_finished());
        handle.abort();
        assert_eq!(cache.stats().entry_count, 0);
    }
}
