//! Cache Integration Tests
//!
//! Round-trips, TTL expiry, statistics, invalidation and eviction.

use std::sync::Arc;
use std::time::Duration;

use contentkit::cache::keys;
use contentkit::{CacheSettings, ContentCache};
use regex::Regex;
use serde_json::{json, Value};

fn cache() -> ContentCache<Value> {
    ContentCache::new(&CacheSettings::default())
}

#[test]
fn test_round_trip_structural_equality() {
    let cache = cache();
    let value = json!({ "slug": "a", "tags": ["x", "y"], "nested": { "n": 1 } });

    cache.set("story:en:a", value.clone());
    assert_eq!(cache.get("story:en:a"), Some(value));
}

#[tokio::test]
async fn test_ttl_expiry() {
    let cache = cache();
    cache.set_with_ttl("k", json!(1), Duration::from_millis(10));
    assert!(cache.has("k"));

    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(cache.get("k"), None);
    assert!(!cache.has("k"));
}

#[test]
fn test_idempotent_deletion() {
    let cache = cache();
    assert!(!cache.delete("absent"));

    cache.set("present", json!(true));
    assert!(cache.delete("present"));
    assert!(!cache.has("present"));
    assert!(!cache.delete("present"));
}

#[test]
fn test_stats_and_hit_ratio() {
    let cache = cache();
    assert_eq!(cache.hit_ratio(), 0.0);

    cache.set("a", json!(1));
    cache.get("a");
    cache.get("a");
    cache.get("a");
    cache.get("missing");

    let stats = cache.stats();
    assert_eq!(stats.hits, 3);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entry_count, 1);
    assert_eq!(stats.max_size, 50 * 1024 * 1024);
    assert_eq!(cache.hit_ratio(), 75.0);

    cache.get("missing");
    let later = cache.stats();
    assert!(later.hits >= stats.hits);
    assert!(later.misses > stats.misses);
}

#[test]
fn test_overwrite_does_not_duplicate() {
    let cache = cache();
    cache.set("k", json!("short"));
    cache.set("k", json!("a considerably longer value"));

    let stats = cache.stats();
    assert_eq!(stats.entry_count, 1);
    assert_eq!(stats.current_size, json!("a considerably longer value").to_string().len());
}

fn seeded() -> ContentCache<Value> {
    let cache = cache();
    cache.set("blog:en:post1", json!(1));
    cache.set("blog:fr:post1", json!(2));
    cache.set("story:en:story1", json!(3));
    cache
}

#[test]
fn test_glob_invalidation() {
    let cache = seeded();
    assert_eq!(cache.invalidate("blog:*"), 2);
    assert!(!cache.has("blog:en:post1"));
    assert!(!cache.has("blog:fr:post1"));
    assert!(cache.has("story:en:story1"));
}

#[test]
fn test_regex_invalidation() {
    let cache = seeded();
    let pattern = Regex::new(r"blog:.*:post1").unwrap();
    assert_eq!(cache.invalidate(&pattern), 2);
    assert_eq!(cache.stats().entry_count, 1);
}

#[test]
fn test_language_invalidation() {
    let cache = seeded();
    assert_eq!(cache.invalidate("*:en:*"), 2);
    assert!(cache.has("blog:fr:post1"));
}

#[test]
fn test_invalidation_without_match_returns_zero() {
    let cache = seeded();
    assert_eq!(cache.invalidate("offer*"), 0);
    assert_eq!(cache.stats().entry_count, 3);
}

#[test]
fn test_cleanup_counts_expired() {
    let cache = cache();
    cache.set_with_ttl("gone1", json!(1), Duration::ZERO);
    cache.set_with_ttl("gone2", json!(2), Duration::ZERO);
    cache.set("kept", json!(3));

    assert_eq!(cache.cleanup(), 2);
    assert_eq!(cache.stats().entry_count, 1);
}

#[test]
fn test_eviction_order_is_insertion_order() {
    let cache: ContentCache<Value> = ContentCache::with_limits(Duration::from_secs(60), 3, usize::MAX);
    for key in ["a", "b", "c", "d", "e"] {
        cache.set(key, json!(key));
    }

    assert_eq!(cache.keys(), vec!["c", "d", "e"]);
}

#[test]
fn test_size_bound_holds_after_insertions() {
    let max_size = 200;
    let cache: ContentCache<Value> = ContentCache::with_limits(Duration::from_secs(60), 1000, max_size);
    for i in 0..50 {
        cache.set(format!("k{i}"), json!(format!("value number {i}")));
        assert!(cache.stats().current_size <= max_size);
    }
    assert!(cache.has("k49"));
}

#[test]
fn test_key_derivation_determinism() {
    assert_eq!(keys::story("s", Some("fr")), "story:fr:s");
    assert_eq!(keys::stories(None), "stories:en:all");
    assert_eq!(keys::stories(None), keys::stories(Some("en")));
}

#[test]
fn test_concurrent_access_from_tasks() {
    let cache = Arc::new(cache());
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .build()
        .unwrap();

    runtime.block_on(async {
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    cache.set(format!("k{i}"), json!(i));
                    cache.get(&format!("k{i}"))
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Some(json!(i)));
        }
    });

    assert_eq!(cache.stats().entry_count, 16);
    assert_eq!(cache.stats().hits, 16);
}
