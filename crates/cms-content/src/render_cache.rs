//! Memoized placeholder rendering.
//!
//! [`RenderCache`] stores rendered content in a [`CacheBucket`] keyed by
//! `(area, language, mode)` and stamped with the placeholder's modification
//! time. A stamp mismatch is a miss, so stale entries are recomputed on the
//! next request.
//!
//! # Concurrency
//!
//! Requests for the same key serialize on a per-key lock: the first computes
//! and stores, later ones wait and then hit. Different keys never wait on each
//! other. A render that fails or panics publishes nothing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use cms_cache::{Cache, CacheBucket, CacheBucketExt};
use cms_storage::AreaKey;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ContentError;
use crate::placeholder::RenderMode;

const BUCKET: &str = "placeholders";

/// Cache key for rendered placeholder content.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub area: AreaKey,
    pub language: String,
    pub mode: RenderMode,
}

impl RenderKey {
    #[must_use]
    pub fn new(area: &AreaKey, language: &str, mode: RenderMode) -> Self {
        Self {
            area: area.clone(),
            language: language.to_owned(),
            mode,
        }
    }
}

impl std::fmt::Display for RenderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.area, self.language, self.mode.as_str())
    }
}

type InFlight = Mutex<HashMap<String, Arc<Mutex<()>>>>;

/// Removes the key's in-flight lock once no request holds it.
struct InFlightSlot<'a> {
    in_flight: &'a InFlight,
    key: String,
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map's own reference is left
        if in_flight
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            in_flight.remove(&self.key);
        }
    }
}

/// Per-key memoization on top of a [`Cache`].
pub struct RenderCache {
    bucket: Box<dyn CacheBucket>,
    in_flight: InFlight,
}

impl RenderCache {
    /// Open the placeholder bucket of `cache`.
    #[must_use]
    pub fn new(cache: &dyn Cache) -> Self {
        Self {
            bucket: cache.bucket(BUCKET),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(key.to_owned()).or_default())
    }

    /// Return the cached value for `key` at `version`, or compute and store it.
    ///
    /// With `bypass` the cache is neither read nor written. Cache backend
    /// failures are logged and the value is computed directly.
    ///
    /// # Errors
    ///
    /// Returns whatever `render` returns; nothing is stored in that case.
    pub fn get_or_render<T, F>(
        &self,
        key: &RenderKey,
        version: &str,
        bypass: bool,
        render: F,
    ) -> Result<T, ContentError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, ContentError>,
    {
        if bypass {
            return render();
        }

        let key = key.to_string();
        // Dropped in reverse order: guard, then our reference, then the slot
        let _slot = InFlightSlot {
            in_flight: &self.in_flight,
            key: key.clone(),
        };
        let lock = self.key_lock(&key);
        // A poisoned lock means an earlier render panicked before storing
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        match self.bucket.get_json::<T>(&key, version) {
            Ok(Some(value)) => {
                tracing::debug!(%key, version, "Render cache hit");
                return Ok(value);
            }
            Ok(None) => tracing::debug!(%key, version, "Render cache miss"),
            Err(e) => tracing::warn!(%key, error = %e, "Render cache read failed"),
        }

        let start = Instant::now();
        let value = render()?;
        if let Err(e) = self.bucket.set_json(&key, version, &value) {
            tracing::warn!(%key, error = %e, "Render cache write failed");
        }
        tracing::debug!(
            %key,
            elapsed_ms = start.elapsed().as_millis(),
            "Rendered placeholder content"
        );
        Ok(value)
    }

    /// Drop the cached value for `key`.
    pub fn invalidate(&self, key: &RenderKey) {
        if let Err(e) = self.bucket.invalidate(&key.to_string()) {
            tracing::warn!(%key, error = %e, "Render cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    use cms_cache::{CacheError, MemoryCache, NullCacheBucket};

    use super::*;

    static_assertions::assert_impl_all!(RenderCache: Send, Sync);

    fn key(slot: &str) -> RenderKey {
        RenderKey::new(&AreaKey::new(5, 1, slot), "en", RenderMode::Published)
    }

    #[test]
    fn test_render_key_display() {
        assert_eq!(key("content").to_string(), "5/1/content/en/published");
    }

    #[test]
    fn test_hit_then_recompute_on_version_change() {
        let cache = RenderCache::new(&MemoryCache::new());
        let calls = AtomicUsize::new(0);
        let render = |value: u32| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ContentError>(value)
        };

        assert_eq!(cache.get_or_render(&key("a"), "v1", false, || render(1)).unwrap(), 1);
        assert_eq!(cache.get_or_render(&key("a"), "v1", false, || render(2)).unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(cache.get_or_render(&key("a"), "v2", false, || render(3)).unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_bypass_skips_lookup_and_store() {
        let memory = MemoryCache::new();
        let cache = RenderCache::new(&memory);

        cache.get_or_render(&key("a"), "v1", false, || Ok(1u32)).unwrap();
        assert_eq!(cache.get_or_render(&key("a"), "v1", true, || Ok(9u32)).unwrap(), 9);
        assert_eq!(cache.get_or_render(&key("b"), "v1", true, || Ok(2u32)).unwrap(), 2);
        assert_eq!(memory.len(BUCKET), 1);
    }

    #[test]
    fn test_failed_render_publishes_nothing() {
        let memory = MemoryCache::new();
        let cache = RenderCache::new(&memory);

        let result = cache.get_or_render::<u32, _>(&key("a"), "v1", false, || {
            Err(ContentError::Structural("boom".to_owned()))
        });
        assert!(result.is_err());
        assert_eq!(memory.len(BUCKET), 0);
        assert_eq!(cache.get_or_render(&key("a"), "v1", false, || Ok(4u32)).unwrap(), 4);
    }

    #[test]
    fn test_panicking_render_publishes_nothing() {
        let memory = MemoryCache::new();
        let cache = RenderCache::new(&memory);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.get_or_render::<u32, _>(&key("a"), "v1", false, || panic!("render failed"))
        }));
        assert!(outcome.is_err());
        assert_eq!(memory.len(BUCKET), 0);
        assert_eq!(cache.get_or_render(&key("a"), "v1", false, || Ok(5u32)).unwrap(), 5);
    }

    #[test]
    fn test_concurrent_requests_render_once() {
        let cache = RenderCache::new(&MemoryCache::new());
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(4);

        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    barrier.wait();
                    let value = cache
                        .get_or_render(&key("a"), "v1", false, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(50));
                            Ok(7u32)
                        })
                        .unwrap();
                    assert_eq!(value, 7);
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.in_flight.lock().unwrap().is_empty());
    }

    struct BrokenCache;

    struct BrokenBucket;

    impl CacheBucket for BrokenBucket {
        fn get(&self, _key: &str, _etag: &str) -> Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Unavailable("down".to_owned()))
        }

        fn set(&self, _key: &str, _etag: &str, _value: &[u8]) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_owned()))
        }

        fn invalidate(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("down".to_owned()))
        }
    }

    impl Cache for BrokenCache {
        fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
            Box::new(BrokenBucket)
        }
    }

    #[test]
    fn test_backend_failure_computes_directly() {
        let cache = RenderCache::new(&BrokenCache);
        assert_eq!(cache.get_or_render(&key("a"), "v1", false, || Ok(3u32)).unwrap(), 3);
        cache.invalidate(&key("a"));
    }

    #[test]
    fn test_null_bucket_always_renders() {
        let cache = RenderCache {
            bucket: Box::new(NullCacheBucket),
            in_flight: Mutex::new(HashMap::new()),
        };
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            cache
                .get_or_render(&key("a"), "v1", false, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(1u32)
                })
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
