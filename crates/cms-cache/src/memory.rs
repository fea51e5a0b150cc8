//! In-process cache implementation.
//!
//! [`MemoryCache`] keeps every bucket in a single shared map guarded by a
//! `RwLock`. Buckets opened with the same name share their entries, so a
//! bucket handle can be dropped and reopened without losing data.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{Cache, CacheBucket, CacheError};

#[derive(Debug)]
struct Entry {
    etag: String,
    data: Vec<u8>,
}

type Buckets = HashMap<String, HashMap<String, Entry>>;

/// In-process [`Cache`] with no durability across restarts.
#[derive(Clone, Default)]
pub struct MemoryCache {
    buckets: Arc<RwLock<Buckets>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries stored in `bucket`.
    #[must_use]
    pub fn len(&self, bucket: &str) -> usize {
        self.buckets
            .read()
            .map(|buckets| buckets.get(bucket).map_or(0, HashMap::len))
            .unwrap_or(0)
    }

    /// Drop every entry in every bucket.
    pub fn clear(&self) {
        if let Ok(mut buckets) = self.buckets.write() {
            buckets.clear();
        }
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(MemoryCacheBucket {
            name: name.to_owned(),
            buckets: Arc::clone(&self.buckets),
        })
    }
}

struct MemoryCacheBucket {
    name: String,
    buckets: Arc<RwLock<Buckets>>,
}

fn poisoned() -> CacheError {
    CacheError::Unavailable("memory cache lock poisoned".to_owned())
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str, etag: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let buckets = self.buckets.read().map_err(|_| poisoned())?;
        let Some(entry) = buckets.get(&self.name).and_then(|b| b.get(key)) else {
            return Ok(None);
        };

        // Empty etag skips validation
        if !etag.is_empty() && entry.etag != etag {
            return Ok(None);
        }
        Ok(Some(entry.data.clone()))
    }

    fn set(&self, key: &str, etag: &str, value: &[u8]) -> Result<(), CacheError> {
        let mut buckets = self.buckets.write().map_err(|_| poisoned())?;
        buckets.entry(self.name.clone()).or_default().insert(
            key.to_owned(),
            Entry {
                etag: etag.to_owned(),
                data: value.to_vec(),
            },
        );
        Ok(())
    }

    fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut buckets = self.buckets.write().map_err(|_| poisoned())?;
        if let Some(bucket) = buckets.get_mut(&self.name) {
            bucket.remove(key);
        }
        Ok(())
    }
}
