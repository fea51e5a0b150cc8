//! Cache abstraction layer for the CMS content API.
//!
//! This crate provides generic caching traits that decouple cache consumers
//! from the underlying storage mechanism. Two traits form the core API:
//!
//! - [`Cache`]: Factory for named cache buckets
//! - [`CacheBucket`]: Key-value store with etag-based invalidation
//!
//! Backends report failures as [`CacheError`]. Consumers treat the cache as an
//! optimization and fall back to direct computation on any error.
//!
//! # Implementations
//!
//! - [`NullCache`] / [`NullCacheBucket`]: No-op implementations (always miss)
//! - [`MemoryCache`]: In-process implementation shared across buckets
//!
//! # Example
//!
//! ```
//! use cms_cache::{Cache, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! let bucket = cache.bucket("placeholders");
//! bucket.set("1/5/content/en", "1700000000000", b"[]").unwrap();
//! assert_eq!(bucket.get("1/5/content/en", "1700000000000").unwrap(), Some(b"[]".to_vec()));
//! ```

mod ext;
mod memory;

pub use ext::CacheBucketExt;
pub use memory::MemoryCache;

/// Error reported by a cache backend.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Backend cannot be reached or refused the operation.
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    /// Stored value could not be encoded or decoded.
    #[error("cache value codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

/// A named partition within a [`Cache`].
///
/// Each bucket stores key-value pairs where values are invalidated by an etag.
/// The etag is an opaque string chosen by the caller (e.g., a modification
/// timestamp or version string). A cache hit occurs only when both the key
/// and etag match.
pub trait CacheBucket: Send + Sync {
    /// Retrieve a cached value.
    ///
    /// Returns `Ok(Some(value))` if the key exists **and** was stored with the
    /// same `etag`. Returns `Ok(None)` on cache miss or etag mismatch.
    ///
    /// If `etag` is an empty string, etag validation is skipped and the cached
    /// data is returned regardless of the stored etag.
    fn get(&self, key: &str, etag: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a value in the cache.
    ///
    /// Overwrites any existing entry for the same key, regardless of the
    /// previous etag.
    fn set(&self, key: &str, etag: &str, value: &[u8]) -> Result<(), CacheError>;

    /// Remove an entry. Removing a missing key is not an error.
    fn invalidate(&self, key: &str) -> Result<(), CacheError>;
}

/// Factory for named cache [`CacheBucket`]s.
///
/// A `Cache` produces buckets that are logically isolated from each other.
pub trait Cache: Send + Sync {
    /// Open or create a named bucket.
    ///
    /// Calling `bucket` multiple times with the same name returns handles
    /// that share the same underlying storage.
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// No-op [`CacheBucket`] that never stores or retrieves data.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str, _etag: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _etag: &str, _value: &[u8]) -> Result<(), CacheError> {
        Ok(())
    }

    fn invalidate(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// No-op [`Cache`] that always returns [`NullCacheBucket`]s.
///
/// Use when caching is disabled.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}
