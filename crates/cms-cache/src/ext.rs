//! Extension trait for [`CacheBucket`] with typed convenience methods.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{CacheBucket, CacheError};

/// Typed convenience methods for [`CacheBucket`].
///
/// Provides `get_json`/`set_json` for serde-serializable types. These are
/// default methods on an extension trait so that [`CacheBucket`] stays
/// object-safe and implementors only handle raw bytes.
///
/// # Example
///
/// ```
/// use cms_cache::{Cache, CacheBucketExt, MemoryCache};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Rendered { slot: String }
///
/// let cache = MemoryCache::new();
/// let bucket = cache.bucket("placeholders");
///
/// bucket.set_json("area", "v1", &Rendered { slot: "content".into() }).unwrap();
/// let data: Option<Rendered> = bucket.get_json("area", "v1").unwrap();
/// assert_eq!(data.unwrap().slot, "content");
/// ```
pub trait CacheBucketExt: CacheBucket {
    /// Retrieve a JSON-deserialized value from the cache.
    ///
    /// Returns `Ok(None)` on cache miss or etag mismatch. A stored value that
    /// no longer deserializes is reported as [`CacheError::Codec`].
    fn get_json<T: DeserializeOwned>(&self, key: &str, etag: &str) -> Result<Option<T>, CacheError> {
        let Some(bytes) = self.get(key, etag)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Store a value as JSON in the cache.
    fn set_json<T: Serialize>(&self, key: &str, etag: &str, value: &T) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, etag, &bytes)
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}
