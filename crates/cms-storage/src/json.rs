//! File-backed content store.
//!
//! [`JsonStore`] serves a [`Snapshot`] decoded from a single JSON document and
//! reloads it when the file's modification time changes.
//!
//! # Thread Safety
//!
//! - Queries clone the current `Arc<Snapshot>` and release the lock at once
//! - Reloads are serialized by a `Mutex<()>` and rechecked after acquiring it
//! - Readers holding an older snapshot keep using it until they finish

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Instant, SystemTime};

use crate::model::{AreaKey, ContentNode, PlaceholderRecord, SiteId, UnitRecord};
use crate::snapshot::Snapshot;
use crate::storage::{ContentStore, StorageError, StorageErrorKind};

const BACKEND: &str = "Json";

struct Loaded {
    snapshot: Arc<Snapshot>,
    mtime: SystemTime,
}

/// Content store reading a JSON snapshot file.
pub struct JsonStore {
    path: PathBuf,
    /// Mutex for serializing reload operations.
    reload_lock: Mutex<()>,
    /// Current snapshot (atomically swappable).
    current: RwLock<Loaded>,
}

impl JsonStore {
    /// Open the snapshot at `path`, loading it eagerly.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::Unavailable`] if the file cannot be read and
    /// [`StorageErrorKind::Corrupt`] if it does not decode.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let loaded = load(&path)?;
        Ok(Self {
            path,
            reload_lock: Mutex::new(()),
            current: RwLock::new(loaded),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current snapshot, reloading first if the file changed on disk.
    ///
    /// A failed reload returns the error and the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns an error if the file vanished or no longer decodes.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>, StorageError> {
        let mtime = modified(&self.path)?;

        // Fast path: file unchanged
        {
            let current = self.current.read().map_err(|_| poisoned())?;
            if current.mtime == mtime {
                return Ok(Arc::clone(&current.snapshot));
            }
        }

        // Slow path: serialize reloads, recheck after acquiring the lock
        let _guard = self.reload_lock.lock().map_err(|_| poisoned())?;
        {
            let current = self.current.read().map_err(|_| poisoned())?;
            if current.mtime == mtime {
                return Ok(Arc::clone(&current.snapshot));
            }
        }

        let loaded = load(&self.path)?;
        let snapshot = Arc::clone(&loaded.snapshot);
        *self.current.write().map_err(|_| poisoned())? = loaded;
        Ok(snapshot)
    }
}

fn poisoned() -> StorageError {
    StorageError::unavailable("snapshot lock poisoned").with_backend(BACKEND)
}

fn modified(path: &Path) -> Result<SystemTime, StorageError> {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| StorageError::io(e, path.display().to_string()).with_backend(BACKEND))
}

fn load(path: &Path) -> Result<Loaded, StorageError> {
    let start = Instant::now();
    let mtime = modified(path)?;
    let content = std::fs::read_to_string(path)
        .map_err(|e| StorageError::io(e, path.display().to_string()).with_backend(BACKEND))?;
    let snapshot = Snapshot::from_json(&content).map_err(|e| {
        StorageError::new(StorageErrorKind::Corrupt)
            .with_backend(BACKEND)
            .with_context(path.display().to_string())
            .with_source(e)
    })?;

    tracing::info!(
        path = %path.display(),
        nodes = snapshot.nodes.len(),
        placeholders = snapshot.placeholders.len(),
        units = snapshot.units.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Loaded content snapshot"
    );

    Ok(Loaded {
        snapshot: Arc::new(snapshot),
        mtime,
    })
}

impl ContentStore for JsonStore {
    fn fetch_nodes_for_site(
        &self,
        site: SiteId,
        language: &str,
    ) -> Result<Vec<ContentNode>, StorageError> {
        self.snapshot()?.fetch_nodes_for_site(site, language)
    }

    fn fetch_page(
        &self,
        site: SiteId,
        language: &str,
        path: &str,
    ) -> Result<Option<ContentNode>, StorageError> {
        self.snapshot()?.fetch_page(site, language, path)
    }

    fn fetch_node(&self, content_id: u64) -> Result<Option<ContentNode>, StorageError> {
        self.snapshot()?.fetch_node(content_id)
    }

    fn fetch_placeholder(&self, key: &AreaKey) -> Result<Option<PlaceholderRecord>, StorageError> {
        self.snapshot()?.fetch_placeholder(key)
    }

    fn fetch_page_placeholders(
        &self,
        content_id: u64,
    ) -> Result<Vec<PlaceholderRecord>, StorageError> {
        self.snapshot()?.fetch_page_placeholders(content_id)
    }

    fn fetch_content_units(
        &self,
        key: &AreaKey,
        language: &str,
    ) -> Result<Vec<UnitRecord>, StorageError> {
        self.snapshot()?.fetch_content_units(key, language)
    }

    fn fetch_declared_slots(&self, template: &str) -> Result<BTreeSet<String>, StorageError> {
        self.snapshot()?.fetch_declared_slots(template)
    }

    fn subject_exists(&self, model: &str, object_id: u64) -> Result<bool, StorageError> {
        self.snapshot()?.subject_exists(model, object_id)
    }
}
