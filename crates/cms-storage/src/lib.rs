//! Content storage abstraction for the CMS content API.
//!
//! This crate provides a [`ContentStore`] trait that hides how pages,
//! placeholders and content units are persisted. The content layer only sees
//! flat records with parent references and assembles hierarchy itself.
//!
//! # Architecture
//!
//! The crate provides:
//! - [`ContentStore`] trait with read-only queries over one consistent snapshot
//! - [`Snapshot`] holding a complete dataset (itself a [`ContentStore`])
//! - [`JsonStore`] serving a snapshot file with mtime-based reloading
//! - [`MockStore`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use cms_storage::{ContentStore, JsonStore};
//!
//! let store = JsonStore::open("content.json")?;
//! for node in store.fetch_nodes_for_site(1, "en")? {
//!     println!("/{}: {}", node.path, node.title);
//! }
//! ```

mod json;
#[cfg(feature = "mock")]
mod mock;
mod model;
mod snapshot;
mod storage;

pub use json::JsonStore;
#[cfg(feature = "mock")]
pub use mock::MockStore;
pub use model::{AreaKey, ContentNode, PlaceholderRecord, SiteId, Subject, UnitRecord};
pub use snapshot::{Snapshot, StoredUnit};
pub use storage::{ContentStore, ErrorStatus, StorageError, StorageErrorKind};
