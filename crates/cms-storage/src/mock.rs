//! Mock storage implementation for testing.
//!
//! Provides [`MockStore`] for unit testing without a snapshot file.

use std::collections::BTreeSet;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::model::{AreaKey, ContentNode, PlaceholderRecord, SiteId, Subject, UnitRecord};
use crate::snapshot::{Snapshot, StoredUnit};
use crate::storage::{ContentStore, StorageError};

/// Mock content store for testing.
///
/// Holds a [`Snapshot`] in memory. Use the builder methods to configure the
/// mock with test data and the `&self` mutators to change it mid-test.
///
/// # Example
///
/// ```ignore
/// use cms_storage::{ContentStore, MockStore};
///
/// let store = MockStore::new()
///     .with_node(MockStore::node(1, 10, None, "en", ""))
///     .with_template("base.html", ["content"]);
///
/// let nodes = store.fetch_nodes_for_site(1, "en").unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MockStore {
    snapshot: RwLock<Snapshot>,
    failing: AtomicBool,
    unit_fetches: AtomicUsize,
    unit_delay: RwLock<Option<Duration>>,
}

impl MockStore {
    /// Create a new empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a content node on site 1 with default fields.
    ///
    /// The title is `"Page {page_id}"`, the template `base.html`, and creation
    /// time grows with `id` so creation order follows ids.
    #[must_use]
    pub fn node(
        id: u64,
        page_id: u64,
        parent_page_id: Option<u64>,
        language: &str,
        path: &str,
    ) -> ContentNode {
        let created_at = DateTime::<Utc>::UNIX_EPOCH
            + TimeDelta::seconds(i64::try_from(id).unwrap_or(i64::MAX));
        ContentNode {
            id,
            site: 1,
            page_id,
            parent_page_id,
            language: language.to_owned(),
            title: format!("Page {page_id}"),
            page_title: None,
            menu_title: None,
            meta_description: None,
            redirect: None,
            path: path.to_owned(),
            is_home: path.is_empty(),
            requires_login: false,
            in_navigation: true,
            soft_root: false,
            position: 0,
            template: "base.html".to_owned(),
            xframe_options: 0,
            limit_visibility_in_menu: None,
            languages: vec![language.to_owned()],
            created_at,
            changed_at: created_at,
        }
    }

    /// Build a placeholder attached to a page content record.
    #[must_use]
    pub fn page_placeholder(node: &ContentNode, content_type_id: u32, slot: &str) -> PlaceholderRecord {
        PlaceholderRecord {
            key: AreaKey::new(content_type_id, node.id, slot),
            label: None,
            owner: Subject::PageContent {
                page_id: node.page_id,
                content_id: node.id,
                template: node.template.clone(),
            },
            changed_at: node.changed_at,
        }
    }

    /// Build a unit with an arbitrary JSON payload.
    ///
    /// # Panics
    ///
    /// Panics if `payload` is not a JSON object.
    #[must_use]
    pub fn unit(
        id: u64,
        kind: &str,
        parent_id: Option<u64>,
        position: u32,
        language: &str,
        payload: serde_json::Value,
    ) -> UnitRecord {
        let serde_json::Value::Object(payload) = payload else {
            panic!("unit payload must be a JSON object");
        };
        UnitRecord {
            id,
            kind: kind.to_owned(),
            parent_id,
            position,
            language: language.to_owned(),
            payload,
        }
    }

    /// Add a content node.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_node(self, node: ContentNode) -> Self {
        self.snapshot.write().unwrap().nodes.push(node);
        self
    }

    /// Add a placeholder.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_placeholder(self, placeholder: PlaceholderRecord) -> Self {
        self.snapshot.write().unwrap().placeholders.push(placeholder);
        self
    }

    /// Add a unit to an area.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_unit(self, area: &AreaKey, unit: UnitRecord) -> Self {
        self.push_unit(area, unit);
        self
    }

    /// Declare the slots of a template.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_template<I, S>(self, template: &str, slots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.snapshot
            .write()
            .unwrap()
            .templates
            .insert(template.to_owned(), slots.into_iter().map(Into::into).collect());
        self
    }

    /// Register an existing non-page record.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_record(self, model: &str, object_id: u64) -> Self {
        self.snapshot
            .write()
            .unwrap()
            .records
            .entry(model.to_owned())
            .or_default()
            .insert(object_id);
        self
    }

    /// Delay every unit fetch by `delay`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_unit_delay(self, delay: Duration) -> Self {
        *self.unit_delay.write().unwrap() = Some(delay);
        self
    }

    /// Add a unit after construction.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn push_unit(&self, area: &AreaKey, unit: UnitRecord) {
        self.snapshot.write().unwrap().units.push(StoredUnit {
            area: area.clone(),
            unit,
        });
    }

    /// Set a placeholder's modification time.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn touch_placeholder(&self, key: &AreaKey, changed_at: DateTime<Utc>) {
        let mut snapshot = self.snapshot.write().unwrap();
        for placeholder in snapshot.placeholders.iter_mut().filter(|p| &p.key == key) {
            placeholder.changed_at = changed_at;
        }
    }

    /// Remove a non-page record, as if it were deleted.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn remove_record(&self, model: &str, object_id: u64) {
        if let Some(ids) = self.snapshot.write().unwrap().records.get_mut(model) {
            ids.remove(&object_id);
        }
    }

    /// Make every query fail with an unavailable error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Number of unit fetches served so far.
    #[must_use]
    pub fn unit_fetches(&self) -> usize {
        self.unit_fetches.load(Ordering::Acquire)
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(StorageError::unavailable("mock failure").with_backend("Mock"));
        }
        Ok(())
    }
}

impl ContentStore for MockStore {
    fn fetch_nodes_for_site(
        &self,
        site: SiteId,
        language: &str,
    ) -> Result<Vec<ContentNode>, StorageError> {
        self.check()?;
        self.snapshot.read().unwrap().fetch_nodes_for_site(site, language)
    }

    fn fetch_node(&self, content_id: u64) -> Result<Option<ContentNode>, StorageError> {
        self.check()?;
        self.snapshot.read().unwrap().fetch_node(content_id)
    }

    fn fetch_placeholder(&self, key: &AreaKey) -> Result<Option<PlaceholderRecord>, StorageError> {
        self.check()?;
        self.snapshot.read().unwrap().fetch_placeholder(key)
    }

    fn fetch_page_placeholders(
        &self,
        content_id: u64,
    ) -> Result<Vec<PlaceholderRecord>, StorageError> {
        self.check()?;
        self.snapshot.read().unwrap().fetch_page_placeholders(content_id)
    }

    fn fetch_content_units(
        &self,
        key: &AreaKey,
        language: &str,
    ) -> Result<Vec<UnitRecord>, StorageError> {
        self.check()?;
        self.unit_fetches.fetch_add(1, Ordering::AcqRel);
        let delay = *self.unit_delay.read().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.snapshot.read().unwrap().fetch_content_units(key, language)
    }

    fn fetch_declared_slots(&self, template: &str) -> Result<BTreeSet<String>, StorageError> {
        self.check()?;
        self.snapshot.read().unwrap().fetch_declared_slots(template)
    }

    fn subject_exists(&self, model: &str, object_id: u64) -> Result<bool, StorageError> {
        self.check()?;
        self.snapshot.read().unwrap().subject_exists(model, object_id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::StorageErrorKind;

    #[test]
    fn test_mock_store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MockStore>();
    }

    #[test]
    fn test_node_helper_defaults() {
        let node = MockStore::node(3, 30, Some(10), "en", "about");
        assert_eq!(node.title, "Page 30");
        assert!(!node.is_home);
        assert!(MockStore::node(1, 10, None, "en", "").is_home);
        assert!(node.created_at > MockStore::node(1, 10, None, "en", "").created_at);
    }

    #[test]
    fn test_builder_and_queries() {
        let home = MockStore::node(1, 10, None, "en", "");
        let placeholder = MockStore::page_placeholder(&home, 5, "content");
        let key = placeholder.key.clone();
        let store = MockStore::new()
            .with_node(home)
            .with_placeholder(placeholder)
            .with_unit(&key, MockStore::unit(1, "TextPlugin", None, 0, "en", json!({"body": "x"})))
            .with_template("base.html", ["content"])
            .with_record("blog.post", 7);

        assert_eq!(store.fetch_nodes_for_site(1, "en").unwrap().len(), 1);
        assert!(store.fetch_placeholder(&key).unwrap().is_some());
        assert_eq!(store.fetch_content_units(&key, "en").unwrap().len(), 1);
        assert_eq!(store.unit_fetches(), 1);
        assert!(store.fetch_declared_slots("base.html").unwrap().contains("content"));
        assert!(store.subject_exists("blog.post", 7).unwrap());

        store.remove_record("blog.post", 7);
        assert!(!store.subject_exists("blog.post", 7).unwrap());
    }

    #[test]
    fn test_touch_placeholder() {
        let home = MockStore::node(1, 10, None, "en", "");
        let placeholder = MockStore::page_placeholder(&home, 5, "content");
        let key = placeholder.key.clone();
        let store = MockStore::new().with_placeholder(placeholder);

        let later = DateTime::<Utc>::UNIX_EPOCH + TimeDelta::days(1);
        store.touch_placeholder(&key, later);
        assert_eq!(store.fetch_placeholder(&key).unwrap().unwrap().changed_at, later);
    }

    #[test]
    fn test_failing_store() {
        let store = MockStore::new();
        store.set_failing(true);

        let err = store.fetch_nodes_for_site(1, "en").unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::Unavailable);

        store.set_failing(false);
        assert!(store.fetch_nodes_for_site(1, "en").unwrap().is_empty());
    }
}
