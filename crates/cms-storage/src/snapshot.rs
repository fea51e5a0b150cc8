//! Point-in-time content dataset.
//!
//! A [`Snapshot`] holds every record a backend serves. Backends swap whole
//! snapshots, so each query observes one consistent state.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{AreaKey, ContentNode, PlaceholderRecord, SiteId, Subject, UnitRecord};
use crate::storage::{ContentStore, StorageError};

/// A unit together with the area it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredUnit {
    pub area: AreaKey,
    #[serde(flatten)]
    pub unit: UnitRecord,
}

/// Complete content dataset.
///
/// `templates` maps template names to their declared slots; `records` maps
/// non-page model names to the ids of records that still exist.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<ContentNode>,
    #[serde(default)]
    pub placeholders: Vec<PlaceholderRecord>,
    #[serde(default)]
    pub units: Vec<StoredUnit>,
    #[serde(default)]
    pub templates: HashMap<String, BTreeSet<String>>,
    #[serde(default)]
    pub records: HashMap<String, BTreeSet<u64>>,
}

impl Snapshot {
    /// Parse a snapshot from its JSON document.
    ///
    /// # Errors
    ///
    /// Returns the decoder error when the document is malformed.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}

impl ContentStore for Snapshot {
    fn fetch_nodes_for_site(
        &self,
        site: SiteId,
        language: &str,
    ) -> Result<Vec<ContentNode>, StorageError> {
        Ok(self
            .nodes
            .iter()
            .filter(|node| node.site == site && node.language == language)
            .cloned()
            .collect())
    }

    fn fetch_node(&self, content_id: u64) -> Result<Option<ContentNode>, StorageError> {
        Ok(self.nodes.iter().find(|node| node.id == content_id).cloned())
    }

    fn fetch_placeholder(&self, key: &AreaKey) -> Result<Option<PlaceholderRecord>, StorageError> {
        Ok(self.placeholders.iter().find(|p| &p.key == key).cloned())
    }

    fn fetch_page_placeholders(
        &self,
        content_id: u64,
    ) -> Result<Vec<PlaceholderRecord>, StorageError> {
        Ok(self
            .placeholders
            .iter()
            .filter(|p| {
                matches!(p.owner, Subject::PageContent { content_id: id, .. } if id == content_id)
            })
            .cloned()
            .collect())
    }

    fn fetch_content_units(
        &self,
        key: &AreaKey,
        language: &str,
    ) -> Result<Vec<UnitRecord>, StorageError> {
        Ok(self
            .units
            .iter()
            .filter(|stored| &stored.area == key && stored.unit.language == language)
            .map(|stored| stored.unit.clone())
            .collect())
    }

    fn fetch_declared_slots(&self, template: &str) -> Result<BTreeSet<String>, StorageError> {
        Ok(self.templates.get(template).cloned().unwrap_or_default())
    }

    fn subject_exists(&self, model: &str, object_id: u64) -> Result<bool, StorageError> {
        Ok(self
            .records
            .get(model)
            .is_some_and(|ids| ids.contains(&object_id)))
    }
}
