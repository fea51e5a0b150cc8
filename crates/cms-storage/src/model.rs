//! Records returned by the storage layer.
//!
//! These are request-scoped, read-only views of data owned by the content
//! management backend. The core never mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tenant identifier.
pub type SiteId = u32;

/// One page's content in one language.
///
/// `page_id` identifies the structural page shared by every translation;
/// `parent_page_id` is a weak reference to the parent structural page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentNode {
    /// Content record id (unique per language variant).
    pub id: u64,
    /// Site this page belongs to.
    pub site: SiteId,
    /// Structural page id.
    pub page_id: u64,
    /// Structural parent page id, `None` for top-level pages.
    #[serde(default)]
    pub parent_page_id: Option<u64>,
    /// Language code of this variant.
    pub language: String,
    pub title: String,
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub menu_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
    /// URL path without leading slash ("" for the home page).
    pub path: String,
    #[serde(default)]
    pub is_home: bool,
    /// Anonymous viewers never see this page.
    #[serde(default)]
    pub requires_login: bool,
    #[serde(default = "default_true")]
    pub in_navigation: bool,
    #[serde(default)]
    pub soft_root: bool,
    /// Menu position among siblings.
    #[serde(default)]
    pub position: u32,
    pub template: String,
    #[serde(default)]
    pub xframe_options: u8,
    #[serde(default)]
    pub limit_visibility_in_menu: Option<String>,
    /// Languages this page is translated into.
    #[serde(default)]
    pub languages: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Identity of a placeholder: owning model, owning object and slot name.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AreaKey {
    pub content_type_id: u32,
    pub object_id: u64,
    pub slot: String,
}

impl AreaKey {
    pub fn new(content_type_id: u32, object_id: u64, slot: impl Into<String>) -> Self {
        Self {
            content_type_id,
            object_id,
            slot: slot.into(),
        }
    }
}

impl std::fmt::Display for AreaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.content_type_id, self.object_id, self.slot)
    }
}

/// The record a placeholder is attached to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Subject {
    /// A page's language-specific content record.
    PageContent {
        page_id: u64,
        content_id: u64,
        template: String,
    },
    /// Any other record kind (e.g., a blog post or alias).
    Record {
        model: String,
        object_id: u64,
        #[serde(default)]
        template: Option<String>,
    },
}

impl Subject {
    /// Template whose declaration lists the eligible slots, if any.
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        match self {
            Self::PageContent { template, .. } => Some(template),
            Self::Record { template, .. } => template.as_deref(),
        }
    }
}

/// A named content area attached to a subject.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderRecord {
    pub key: AreaKey,
    /// Human-readable label; falls back to the slot name when absent.
    #[serde(default)]
    pub label: Option<String>,
    pub owner: Subject,
    /// Last modification of any content inside the placeholder.
    pub changed_at: DateTime<Utc>,
}

impl PlaceholderRecord {
    /// Label shown to clients.
    #[must_use]
    pub fn label(&self) -> String {
        self.label.clone().unwrap_or_else(|| {
            let mut chars = self.key.slot.replace('_', " ").chars().collect::<Vec<_>>();
            if let Some(first) = chars.first_mut() {
                *first = first.to_ascii_uppercase();
            }
            chars.into_iter().collect()
        })
    }
}

/// One flat plugin instance as stored.
///
/// `parent_id` links nested units; `position` orders siblings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitRecord {
    pub id: u64,
    /// Registered kind identifier (e.g., "`TextPlugin`").
    pub kind: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub position: u32,
    pub language: String,
    /// Kind-specific fields.
    #[serde(default)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder(slot: &str, label: Option<&str>) -> PlaceholderRecord {
        PlaceholderRecord {
            key: AreaKey::new(5, 1, slot),
            label: label.map(str::to_owned),
            owner: Subject::Record {
                model: "blog.post".to_owned(),
                object_id: 1,
                template: None,
            },
            changed_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_area_key_display() {
        assert_eq!(AreaKey::new(5, 42, "content").to_string(), "5/42/content");
    }

    #[test]
    fn test_label_falls_back_to_slot() {
        assert_eq!(placeholder("main_content", None).label(), "Main content");
        assert_eq!(placeholder("main", Some("Body")).label(), "Body");
    }

    #[test]
    fn test_subject_template() {
        let page = Subject::PageContent {
            page_id: 1,
            content_id: 2,
            template: "base.html".to_owned(),
        };
        assert_eq!(page.template(), Some("base.html"));
        assert_eq!(placeholder("x", None).owner.template(), None);
    }

    #[test]
    fn test_subject_deserializes_tagged() {
        let subject: Subject = serde_json::from_str(
            r#"{"kind": "page_content", "page_id": 1, "content_id": 3, "template": "t.html"}"#,
        )
        .unwrap();
        assert!(matches!(subject, Subject::PageContent { content_id: 3, .. }));
    }

    #[test]
    fn test_content_node_defaults() {
        let node: ContentNode = serde_json::from_str(
            r#"{
                "id": 1, "site": 1, "page_id": 10, "language": "en",
                "title": "Home", "path": "", "template": "base.html",
                "created_at": "2024-01-01T00:00:00Z",
                "changed_at": "2024-01-02T00:00:00Z"
            }"#,
        )
        .unwrap();
        assert!(node.in_navigation);
        assert!(!node.requires_login);
        assert_eq!(node.parent_page_id, None);
        assert_eq!(node.position, 0);
    }
}
