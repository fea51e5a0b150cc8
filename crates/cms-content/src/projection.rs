//! Wire representations of pages and placeholders.
//!
//! Field names are the public contract of the content API. Optional fields
//! serialize as `null` rather than being omitted.

use chrono::{DateTime, Utc};
use cms_storage::{AreaKey, ContentNode, SiteId};
use serde::Serialize;

use crate::placeholder::RenderMode;
use crate::units::RenderedUnit;

/// Path prefix of API routes.
pub const API_PREFIX: &str = "/api";

/// Maps a site to the scheme and host used in absolute links.
pub trait SiteResolver: Send + Sync {
    /// Base URL without trailing slash (e.g., `https://example.com`).
    fn base_url(&self, site: SiteId) -> Option<String>;
}

/// Site-relative URL of a page.
#[must_use]
pub fn page_url(language: &str, path: &str) -> String {
    if path.is_empty() {
        format!("/{language}/")
    } else {
        format!("/{language}/{path}/")
    }
}

/// Absolute URL of a placeholder's detail endpoint.
#[must_use]
pub fn placeholder_details_url(
    base_url: &str,
    language: &str,
    key: &AreaKey,
    mode: RenderMode,
) -> String {
    let url = format!(
        "{base_url}{API_PREFIX}/{language}/placeholders/{}/{}/{}/",
        key.content_type_id, key.object_id, key.slot
    );
    if mode.is_preview() {
        format!("{url}?preview=1")
    } else {
        url
    }
}

/// Page fields shared by tree and detail responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageView {
    pub title: String,
    /// Falls back to `title`.
    pub page_title: String,
    /// Falls back to `title`.
    pub menu_title: String,
    pub meta_description: Option<String>,
    pub redirect: Option<String>,
    pub in_navigation: bool,
    pub soft_root: bool,
    pub template: String,
    pub xframe_options: u8,
    pub limit_visibility_in_menu: Option<String>,
    pub language: String,
    pub path: String,
    pub absolute_url: String,
    pub is_home: bool,
    pub languages: Vec<String>,
    pub is_preview: bool,
    pub creation_date: DateTime<Utc>,
    pub changed_date: DateTime<Utc>,
}

impl PageView {
    #[must_use]
    pub fn new(node: &ContentNode, base_url: &str, mode: RenderMode) -> Self {
        Self {
            title: node.title.clone(),
            page_title: node.page_title.clone().unwrap_or_else(|| node.title.clone()),
            menu_title: node.menu_title.clone().unwrap_or_else(|| node.title.clone()),
            meta_description: node.meta_description.clone(),
            redirect: node.redirect.clone(),
            in_navigation: node.in_navigation,
            soft_root: node.soft_root,
            template: node.template.clone(),
            xframe_options: node.xframe_options,
            limit_visibility_in_menu: node.limit_visibility_in_menu.clone(),
            language: node.language.clone(),
            path: node.path.clone(),
            absolute_url: format!("{base_url}{}", page_url(&node.language, &node.path)),
            is_home: node.is_home,
            languages: node.languages.clone(),
            is_preview: mode.is_preview(),
            creation_date: node.created_at,
            changed_date: node.changed_at,
        }
    }
}

/// A page with its visible descendants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageTreeNode {
    #[serde(flatten)]
    pub page: PageView,
    pub children: Vec<PageTreeNode>,
}

/// Reference to a placeholder of a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlaceholderRelation {
    pub content_type_id: u32,
    pub object_id: u64,
    pub slot: String,
    pub details: String,
}

/// A page with its placeholder references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PageDetail {
    #[serde(flatten)]
    pub page: PageView,
    pub placeholders: Vec<PlaceholderRelation>,
}

/// A placeholder with rendered content.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlaceholderView {
    pub slot: String,
    pub label: String,
    /// Language the content is in, which may be a fallback.
    pub language: String,
    pub content: Vec<RenderedUnit>,
    pub details: String,
}
