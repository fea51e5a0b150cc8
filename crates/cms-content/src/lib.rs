//! Read-only content API core.
//!
//! This crate turns raw records from a [`ContentStore`] into the trees clients
//! consume:
//! - [`ContentService`]: request-level operations (languages, page trees,
//!   placeholders, page details, menus)
//! - [`NavigationTree`]: generic, depth-guarded tree assembly
//! - [`VisibilityFilter`]: login rule plus a pluggable [`ViewPolicy`]
//! - [`RenderCache`]: per-key memoization of rendered placeholder content
//!
//! # Quick Start
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use cms_cache::MemoryCache;
//! use cms_config::Config;
//! use cms_content::{ContentService, Viewer};
//! use cms_storage::JsonStore;
//!
//! let config = Config::load(None, None)?;
//! let store = Arc::new(JsonStore::open(&config.storage_resolved.data_file)?);
//! let service = ContentService::new(store, &config).with_cache(&MemoryCache::new());
//!
//! let tree = service.build_tree(1, "en", &Viewer::anonymous())?;
//! # Ok(())
//! # }
//! ```
//!
//! [`ContentStore`]: cms_storage::ContentStore

mod error;
mod language;
mod menu;
mod placeholder;
mod projection;
mod render_cache;
mod service;
mod tree;
mod units;
mod visibility;

pub use error::{ContentError, Outcome};
pub use language::{LanguageConfig, LanguageRegistry};
pub use menu::{MenuNode, MenuRequest, build_menu};
pub use placeholder::{PlaceholderResolver, RenderMode};
pub use projection::{
    API_PREFIX, PageDetail, PageTreeNode, PageView, PlaceholderRelation, PlaceholderView,
    SiteResolver, page_url, placeholder_details_url,
};
pub use render_cache::{RenderCache, RenderKey};
pub use service::{ContentService, ResolveOptions};
pub use tree::{NavigationTree, OrderKey, RootSelector, TreeItem, TreeNode};
pub use units::{
    FieldType, FieldsKind, PluginDefinition, RenderedUnit, UnitKind, UnitKindRegistry,
};
pub use visibility::{AllowAll, ViewPolicy, Viewer, VisibilityFilter, node_subject};
