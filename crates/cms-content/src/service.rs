//! Request-level entry points of the content API.
//!
//! [`ContentService`] owns the language registry, the visibility filter, the
//! unit kind registry and the optional render cache, and combines them with a
//! [`ContentStore`] into the operations exposed to clients. Every denial
//! surfaces as [`ContentError::NotFound`].
//!
//! # Thread Safety
//!
//! The service is `Send + Sync` and meant to be shared behind an `Arc`.
//! Languages and settings live in one snapshot that
//! [`ContentService::reload`] replaces under a single lock. Each operation
//! reads the snapshot once, so requests already running keep the
//! configuration they started with.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use cms_cache::Cache;
use cms_config::Config;
use cms_storage::{AreaKey, ContentNode, ContentStore, PlaceholderRecord, SiteId};

use crate::error::ContentError;
use crate::language::{LanguageConfig, LanguageRegistry};
use crate::menu::{MenuNode, MenuRequest, build_menu};
use crate::placeholder::{PlaceholderResolver, RenderMode};
use crate::projection::{
    PageDetail, PageTreeNode, PageView, PlaceholderRelation, PlaceholderView, SiteResolver,
    placeholder_details_url,
};
use crate::render_cache::{RenderCache, RenderKey};
use crate::tree::{NavigationTree, OrderKey, RootSelector, TreeNode};
use crate::units::{PluginDefinition, RenderedUnit, UnitKindRegistry};
use crate::visibility::{ViewPolicy, Viewer, VisibilityFilter};

/// Per-call placeholder options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Skip the render cache for this call.
    pub bypass_cache: bool,
    /// Render unit content; when false only placeholder metadata is returned.
    pub render_content: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            bypass_cache: false,
            render_content: true,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Settings {
    max_depth: usize,
    order: OrderKey,
    cache_enabled: bool,
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            max_depth: config.tree.max_depth,
            order: config.tree.order.into(),
            cache_enabled: config.cache.enabled,
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn page_forest(nodes: &[TreeNode<'_, ContentNode>], base_url: &str) -> Vec<PageTreeNode> {
    nodes
        .iter()
        .map(|node| PageTreeNode {
            page: PageView::new(node.item, base_url, RenderMode::Published),
            children: page_forest(&node.children, base_url),
        })
        .collect()
}

/// Configuration a request runs against, swapped as a whole on reload.
#[derive(Debug)]
struct State {
    languages: LanguageRegistry,
    settings: Settings,
}

impl From<&Config> for State {
    fn from(config: &Config) -> Self {
        Self {
            languages: LanguageRegistry::new(&config.sites),
            settings: Settings::from(config),
        }
    }
}

impl State {
    /// Public lookups for published content; preview may use any configured
    /// language.
    fn request_language(
        &self,
        site: SiteId,
        code: &str,
        mode: RenderMode,
    ) -> Result<LanguageConfig, ContentError> {
        if mode.is_preview() {
            self.languages.resolve(site, code)
        } else {
            self.languages.resolve_public(site, code)
        }
    }
}

/// Content API over a [`ContentStore`].
pub struct ContentService {
    store: Arc<dyn ContentStore>,
    visibility: VisibilityFilter,
    registry: UnitKindRegistry,
    cache: Option<RenderCache>,
    site_resolver: Option<Arc<dyn SiteResolver>>,
    state: RwLock<Arc<State>>,
}

impl ContentService {
    /// Create a service with the built-in unit kinds, an allow-all policy and
    /// no render cache.
    #[must_use]
    pub fn new(store: Arc<dyn ContentStore>, config: &Config) -> Self {
        Self {
            store,
            visibility: VisibilityFilter::default(),
            registry: UnitKindRegistry::with_builtin(),
            cache: None,
            site_resolver: None,
            state: RwLock::new(Arc::new(State::from(config))),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn ViewPolicy>) -> Self {
        self.visibility = VisibilityFilter::new(policy);
        self
    }

    /// Memoize rendered placeholder content in `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: &dyn Cache) -> Self {
        self.cache = Some(RenderCache::new(cache));
        self
    }

    /// Resolve base URLs with `resolver` instead of the configured sites.
    #[must_use]
    pub fn with_site_resolver(mut self, resolver: Arc<dyn SiteResolver>) -> Self {
        self.site_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: UnitKindRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Apply a new configuration.
    ///
    /// Languages and settings are replaced together.
    pub fn reload(&self, config: &Config) {
        let start = Instant::now();
        let state = Arc::new(State::from(config));
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
        tracing::info!(
            sites = config.sites.len(),
            elapsed_ms = elapsed_ms(start),
            "Reloaded content configuration"
        );
    }

    fn state(&self) -> Arc<State> {
        Arc::clone(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn base_url(&self, state: &State, site: SiteId) -> Result<String, ContentError> {
        let url = match &self.site_resolver {
            Some(resolver) => resolver.base_url(site),
            None => state.languages.base_url(site),
        };
        url.ok_or_else(|| ContentError::Configuration(format!("no base URL for site {site}")))
    }

    fn check_preview(&self, viewer: &Viewer, mode: RenderMode) -> Result<(), ContentError> {
        if mode.is_preview() && !self.visibility.can_preview(viewer) {
            return Err(ContentError::NotFound("preview".to_owned()));
        }
        Ok(())
    }

    /// Nodes of a site visible to `viewer`, in storage order.
    fn visible_nodes(
        &self,
        site: SiteId,
        language: &str,
        viewer: &Viewer,
        max_depth: usize,
    ) -> Result<Vec<ContentNode>, ContentError> {
        let nodes = self.store.fetch_nodes_for_site(site, language)?;
        let keep = {
            let index: HashMap<u64, &ContentNode> =
                nodes.iter().map(|node| (node.page_id, node)).collect();
            let mut keep = Vec::with_capacity(nodes.len());
            for node in &nodes {
                keep.push(
                    self.visibility
                        .is_visible_with_ancestors(viewer, node, &index, max_depth)?,
                );
            }
            keep
        };

        Ok(nodes
            .into_iter()
            .zip(keep)
            .filter_map(|(node, visible)| visible.then_some(node))
            .collect())
    }

    /// A public language of `site`.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] for unknown or non-public codes.
    pub fn get_language_config(
        &self,
        site: SiteId,
        code: &str,
    ) -> Result<LanguageConfig, ContentError> {
        self.state().languages.resolve_public(site, code)
    }

    /// Every configured language of `site`.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Configuration`] if the site has no languages.
    pub fn languages(&self, site: SiteId) -> Result<Vec<LanguageConfig>, ContentError> {
        self.state().languages.languages(site)
    }

    /// The page forest of a site as seen by `viewer`.
    ///
    /// Pages hidden from the viewer are dropped together with their
    /// descendants. Pages whose parent is absent from storage become roots.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] for an unknown or non-public
    /// language and [`ContentError::Structural`] for cyclic or overly deep
    /// page structures.
    pub fn build_tree(
        &self,
        site: SiteId,
        language: &str,
        viewer: &Viewer,
    ) -> Result<Vec<PageTreeNode>, ContentError> {
        let state = self.state();
        let settings = state.settings;
        let language = state.languages.resolve_public(site, language)?;
        let base_url = self.base_url(&state, site)?;

        let nodes = self.visible_nodes(site, &language.code, viewer, settings.max_depth)?;
        let tree = NavigationTree::build(nodes, settings.order)?;
        let roots = tree.to_tree(&RootSelector::Root, settings.max_depth)?;
        Ok(page_forest(&roots, &base_url))
    }

    fn locate_visible(
        &self,
        resolver: &PlaceholderResolver<'_>,
        area: &AreaKey,
        viewer: &Viewer,
        mode: RenderMode,
        max_depth: usize,
    ) -> Result<PlaceholderRecord, ContentError> {
        self.check_preview(viewer, mode)?;
        let placeholder = resolver.locate(area, mode)?;
        if !self.visibility.is_visible_subject(
            viewer,
            &placeholder.owner,
            self.store.as_ref(),
            max_depth,
        )? {
            return Err(ContentError::NotFound(format!("placeholder {area}")));
        }
        Ok(placeholder)
    }

    fn render(
        &self,
        state: &State,
        resolver: &PlaceholderResolver<'_>,
        placeholder: &PlaceholderRecord,
        language: &str,
        mode: RenderMode,
        bypass: bool,
    ) -> Result<Vec<RenderedUnit>, ContentError> {
        let render = || resolver.render_content(&placeholder.key, language);
        match &self.cache {
            Some(cache) => {
                let key = RenderKey::new(&placeholder.key, language, mode);
                let version = placeholder.changed_at.timestamp_millis().to_string();
                let bypass = bypass || !state.settings.cache_enabled;
                cache.get_or_render(&key, &version, bypass, render)
            }
            None => render(),
        }
    }

    fn placeholder_view(
        &self,
        state: &State,
        site: SiteId,
        placeholder: &PlaceholderRecord,
        language: &str,
        mode: RenderMode,
        content: Vec<RenderedUnit>,
    ) -> Result<PlaceholderView, ContentError> {
        let base_url = self.base_url(state, site)?;
        Ok(PlaceholderView {
            slot: placeholder.key.slot.clone(),
            label: placeholder.label(),
            language: language.to_owned(),
            content,
            details: placeholder_details_url(&base_url, language, &placeholder.key, mode),
        })
    }

    /// A placeholder's content in exactly `language`.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] if the language, the placeholder or
    /// its owner is not available to `viewer`, or if preview is requested by
    /// a viewer without preview rights.
    pub fn resolve_placeholder(
        &self,
        site: SiteId,
        area: &AreaKey,
        language: &str,
        viewer: &Viewer,
        mode: RenderMode,
        options: ResolveOptions,
    ) -> Result<PlaceholderView, ContentError> {
        let state = self.state();
        let max_depth = state.settings.max_depth;
        let language = state.request_language(site, language, mode)?;
        let resolver = PlaceholderResolver::new(self.store.as_ref(), &self.registry, max_depth);
        let placeholder = self.locate_visible(&resolver, area, viewer, mode, max_depth)?;

        let content = if options.render_content {
            self.render(
                &state,
                &resolver,
                &placeholder,
                &language.code,
                mode,
                options.bypass_cache,
            )?
        } else {
            Vec::new()
        };
        self.placeholder_view(&state, site, &placeholder, &language.code, mode, content)
    }

    /// Like [`ContentService::resolve_placeholder`], but falls back along the
    /// language's fallback chain until a language with content is found.
    ///
    /// Languages with `hide_untranslated` never fall back. Non-public
    /// fallbacks are skipped. When no language has content the view is
    /// empty and reports the requested language.
    ///
    /// # Errors
    ///
    /// Same as [`ContentService::resolve_placeholder`].
    pub fn resolve_placeholder_with_fallback(
        &self,
        site: SiteId,
        area: &AreaKey,
        language: &str,
        viewer: &Viewer,
        mode: RenderMode,
        options: ResolveOptions,
    ) -> Result<PlaceholderView, ContentError> {
        let state = self.state();
        let max_depth = state.settings.max_depth;
        let requested = state.request_language(site, language, mode)?;
        let chain = if requested.hide_untranslated {
            vec![requested.clone()]
        } else {
            state.languages.fallback_chain(site, &requested.code)?
        };

        let resolver = PlaceholderResolver::new(self.store.as_ref(), &self.registry, max_depth);
        let placeholder = self.locate_visible(&resolver, area, viewer, mode, max_depth)?;
        if !options.render_content {
            return self.placeholder_view(
                &state,
                site,
                &placeholder,
                &requested.code,
                mode,
                Vec::new(),
            );
        }

        for candidate in chain
            .iter()
            .filter(|l| l.code == requested.code || l.public)
        {
            let content = self.render(
                &state,
                &resolver,
                &placeholder,
                &candidate.code,
                mode,
                options.bypass_cache,
            )?;
            if !content.is_empty() {
                if candidate.code != requested.code {
                    tracing::debug!(
                        area = %area,
                        requested = %requested.code,
                        used = %candidate.code,
                        "Placeholder content served from fallback language"
                    );
                }
                return self.placeholder_view(
                    &state,
                    site,
                    &placeholder,
                    &candidate.code,
                    mode,
                    content,
                );
            }
        }
        self.placeholder_view(&state, site, &placeholder, &requested.code, mode, Vec::new())
    }

    /// A page with references to its placeholders.
    ///
    /// Published mode lists only slots declared by the page template; preview
    /// lists every slot attached to the page content.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] if the page is missing or hidden
    /// from `viewer` (including through an ancestor).
    pub fn page_detail(
        &self,
        site: SiteId,
        language: &str,
        path: &str,
        viewer: &Viewer,
        mode: RenderMode,
    ) -> Result<PageDetail, ContentError> {
        self.check_preview(viewer, mode)?;
        let state = self.state();
        let max_depth = state.settings.max_depth;
        let language = state.request_language(site, language, mode)?;

        let node = self
            .store
            .fetch_page(site, &language.code, path)?
            .ok_or_else(|| ContentError::NotFound(format!("page {path:?}")))?;
        let nodes = self.store.fetch_nodes_for_site(site, &language.code)?;
        let index: HashMap<u64, &ContentNode> = nodes.iter().map(|n| (n.page_id, n)).collect();
        if !self
            .visibility
            .is_visible_with_ancestors(viewer, &node, &index, max_depth)?
        {
            return Err(ContentError::NotFound(format!("page {path:?}")));
        }

        let base_url = self.base_url(&state, site)?;
        let resolver = PlaceholderResolver::new(self.store.as_ref(), &self.registry, max_depth);
        let mut placeholders = Vec::new();
        for placeholder in self.store.fetch_page_placeholders(node.id)? {
            if !mode.is_preview() && !resolver.is_declared(&placeholder)? {
                continue;
            }
            placeholders.push(PlaceholderRelation {
                content_type_id: placeholder.key.content_type_id,
                object_id: placeholder.key.object_id,
                details: placeholder_details_url(&base_url, &language.code, &placeholder.key, mode),
                slot: placeholder.key.slot,
            });
        }

        Ok(PageDetail {
            page: PageView::new(&node, &base_url, mode),
            placeholders,
        })
    }

    /// A navigation menu for `viewer`.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] for an unknown language or menu
    /// root, and [`ContentError::Structural`] for malformed page structures.
    pub fn menu(
        &self,
        site: SiteId,
        language: &str,
        viewer: &Viewer,
        request: &MenuRequest,
    ) -> Result<Vec<MenuNode>, ContentError> {
        let state = self.state();
        let settings = state.settings;
        let language = state.languages.resolve_public(site, language)?;
        let nodes = self.visible_nodes(site, &language.code, viewer, settings.max_depth)?;
        let tree = NavigationTree::build(nodes, settings.order)?;
        build_menu(&tree, request, viewer, settings.max_depth)
    }

    /// Schemas of all registered unit kinds.
    #[must_use]
    pub fn plugin_definitions(&self) -> Vec<PluginDefinition> {
        self.registry.definitions()
    }
}
