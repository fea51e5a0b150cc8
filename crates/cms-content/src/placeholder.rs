//! Placeholder lookup and content rendering.

use cms_storage::{AreaKey, ContentStore, PlaceholderRecord, UnitRecord};
use serde::Serialize;

use crate::error::ContentError;
use crate::tree::{NavigationTree, OrderKey, RootSelector};
use crate::units::{RenderedUnit, UnitKindRegistry};

/// Which content state a request sees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Public view: only slots declared by the owner's template.
    #[default]
    Published,
    /// Editor view: every slot attached to the owner.
    Preview,
}

impl RenderMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Preview => "preview",
        }
    }

    #[must_use]
    pub fn is_preview(self) -> bool {
        self == Self::Preview
    }
}

/// Resolves placeholders against a store without caching.
pub struct PlaceholderResolver<'a> {
    store: &'a dyn ContentStore,
    registry: &'a UnitKindRegistry,
    max_depth: usize,
}

impl<'a> PlaceholderResolver<'a> {
    #[must_use]
    pub fn new(
        store: &'a dyn ContentStore,
        registry: &'a UnitKindRegistry,
        max_depth: usize,
    ) -> Self {
        Self {
            store,
            registry,
            max_depth,
        }
    }

    /// Whether the placeholder's slot is declared by its owner's template.
    ///
    /// Owners without a template accept every slot.
    ///
    /// # Errors
    ///
    /// Propagates storage failures.
    pub fn is_declared(&self, placeholder: &PlaceholderRecord) -> Result<bool, ContentError> {
        match placeholder.owner.template() {
            Some(template) => Ok(self
                .store
                .fetch_declared_slots(template)?
                .contains(&placeholder.key.slot)),
            None => Ok(true),
        }
    }

    /// Find a placeholder eligible in `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotFound`] if the placeholder is absent, or in
    /// published mode if its slot is no longer declared.
    pub fn locate(
        &self,
        key: &AreaKey,
        mode: RenderMode,
    ) -> Result<PlaceholderRecord, ContentError> {
        let placeholder = self
            .store
            .fetch_placeholder(key)?
            .ok_or_else(|| ContentError::NotFound(format!("placeholder {key}")))?;

        if !mode.is_preview() && !self.is_declared(&placeholder)? {
            return Err(ContentError::NotFound(format!(
                "placeholder {key} is not declared by its template"
            )));
        }
        Ok(placeholder)
    }

    /// Render the units of an area in exactly `language`.
    ///
    /// An area without units in that language renders as an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Structural`] for malformed unit trees and
    /// [`ContentError::UnsupportedKind`] for unregistered kinds.
    pub fn render_content(
        &self,
        key: &AreaKey,
        language: &str,
    ) -> Result<Vec<RenderedUnit>, ContentError> {
        let units: Vec<UnitRecord> = self
            .store
            .fetch_content_units(key, language)?
            .into_iter()
            .filter(|unit| unit.language == language)
            .collect();

        let tree = NavigationTree::build(units, OrderKey::Position)?;
        let nodes = tree.to_tree(&RootSelector::Root, self.max_depth)?;
        self.registry.render(&nodes)
    }
}
