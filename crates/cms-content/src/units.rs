//! Content unit kinds and rendering.
//!
//! Every stored [`UnitRecord`] names its kind. A [`UnitKindRegistry`] maps kind
//! identifiers to [`UnitKind`] implementations; rendering a unit of an
//! unregistered kind fails with [`ContentError::UnsupportedKind`].

use std::collections::BTreeMap;
use std::sync::Arc;

use cms_storage::UnitRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ContentError;
use crate::tree::TreeNode;

/// JSON type of a unit property.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
}

impl FieldType {
    /// JSON Schema type name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// A registered content unit kind.
pub trait UnitKind: Send + Sync {
    /// Kind identifier stored in [`UnitRecord::kind`].
    fn kind(&self) -> &str;

    /// Human-readable name.
    fn title(&self) -> &str;

    /// Declared properties with their JSON types.
    fn properties(&self) -> &[(String, FieldType)];

    /// Render a unit's own properties (children are handled by the registry).
    fn render(&self, unit: &UnitRecord) -> Result<Map<String, Value>, ContentError>;
}

/// A unit kind defined only by its property list.
///
/// Declared properties are copied from the payload, absent ones render as
/// `null`, and undeclared payload keys are dropped.
#[derive(Clone, Debug)]
pub struct FieldsKind {
    kind: String,
    title: String,
    properties: Vec<(String, FieldType)>,
}

impl FieldsKind {
    #[must_use]
    pub fn new(kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            title: title.into(),
            properties: Vec::new(),
        }
    }

    /// Declare a property.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.properties.push((name.into(), field_type));
        self
    }
}

impl UnitKind for FieldsKind {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn properties(&self) -> &[(String, FieldType)] {
        &self.properties
    }

    fn render(&self, unit: &UnitRecord) -> Result<Map<String, Value>, ContentError> {
        let mut out = Map::new();
        for (name, field_type) in &self.properties {
            let value = unit.payload.get(name).cloned().unwrap_or(Value::Null);
            if !value.is_null() && !field_type.accepts(&value) {
                return Err(ContentError::Structural(format!(
                    "unit {} field {name}: expected {}",
                    unit.id,
                    field_type.as_str()
                )));
            }
            out.insert(name.clone(), value);
        }
        Ok(out)
    }
}

/// Rendered unit as sent to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderedUnit {
    pub plugin_type: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RenderedUnit>,
}

/// Schema of a registered kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PluginDefinition {
    pub plugin_type: String,
    pub title: String,
    #[serde(rename = "type")]
    pub schema_type: &'static str,
    pub properties: BTreeMap<String, &'static str>,
}

/// Open registry of unit kinds keyed by identifier.
#[derive(Clone, Default)]
pub struct UnitKindRegistry {
    kinds: BTreeMap<String, Arc<dyn UnitKind>>,
}

impl UnitKindRegistry {
    /// Registry with no kinds.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in text, link, picture and column kinds.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(FieldsKind::new("TextPlugin", "Text").field("body", FieldType::String));
        registry.register(
            FieldsKind::new("LinkPlugin", "Link")
                .field("name", FieldType::String)
                .field("url", FieldType::String)
                .field("target", FieldType::String),
        );
        registry.register(
            FieldsKind::new("PicturePlugin", "Picture")
                .field("src", FieldType::String)
                .field("alt", FieldType::String)
                .field("width", FieldType::Integer)
                .field("height", FieldType::Integer),
        );
        registry.register(
            FieldsKind::new("ColumnsPlugin", "Columns")
                .field("columns", FieldType::Integer)
                .field("stacked", FieldType::Boolean),
        );
        registry
    }

    /// Add or replace a kind.
    pub fn register(&mut self, kind: impl UnitKind + 'static) {
        self.kinds.insert(kind.kind().to_owned(), Arc::new(kind));
    }

    /// Look up a kind.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::UnsupportedKind`] if `kind` is not registered.
    pub fn get(&self, kind: &str) -> Result<&dyn UnitKind, ContentError> {
        self.kinds
            .get(kind)
            .map(Arc::as_ref)
            .ok_or_else(|| ContentError::UnsupportedKind(kind.to_owned()))
    }

    /// Render assembled unit trees.
    ///
    /// # Errors
    ///
    /// Fails on the first unit whose kind is unknown or whose payload does not
    /// match its declared properties.
    pub fn render(
        &self,
        nodes: &[TreeNode<'_, UnitRecord>],
    ) -> Result<Vec<RenderedUnit>, ContentError> {
        nodes
            .iter()
            .map(|node| {
                let kind = self.get(&node.item.kind)?;
                Ok(RenderedUnit {
                    plugin_type: node.item.kind.clone(),
                    properties: kind.render(node.item)?,
                    children: self.render(&node.children)?,
                })
            })
            .collect()
    }

    /// Schemas of every registered kind, ordered by identifier.
    #[must_use]
    pub fn definitions(&self) -> Vec<PluginDefinition> {
        self.kinds
            .values()
            .map(|kind| PluginDefinition {
                plugin_type: kind.kind().to_owned(),
                title: kind.title().to_owned(),
                schema_type: "object",
                properties: kind
                    .properties()
                    .iter()
                    .map(|(name, field_type)| (name.clone(), field_type.as_str()))
                    .collect(),
            })
            .collect()
    }
}

impl std::fmt::Debug for UnitKindRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.kinds.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use cms_storage::MockStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::tree::{NavigationTree, OrderKey, RootSelector};

    fn render(units: Vec<UnitRecord>) -> Result<Vec<RenderedUnit>, ContentError> {
        let tree = NavigationTree::build(units, OrderKey::Position)?;
        let nodes = tree.to_tree(&RootSelector::Root, 16)?;
        UnitKindRegistry::with_builtin().render(&nodes)
    }

    #[test]
    fn test_render_nested_units_in_position_order() {
        let rendered = render(vec![
            MockStore::unit(1, "ColumnsPlugin", None, 0, "en", json!({"columns": 2})),
            MockStore::unit(3, "TextPlugin", Some(1), 1, "en", json!({"body": "right"})),
            MockStore::unit(2, "TextPlugin", Some(1), 0, "en", json!({"body": "left"})),
        ])
        .unwrap();

        assert_eq!(
            serde_json::to_value(&rendered).unwrap(),
            json!([{
                "plugin_type": "ColumnsPlugin",
                "columns": 2,
                "stacked": null,
                "children": [
                    {"plugin_type": "TextPlugin", "body": "left"},
                    {"plugin_type": "TextPlugin", "body": "right"}
                ]
            }])
        );
    }

    #[test]
    fn test_unknown_kind_is_unsupported() {
        let result = render(vec![MockStore::unit(1, "MapPlugin", None, 0, "en", json!({}))]);
        assert!(matches!(result, Err(ContentError::UnsupportedKind(kind)) if kind == "MapPlugin"));
    }

    #[test]
    fn test_wrong_field_type_is_structural() {
        let result = render(vec![MockStore::unit(
            1,
            "TextPlugin",
            None,
            0,
            "en",
            json!({"body": 5}),
        )]);
        assert!(matches!(result, Err(ContentError::Structural(_))));
    }

    #[test]
    fn test_undeclared_payload_dropped() {
        let rendered = render(vec![MockStore::unit(
            1,
            "TextPlugin",
            None,
            0,
            "en",
            json!({"body": "x", "secret": "y"}),
        )])
        .unwrap();
        assert!(!rendered[0].properties.contains_key("secret"));
    }

    #[test]
    fn test_custom_kind_registration() {
        struct Quote;

        impl UnitKind for Quote {
            fn kind(&self) -> &str {
                "QuotePlugin"
            }

            fn title(&self) -> &str {
                "Quote"
            }

            fn properties(&self) -> &[(String, FieldType)] {
                &[]
            }

            fn render(&self, unit: &UnitRecord) -> Result<Map<String, Value>, ContentError> {
                let mut out = Map::new();
                out.insert("id".to_owned(), Value::from(unit.id));
                Ok(out)
            }
        }

        let mut registry = UnitKindRegistry::empty();
        registry.register(Quote);
        assert!(registry.get("QuotePlugin").is_ok());
        assert!(registry.get("TextPlugin").is_err());
    }

    #[test]
    fn test_definitions() {
        let definitions = UnitKindRegistry::with_builtin().definitions();
        let link = definitions
            .iter()
            .find(|d| d.plugin_type == "LinkPlugin")
            .unwrap();

        assert_eq!(
            serde_json::to_value(link).unwrap(),
            json!({
                "plugin_type": "LinkPlugin",
                "title": "Link",
                "type": "object",
                "properties": {"name": "string", "target": "string", "url": "string"}
            })
        );
        assert_eq!(definitions.len(), 4);
    }
}
