//! Node-type catalogue types
//!
//! A `NodeType` is the plugin-supplied, read-only description of a kind of
//! node: its identity, presentation metadata and configuration schema.
//! `typeId` is the only stable join key between a graph node and its type.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Value type of a configuration field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigFieldType {
    #[default]
    String,
    Text,
    Number,
    Integer,
    Boolean,
    Select,
    Json,
    Secret,
}

impl ConfigFieldType {
    /// Parse a loosely-typed field type name as plugins report it
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "text" | "textarea" | "multiline" => Self::Text,
            "number" | "float" | "double" => Self::Number,
            "integer" | "int" => Self::Integer,
            "boolean" | "bool" | "checkbox" => Self::Boolean,
            "select" | "enum" | "choice" => Self::Select,
            "json" | "object" | "array" => Self::Json,
            "secret" | "password" | "credential" => Self::Secret,
            _ => Self::String,
        }
    }
}

/// One configurable field of a node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigField {
    /// Key under which the value is stored in the node config
    pub key: String,
    /// Human-readable label
    pub label: String,
    /// Value type
    #[serde(default)]
    pub field_type: ConfigFieldType,
    /// Whether the node is incomplete without this value
    #[serde(default)]
    pub required: bool,
    /// Default value, if the plugin declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Allowed values for `Select` fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<serde_json::Value>,
}

impl ConfigField {
    pub fn new(key: impl Into<String>, label: impl Into<String>, field_type: ConfigFieldType) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            field_type,
            required: false,
            default: None,
            options: Vec::new(),
        }
    }

    /// Mark this field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set a default value for this field
    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// Structured description of a node type's configurable fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub fields: Vec<ConfigField>,
}

impl ConfigSchema {
    pub fn new(fields: Vec<ConfigField>) -> Self {
        Self { fields }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, key: &str) -> Option<&ConfigField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Fields that must carry a value
    pub fn required_fields(&self) -> impl Iterator<Item = &ConfigField> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Default config derived from the field defaults
    pub fn defaults(&self) -> serde_json::Map<String, serde_json::Value> {
        self.fields
            .iter()
            .filter_map(|f| f.default.clone().map(|v| (f.key.clone(), v)))
            .collect()
    }
}

/// A plugin-supplied node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeType {
    /// Globally unique, stable type identifier (e.g. "core.http_request")
    pub type_id: String,
    /// Human-readable name shown in the palette
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Glyph or URI, always sanitized
    pub icon: String,
    pub color: String,
    /// Palette group
    pub category: String,
    #[serde(default)]
    pub config_schema: ConfigSchema,
    #[serde(default)]
    pub default_config: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub plugin_id: String,
    #[serde(default)]
    pub plugin_version: String,
}

/// An ordered, de-duplicated list of node types from one discovery source
#[derive(Debug, Clone)]
pub struct Catalog {
    source: String,
    types: Vec<NodeType>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalogue, keeping the first occurrence of each type id
    pub fn new(source: impl Into<String>, types: Vec<NodeType>) -> Self {
        let mut index = HashMap::new();
        let mut unique = Vec::with_capacity(types.len());
        for ty in types {
            if index.contains_key(&ty.type_id) {
                log::debug!("Dropping duplicate node type '{}'", ty.type_id);
                continue;
            }
            index.insert(ty.type_id.clone(), unique.len());
            unique.push(ty);
        }
        Self {
            source: source.into(),
            types: unique,
            index,
        }
    }

    /// Identifier of the discovery source that produced this catalogue
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn types(&self) -> &[NodeType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Exact lookup by type id
    pub fn get(&self, type_id: &str) -> Option<&NodeType> {
        self.index.get(type_id).map(|&i| &self.types[i])
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.index.contains_key(type_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeType> {
        self.types.iter()
    }

    /// Node types grouped by category for palette rendering
    ///
    /// Groups are ordered by category name, entries by display name.
    pub fn by_category(&self) -> BTreeMap<&str, Vec<&NodeType>> {
        let mut grouped: BTreeMap<&str, Vec<&NodeType>> = BTreeMap::new();
        for ty in &self.types {
            grouped.entry(ty.category.as_str()).or_default().push(ty);
        }
        for entries in grouped.values_mut() {
            entries.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        }
        grouped
    }
}
