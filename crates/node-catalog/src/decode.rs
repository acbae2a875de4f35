//! Lenient decoding of discovery payloads
//!
//! Plugins describe their node types in slightly different dialects, so
//! every entry is decoded on its own: a broken entry is skipped and logged,
//! it never poisons the rest of the response.

use serde_json::{Map, Value};

use crate::constants::glyphs;
use crate::error::{CatalogError, Result};
use crate::sanitize::{humanize_type_id, sanitize_color, sanitize_icon_value};
use crate::types::{ConfigField, ConfigFieldType, ConfigSchema, NodeType};

const TYPE_ID_KEYS: &[&str] = &["typeId", "type_id", "nodeType", "node_type", "type", "id"];
const NAME_KEYS: &[&str] = &["displayName", "display_name", "name", "label"];
const CATEGORY_KEYS: &[&str] = &["category", "group"];
const SCHEMA_KEYS: &[&str] = &["configSchema", "config_schema", "schema"];
const DEFAULTS_KEYS: &[&str] = &["defaultConfig", "default_config", "defaults"];
const PLUGIN_ID_KEYS: &[&str] = &["pluginId", "plugin_id", "plugin"];
const PLUGIN_VERSION_KEYS: &[&str] = &["pluginVersion", "plugin_version", "version"];

fn first<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k).filter(|v| !v.is_null()))
}

fn first_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| map.get(*k).and_then(|v| v.as_str()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Decode a `{ "nodes": [...] }` discovery response
///
/// A bare array is accepted as well. Returns the usable entries in
/// payload order; fails only when the envelope itself is malformed.
pub fn decode_payload(source_id: &str, payload: &Value) -> Result<Vec<NodeType>> {
    let entries = match payload {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("nodes") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(CatalogError::malformed(
                    source_id,
                    format!("'nodes' is {}, expected an array", kind(other)),
                ))
            }
            None => return Err(CatalogError::malformed(source_id, "missing 'nodes' field")),
        },
        other => {
            return Err(CatalogError::malformed(
                source_id,
                format!("payload is {}, expected an object", kind(other)),
            ))
        }
    };

    let mut types = Vec::with_capacity(entries.len());
    for (position, entry) in entries.iter().enumerate() {
        match decode_node_type(entry) {
            Some(ty) => types.push(ty),
            None => log::warn!(
                "Skipping undecodable node type #{} from '{}'",
                position,
                source_id
            ),
        }
    }
    Ok(types)
}

/// Decode a single node-type definition
///
/// Returns `None` when the entry has no usable type identifier. Missing
/// presentation fields are filled with neutral defaults.
pub fn decode_node_type(entry: &Value) -> Option<NodeType> {
    let map = entry.as_object()?;
    let type_id = first_str(map, TYPE_ID_KEYS)?.to_string();

    let display_name = first_str(map, NAME_KEYS)
        .map(str::to_string)
        .unwrap_or_else(|| humanize_type_id(&type_id));
    let description = first_str(map, &["description"]).unwrap_or_default().to_string();
    let icon = sanitize_icon_value(map.get("icon"));
    let color = first_str(map, &["color"])
        .map(sanitize_color)
        .unwrap_or_else(|| glyphs::DEFAULT_COLOR.to_string());
    let category = first_str(map, CATEGORY_KEYS)
        .unwrap_or(glyphs::DEFAULT_CATEGORY)
        .to_string();

    let config_schema = first(map, SCHEMA_KEYS)
        .map(decode_schema)
        .unwrap_or_default();
    let mut default_config = first(map, DEFAULTS_KEYS)
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();
    for (key, value) in config_schema.defaults() {
        default_config.entry(key).or_insert(value);
    }

    Some(NodeType {
        type_id,
        display_name,
        description,
        icon,
        color,
        category,
        config_schema,
        default_config,
        plugin_id: first_str(map, PLUGIN_ID_KEYS).unwrap_or_default().to_string(),
        plugin_version: first_str(map, PLUGIN_VERSION_KEYS)
            .unwrap_or_default()
            .to_string(),
    })
}

/// Decode a config schema in either supported dialect
///
/// - `{ "fields": [{ "key", "label", "type", "required", "default" }] }`
/// - JSON-Schema style `{ "properties": { key: {...} }, "required": [key] }`
pub fn decode_schema(value: &Value) -> ConfigSchema {
    let Some(map) = value.as_object() else {
        return ConfigSchema::default();
    };

    if let Some(Value::Array(fields)) = map.get("fields") {
        return ConfigSchema::new(fields.iter().filter_map(decode_field).collect());
    }

    let Some(Value::Object(properties)) = map.get("properties") else {
        return ConfigSchema::default();
    };
    let required: Vec<&str> = map
        .get("required")
        .and_then(|r| r.as_array())
        .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let fields = properties
        .iter()
        .map(|(key, prop)| {
            let prop = prop.as_object();
            let get = |k: &str| prop.and_then(|p| p.get(k));
            ConfigField {
                key: key.clone(),
                label: get("title")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_else(|| humanize_type_id(key)),
                field_type: get("type")
                    .and_then(|v| v.as_str())
                    .map(ConfigFieldType::from_name)
                    .unwrap_or_default(),
                required: required.contains(&key.as_str()),
                default: get("default").cloned(),
                options: get("enum")
                    .and_then(|v| v.as_array())
                    .cloned()
                    .unwrap_or_default(),
            }
        })
        .collect();
    ConfigSchema::new(fields)
}

fn decode_field(value: &Value) -> Option<ConfigField> {
    let map = value.as_object()?;
    let key = first_str(map, &["key", "name", "id"])?.to_string();
    Some(ConfigField {
        label: first_str(map, &["label", "title"])
            .map(str::to_string)
            .unwrap_or_else(|| humanize_type_id(&key)),
        field_type: first_str(map, &["type", "fieldType", "field_type"])
            .map(ConfigFieldType::from_name)
            .unwrap_or_default(),
        required: map.get("required").and_then(|v| v.as_bool()).unwrap_or(false),
        default: map.get("default").filter(|v| !v.is_null()).cloned(),
        options: map
            .get("options")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default(),
        key,
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
