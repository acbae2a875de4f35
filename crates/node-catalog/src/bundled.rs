//! Node types shipped with the client
//!
//! The last link of the discovery chain. These definitions keep the
//! palette usable when no discovery endpoint is reachable.

use serde_json::json;

use crate::types::{ConfigField, ConfigFieldType, ConfigSchema, NodeType};

const BUNDLED_PLUGIN: &str = "builtin";
const BUNDLED_VERSION: &str = "1.0.0";

fn bundled(
    type_id: &str,
    display_name: &str,
    description: &str,
    icon: &str,
    color: &str,
    category: &str,
    fields: Vec<ConfigField>,
) -> NodeType {
    let config_schema = ConfigSchema::new(fields);
    NodeType {
        type_id: type_id.to_string(),
        display_name: display_name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        color: color.to_string(),
        category: category.to_string(),
        default_config: config_schema.defaults(),
        config_schema,
        plugin_id: BUNDLED_PLUGIN.to_string(),
        plugin_version: BUNDLED_VERSION.to_string(),
    }
}

/// The statically bundled catalogue
pub fn bundled_node_types() -> Vec<NodeType> {
    vec![
        bundled(
            "manual_trigger",
            "Manual Trigger",
            "Starts the workflow on demand",
            "▶",
            "#22c55e",
            "triggers",
            vec![],
        ),
        bundled(
            "webhook_trigger",
            "Webhook Trigger",
            "Starts the workflow when a webhook is called",
            "🪝",
            "#16a34a",
            "triggers",
            vec![ConfigField::new("path", "Path", ConfigFieldType::String).required()],
        ),
        bundled(
            "http_request",
            "HTTP Request",
            "Calls an HTTP endpoint",
            "🌐",
            "#3b82f6",
            "network",
            vec![
                ConfigField::new("url", "URL", ConfigFieldType::String).required(),
                ConfigField::new("method", "Method", ConfigFieldType::Select)
                    .with_default(json!("GET")),
            ],
        ),
        bundled(
            "llm_prompt",
            "LLM Prompt",
            "Sends a prompt to a language model",
            "🤖",
            "#8b5cf6",
            "ai",
            vec![
                ConfigField::new("prompt", "Prompt", ConfigFieldType::Text).required(),
                ConfigField::new("temperature", "Temperature", ConfigFieldType::Number)
                    .with_default(json!(0.7)),
            ],
        ),
        bundled(
            "text_transform",
            "Text Transform",
            "Applies a template to text",
            "✎",
            "#f59e0b",
            "transform",
            vec![ConfigField::new("template", "Template", ConfigFieldType::Text)],
        ),
        bundled(
            "condition",
            "Condition",
            "Routes data depending on an expression",
            "⑂",
            "#ef4444",
            "control",
            vec![ConfigField::new("expression", "Expression", ConfigFieldType::String).required()],
        ),
        bundled(
            "document_loader",
            "Document Loader",
            "Loads documents for downstream processing",
            "📄",
            "#0ea5e9",
            "data",
            vec![ConfigField::new("source", "Source", ConfigFieldType::String)],
        ),
        bundled(
            "output",
            "Output",
            "Collects the workflow result",
            "⏹",
            "#475569",
            "output",
            vec![],
        ),
    ]
}
