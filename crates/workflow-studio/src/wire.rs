//! Wire format of the workflow service
//!
//! The service speaks snake_case JSON with its own field names
//! (`node_id`, `connections`, `view_state`). Conversions to and from
//! `WorkflowDocument` live here so nothing else depends on that shape.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use workflow_graph::{
    ConfigMap, GraphEdge, GraphNode, Position, Severity, ValidationIssue, ValidationReport,
    Viewport, WorkflowDocument,
};

/// Read `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Node position as the service stores it
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WirePosition {
    #[serde(default, deserialize_with = "null_as_default")]
    pub x: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub y: f64,
}

/// One node on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNode {
    #[serde(alias = "id")]
    pub node_id: String,
    #[serde(alias = "type", alias = "type_id")]
    pub node_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: ConfigMap,
    #[serde(default, deserialize_with = "null_as_default")]
    pub position: WirePosition,
    /// Sent explicitly so a reload does not have to re-derive it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// One connection on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireConnection {
    pub source_node: String,
    pub target_node: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_output: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_input: String,
}

/// Body of create, update and validate requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowPayload {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<WireNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub connections: Vec<WireConnection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_state: Option<Value>,
}

/// A workflow as returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    #[serde(alias = "workflow_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub nodes: Vec<WireNode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub connections: Vec<WireConnection>,
    #[serde(default)]
    pub view_state: Option<Value>,
}

impl From<&GraphNode> for WireNode {
    fn from(node: &GraphNode) -> Self {
        let display = &node.display_data;
        Self {
            node_id: node.id.clone(),
            node_type: node.type_id.clone(),
            name: display.name.clone(),
            description: display.description.clone(),
            config: display.config.clone(),
            position: WirePosition {
                x: node.position.x,
                y: node.position.y,
            },
            icon: display.icon.clone(),
            color: display.color.clone(),
        }
    }
}

impl From<WireNode> for GraphNode {
    fn from(wire: WireNode) -> Self {
        let mut node = GraphNode::new(
            wire.node_id,
            wire.node_type,
            Position::new(wire.position.x, wire.position.y),
        );
        node.display_data.name = wire.name;
        node.display_data.description = wire.description;
        node.display_data.config = wire.config;
        node.display_data.icon = wire.icon;
        node.display_data.color = wire.color;
        node
    }
}

impl From<&GraphEdge> for WireConnection {
    fn from(edge: &GraphEdge) -> Self {
        Self {
            source_node: edge.source_node_id.clone(),
            target_node: edge.target_node_id.clone(),
            source_output: edge.source_port.clone(),
            target_input: edge.target_port.clone(),
        }
    }
}

impl From<WireConnection> for GraphEdge {
    fn from(wire: WireConnection) -> Self {
        GraphEdge::between(
            wire.source_node,
            wire.source_output,
            wire.target_node,
            wire.target_input,
        )
    }
}

impl WorkflowPayload {
    /// Serialize a document, with the viewport captured for this save
    pub fn from_document(document: &WorkflowDocument, viewport: Option<Viewport>) -> Self {
        Self {
            name: document.name.clone(),
            description: document.description.clone(),
            category: document.category.clone(),
            tags: document.tags.iter().cloned().collect(),
            nodes: document.nodes.iter().map(WireNode::from).collect(),
            connections: document.edges.iter().map(WireConnection::from).collect(),
            view_state: viewport.map(view_state_for),
        }
    }
}

impl WorkflowRecord {
    pub fn viewport(&self) -> Option<Viewport> {
        self.view_state.as_ref().and_then(viewport_from_view_state)
    }

    /// Graph part of the record
    pub fn graph(&self) -> (Vec<GraphNode>, Vec<GraphEdge>) {
        (
            self.nodes.iter().cloned().map(GraphNode::from).collect(),
            self.connections
                .iter()
                .cloned()
                .map(GraphEdge::from)
                .collect(),
        )
    }

    pub fn into_document(self) -> WorkflowDocument {
        let viewport = self.viewport();
        let (nodes, edges) = self.graph();
        WorkflowDocument {
            workflow_id: Some(self.id),
            name: self.name,
            description: self.description,
            category: self.category,
            tags: self.tags.into_iter().collect::<BTreeSet<_>>(),
            nodes,
            edges,
            viewport,
        }
    }
}

fn view_state_for(viewport: Viewport) -> Value {
    serde_json::json!({ "viewport": viewport })
}

/// Read a viewport from `{"viewport": {x, y, zoom}}` or a flat `{x, y, zoom}`
pub fn viewport_from_view_state(view_state: &Value) -> Option<Viewport> {
    let candidate = view_state.get("viewport").unwrap_or(view_state);
    let zoom = candidate.get("zoom")?.as_f64()?;
    if !(zoom.is_finite() && zoom > 0.0) {
        return None;
    }
    Some(Viewport {
        x: candidate.get("x").and_then(Value::as_f64).unwrap_or(0.0),
        y: candidate.get("y").and_then(Value::as_f64).unwrap_or(0.0),
        zoom,
    })
}

/// Response of the validation endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValidationResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_valid: bool,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub warnings: Vec<Value>,
}

impl ValidationResponse {
    /// Map into the same report shape local validation produces
    pub fn into_report(self) -> ValidationReport {
        let issues = self
            .errors
            .iter()
            .map(|v| remote_issue(v, Severity::Error))
            .chain(self.warnings.iter().map(|v| remote_issue(v, Severity::Warning)));
        let mut report = ValidationReport::from_issues(issues);
        // The service may know of errors it did not itemize
        report.is_valid = self.is_valid && report.errors.is_empty();
        report.summary = self.summary;
        report
    }
}

fn remote_issue(value: &Value, fallback: Severity) -> ValidationIssue {
    let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
    let severity = match text("severity").as_deref() {
        Some("error") => Severity::Error,
        Some("warning") => Severity::Warning,
        Some("info") => Severity::Info,
        _ => fallback,
    };
    let message = match value {
        Value::String(s) => s.clone(),
        _ => text("message")
            .or_else(|| text("msg"))
            .unwrap_or_else(|| value.to_string()),
    };
    ValidationIssue {
        severity,
        code: text("code").unwrap_or_else(|| "remote".to_string()),
        message,
        node_id: text("node_id"),
        edge_id: text("edge_id").or_else(|| text("connection_id")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use workflow_graph::WorkflowBuilder;

    #[test]
    fn test_payload_carries_visual_metadata() {
        let doc = WorkflowBuilder::new("Digest")
            .with_tag("news")
            .add_node("trigger", "manual_trigger", (0.0, 0.0))
            .with_icon("▶")
            .with_color("#22c55e")
            .add_node("fetch", "http_request", (220.0, -40.0))
            .with_config("url", json!("https://feeds.example.com"))
            .add_edge("trigger", "out", "fetch", "in")
            .build();

        let payload = WorkflowPayload::from_document(&doc, Some(Viewport::default()));
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["nodes"][0]["node_id"], "trigger");
        assert_eq!(json["nodes"][0]["icon"], "▶");
        assert_eq!(json["nodes"][0]["color"], "#22c55e");
        assert!(json["nodes"][1].get("icon").is_none());
        assert_eq!(json["nodes"][1]["position"]["y"], -40.0);
        assert_eq!(json["connections"][0]["source_output"], "out");
        assert_eq!(json["view_state"]["viewport"]["zoom"], 1.0);
        assert_eq!(json["tags"][0], "news");
    }

    #[test]
    fn test_record_decodes_leniently() {
        let record: WorkflowRecord = serde_json::from_value(json!({
            "workflow_id": "wf-7",
            "name": "Loaded",
            "nodes": [
                {"id": "a", "type": "llm", "config": {"prompt": "hi"}},
                {"node_id": "b", "node_type": "output", "position": {"x": 5, "y": 6}}
            ],
            "connections": [
                {"source_node": "a", "target_node": "b", "source_output": "text", "target_input": "value"}
            ],
            "view_state": {"x": 12.5, "y": -3, "zoom": 0.75}
        }))
        .unwrap();

        let doc = record.into_document();
        assert_eq!(doc.workflow_id.as_deref(), Some("wf-7"));
        assert_eq!(doc.nodes[0].type_id, "llm");
        assert_eq!(doc.nodes[0].config()["prompt"], "hi");
        assert_eq!(doc.nodes[1].position, Position::new(5.0, 6.0));
        assert_eq!(doc.edges[0].id, "a:text->b:value");
        assert_eq!(
            doc.viewport,
            Some(Viewport {
                x: 12.5,
                y: -3.0,
                zoom: 0.75
            })
        );
    }

    #[test]
    fn test_null_fields_read_as_empty() {
        let record: WorkflowRecord = serde_json::from_value(json!({
            "id": "wf-9",
            "name": null,
            "description": null,
            "category": null,
            "tags": null,
            "nodes": [
                {"node_id": "a", "node_type": "output", "name": null, "description": null,
                 "config": null, "position": null, "icon": null}
            ],
            "connections": [
                {"source_node": "a", "target_node": "a", "source_output": null, "target_input": null}
            ],
            "view_state": null
        }))
        .unwrap();

        assert!(record.description.is_empty());
        assert!(record.tags.is_empty());
        assert!(record.nodes[0].config.is_empty());
        assert_eq!(record.nodes[0].position, WirePosition::default());
        assert!(record.nodes[0].icon.is_none());
        assert!(record.connections[0].source_output.is_empty());

        let empty: WorkflowRecord =
            serde_json::from_value(json!({"id": "wf-10", "nodes": null, "connections": null}))
                .unwrap();
        assert!(empty.nodes.is_empty());
        assert!(empty.connections.is_empty());

        let response: ValidationResponse =
            serde_json::from_value(json!({"is_valid": null, "errors": null})).unwrap();
        assert!(!response.is_valid);
        assert!(response.errors.is_empty());
    }

    #[test]
    fn test_invalid_view_state_is_ignored() {
        assert!(viewport_from_view_state(&json!({})).is_none());
        assert!(viewport_from_view_state(&json!({"viewport": {"zoom": 0}})).is_none());
        assert!(viewport_from_view_state(&json!({"zoom": "big"})).is_none());
    }

    #[test]
    fn test_validation_response_mapping() {
        let response: ValidationResponse = serde_json::from_value(json!({
            "is_valid": false,
            "summary": "1 error, 1 warning",
            "errors": [{"message": "Missing API key", "node_id": "llm-1", "code": "missing_credential"}],
            "warnings": ["Workflow has no trigger"]
        }))
        .unwrap();

        let report = response.into_report();
        assert!(!report.is_valid);
        assert_eq!(report.errors[0].node_id.as_deref(), Some("llm-1"));
        assert_eq!(report.errors[0].code, "missing_credential");
        assert_eq!(report.warnings[0].message, "Workflow has no trigger");
        assert_eq!(report.warnings[0].severity, Severity::Warning);
        assert_eq!(report.summary.as_deref(), Some("1 error, 1 warning"));
    }
}
