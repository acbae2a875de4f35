//! Fluent builder for workflow documents
//!
//! Provides a fluent API for constructing documents programmatically,
//! mainly for fixtures and tests.

use node_catalog::ConfigSchema;

use crate::types::{GraphEdge, GraphNode, Position, Viewport, WorkflowDocument};

/// Fluent builder for constructing workflow documents
///
/// # Example
///
/// ```ignore
/// let doc = WorkflowBuilder::new("My Workflow")
///     .add_node("trigger", "manual_trigger", (0.0, 0.0))
///     .add_node("fetch", "http_request", (200.0, 0.0))
///     .with_config("url", serde_json::json!("https://example.com"))
///     .add_edge("trigger", "out", "fetch", "in")
///     .build();
/// ```
pub struct WorkflowBuilder {
    document: WorkflowDocument,
}

impl WorkflowBuilder {
    /// Create a new workflow builder
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            document: WorkflowDocument::new(name),
        }
    }

    /// Mark the document as already persisted
    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.document.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.document.description = description.into();
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.document.tags.insert(tag.into());
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.document.viewport = Some(viewport);
        self
    }

    /// Add a node to the graph
    pub fn add_node(
        mut self,
        id: impl Into<String>,
        type_id: impl Into<String>,
        position: (f64, f64),
    ) -> Self {
        self.document
            .nodes
            .push(GraphNode::new(id, type_id, Position::from(position)));
        self
    }

    fn last_node(&mut self, edit: impl FnOnce(&mut GraphNode)) {
        if let Some(node) = self.document.nodes.last_mut() {
            edit(node);
        }
    }

    // The `with_*` node setters below apply to the most recently added node.

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.last_node(|n| n.display_data.name = name);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        let icon = icon.into();
        self.last_node(|n| n.display_data.icon = Some(icon));
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        let color = color.into();
        self.last_node(|n| n.display_data.color = Some(color));
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let key = key.into();
        self.last_node(|n| {
            n.display_data.config.insert(key, value);
        });
        self
    }

    pub fn with_schema(mut self, schema: ConfigSchema) -> Self {
        self.last_node(|n| n.display_data.config_schema = Some(schema));
        self
    }

    /// Add an edge between two nodes (id derived from the ports)
    pub fn add_edge(
        mut self,
        source: impl Into<String>,
        source_port: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        self.document
            .edges
            .push(GraphEdge::between(source, source_port, target, target_port));
        self
    }

    /// Build the document without validation
    pub fn build(self) -> WorkflowDocument {
        self.document
    }
}
