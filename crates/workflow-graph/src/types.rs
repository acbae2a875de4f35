//! Core types for workflow documents
//!
//! These types define the structure of the graph being edited:
//! nodes, edges, their presentation data and the document around them.

use std::collections::BTreeSet;

use node_catalog::ConfigSchema;
use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Config values of a node, keyed by field
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Canvas position of a node (unconstrained, may be negative)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Pan/zoom state of the canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

/// Presentation data and configuration carried by a node
///
/// `icon`, `color`, `category` and `config_schema` are `None` when the
/// node has never been given a value; enrichment fills them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub config: ConfigMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_schema: Option<ConfigSchema>,
}

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Unique within a graph, never reused
    pub id: NodeId,
    /// Join key into the node-type catalogue
    pub type_id: String,
    pub position: Position,
    pub display_data: DisplayData,
}

impl GraphNode {
    /// Create a node with empty display data
    pub fn new(id: impl Into<String>, type_id: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            position,
            display_data: DisplayData::default(),
        }
    }

    pub fn config(&self) -> &ConfigMap {
        &self.display_data.config
    }
}

/// An edge connecting an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source_node_id: NodeId,
    pub source_port: String,
    pub target_node_id: NodeId,
    pub target_port: String,
}

impl GraphEdge {
    /// Create an edge whose id is derived from its endpoints
    pub fn between(
        source: impl Into<String>,
        source_port: impl Into<String>,
        target: impl Into<String>,
        target_port: impl Into<String>,
    ) -> Self {
        let (source, source_port) = (source.into(), source_port.into());
        let (target, target_port) = (target.into(), target_port.into());
        Self {
            id: edge_id_for(&source, &source_port, &target, &target_port),
            source_node_id: source,
            source_port,
            target_node_id: target,
            target_port,
        }
    }

    /// Whether either endpoint is `node_id`
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }

    /// Whether two edges join the same ports
    pub fn same_ports(&self, other: &GraphEdge) -> bool {
        self.source_node_id == other.source_node_id
            && self.source_port == other.source_port
            && self.target_node_id == other.target_node_id
            && self.target_port == other.target_port
    }
}

/// Deterministic edge id for a pair of ports
pub fn edge_id_for(source: &str, source_port: &str, target: &str, target_port: &str) -> EdgeId {
    format!("{}:{}->{}:{}", source, source_port, target, target_port)
}

/// A complete workflow being edited
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    /// Assigned by the persistence service on first save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,
}

impl WorkflowDocument {
    /// Create a new, unsaved, empty document
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Find a node by ID (mutable)
    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut GraphNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn find_edge(&self, id: &str) -> Option<&GraphEdge> {
        self.edges.iter().find(|e| e.id == id)
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    /// Get edges coming into a node
    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.target_node_id == node_id)
    }

    /// Get edges going out of a node
    pub fn outgoing_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source_node_id == node_id)
    }

    /// Edges with `node_id` at either end
    pub fn incident_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.touches(node_id))
    }
}
