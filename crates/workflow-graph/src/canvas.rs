//! Canvas gestures
//!
//! Translates drag-and-drop, connect, delete and double-click gestures
//! into graph store mutations. The config and edge surfaces opened by a
//! double-click are views over the store: they read the live node or edge
//! on every call and write back through the store's mutation API.

use std::sync::Arc;

use node_catalog::{decode_node_type, Catalog, ConfigSchema, NodeType};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::enrich::{merge_display, NodeEnricher};
use crate::error::{GraphError, Result};
use crate::store::{GraphStore, RemovedNode};
use crate::types::{ConfigMap, EdgeId, GraphEdge, GraphNode, NodeId, Position};

/// Data carried from the palette to the canvas by a drag gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPayload {
    pub type_id: String,
    /// Serialized `NodeType` JSON
    #[serde(default)]
    pub definition: String,
}

impl DragPayload {
    /// Build the payload for a palette entry
    pub fn for_node_type(node_type: &NodeType) -> Result<Self> {
        Ok(Self {
            type_id: node_type.type_id.clone(),
            definition: serde_json::to_string(node_type)?,
        })
    }

    /// Decode the carried definition
    ///
    /// Returns `None` when the definition is missing, malformed, or
    /// describes a different type than the one carried.
    pub fn node_type(&self) -> Option<NodeType> {
        if self.definition.trim().is_empty() {
            return None;
        }
        let value: serde_json::Value = match serde_json::from_str(&self.definition) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Malformed drag definition for '{}': {}", self.type_id, e);
                return None;
            }
        };
        decode_node_type(&value).filter(|ty| ty.type_id == self.type_id)
    }
}

/// Turns canvas gestures into store mutations
pub struct CanvasController {
    store: Arc<GraphStore>,
    enricher: NodeEnricher,
    last_stamp: Mutex<i64>,
}

impl CanvasController {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self::with_enricher(store, NodeEnricher::new())
    }

    pub fn with_enricher(store: Arc<GraphStore>, enricher: NodeEnricher) -> Self {
        Self {
            store,
            enricher,
            last_stamp: Mutex::new(0),
        }
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn enricher(&self) -> &NodeEnricher {
        &self.enricher
    }

    /// Id for a new node: `<typeId>-<millis>`
    ///
    /// The millisecond stamp never repeats within one controller, and ids
    /// already present in the store (from a loaded document) are skipped.
    pub fn next_node_id(&self, type_id: &str) -> NodeId {
        let mut last = self.last_stamp.lock();
        let mut stamp = chrono::Utc::now().timestamp_millis().max(*last + 1);
        let mut id = format!("{}-{}", type_id, stamp);
        while self.store.node(&id).is_some() {
            stamp += 1;
            id = format!("{}-{}", type_id, stamp);
        }
        *last = stamp;
        id
    }

    /// Create a node from a drop gesture
    ///
    /// Resolves the type against `catalog` when one is available, else
    /// against the dragged definition. A malformed definition still yields
    /// a bare node of the carried type.
    pub fn drop_node(
        &self,
        payload: &DragPayload,
        position: Position,
        catalog: Option<&Catalog>,
    ) -> Result<NodeId> {
        let type_id = payload.type_id.trim();
        if type_id.is_empty() {
            return Err(GraphError::InvalidPayload("missing type id".to_string()));
        }

        let dragged = payload.node_type();
        let resolved = catalog
            .and_then(|c| self.enricher.resolve(c, type_id))
            .map(|(ty, _)| ty)
            .or(dragged.as_ref());

        let mut node = GraphNode::new(self.next_node_id(type_id), type_id, position);
        if let Some(ty) = resolved {
            node.display_data.config = ty.default_config.clone();
        }
        merge_display(&mut node.display_data, type_id, resolved);

        let node_id = node.id.clone();
        self.store.add_node(node)?;
        log::debug!("Dropped node '{}' at ({}, {})", node_id, position.x, position.y);
        Ok(node_id)
    }

    /// Connect an output port to an input port
    pub fn connect(
        &self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> Result<EdgeId> {
        self.store
            .add_edge(GraphEdge::between(source, source_port, target, target_port))
    }

    pub fn move_node(&self, node_id: &str, position: Position) -> Result<()> {
        self.store.move_node(node_id, position)
    }

    /// Delete a node together with its incident edges
    pub fn delete_node(&self, node_id: &str) -> Result<RemovedNode> {
        self.store.remove_node(node_id)
    }

    pub fn delete_edges(&self, edge_ids: &[EdgeId]) -> Result<Vec<GraphEdge>> {
        self.store.remove_edges(edge_ids)
    }

    /// Delete selected nodes and edges in one step
    pub fn delete_selection(
        &self,
        node_ids: &[NodeId],
        edge_ids: &[EdgeId],
    ) -> Result<(Vec<GraphNode>, Vec<GraphEdge>)> {
        self.store.remove_selection(node_ids, edge_ids)
    }

    /// Double-click on a node
    pub fn open_node_config(&self, node_id: &str) -> Result<NodeConfigSurface<'_>> {
        if self.store.node(node_id).is_none() {
            return Err(GraphError::NodeNotFound(node_id.to_string()));
        }
        Ok(NodeConfigSurface {
            store: &self.store,
            node_id: node_id.to_string(),
        })
    }

    /// Double-click on an edge
    pub fn open_edge_info(&self, edge_id: &str) -> Result<EdgeInfo<'_>> {
        if self.store.edge(edge_id).is_none() {
            return Err(GraphError::EdgeNotFound(edge_id.to_string()));
        }
        Ok(EdgeInfo {
            store: &self.store,
            edge_id: edge_id.to_string(),
        })
    }
}

/// Read/write view of one node's configuration
pub struct NodeConfigSurface<'a> {
    store: &'a GraphStore,
    node_id: NodeId,
}

impl NodeConfigSurface<'_> {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// The live node
    pub fn node(&self) -> Result<GraphNode> {
        self.store
            .node(&self.node_id)
            .ok_or_else(|| GraphError::NodeNotFound(self.node_id.clone()))
    }

    pub fn config(&self) -> Result<ConfigMap> {
        Ok(self.node()?.display_data.config)
    }

    pub fn schema(&self) -> Option<ConfigSchema> {
        self.store
            .read(|doc| doc.find_node(&self.node_id)?.display_data.config_schema.clone())
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.store
            .read(|doc| doc.find_node(&self.node_id)?.display_data.config.get(key).cloned())
    }

    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) -> Result<()> {
        self.store.update_node_config(&self.node_id, key, value)
    }

    pub fn clear(&self, key: &str) -> Result<()> {
        self.store.clear_node_config(&self.node_id, key)
    }

    pub fn rename(&self, name: impl Into<String>) -> Result<()> {
        self.store.rename_node(&self.node_id, name)
    }

    /// Required schema fields that currently have no value
    pub fn missing_required(&self) -> Vec<String> {
        let Some(schema) = self.schema() else {
            return Vec::new();
        };
        let config = self.config().unwrap_or_default();
        schema
            .required_fields()
            .filter(|f| config.get(&f.key).map_or(true, |v| v.is_null()))
            .map(|f| f.key.clone())
            .collect()
    }
}

/// Read-only view of one edge
pub struct EdgeInfo<'a> {
    store: &'a GraphStore,
    edge_id: EdgeId,
}

impl EdgeInfo<'_> {
    pub fn edge_id(&self) -> &str {
        &self.edge_id
    }

    pub fn edge(&self) -> Result<GraphEdge> {
        self.store
            .edge(&self.edge_id)
            .ok_or_else(|| GraphError::EdgeNotFound(self.edge_id.clone()))
    }

    pub fn source_node(&self) -> Option<GraphNode> {
        self.store.node(&self.edge().ok()?.source_node_id)
    }

    pub fn target_node(&self) -> Option<GraphNode> {
        self.store.node(&self.edge().ok()?.target_node_id)
    }

    /// One-line description, e.g. "Fetch (out) → Summarize (in)"
    pub fn describe(&self) -> Result<String> {
        let edge = self.edge()?;
        let label = |node_id: &str| {
            self.store
                .node(node_id)
                .map(|n| n.display_data.name)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| node_id.to_string())
        };
        Ok(format!(
            "{} ({}) → {} ({})",
            label(&edge.source_node_id),
            edge.source_port,
            label(&edge.target_node_id),
            edge.target_port
        ))
    }
}
