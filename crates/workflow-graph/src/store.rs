//! The live graph store
//!
//! `GraphStore` is the single source of truth for an editing session.
//! Every mutation is one state transition: it runs under one write lock,
//! bumps the revision once and emits exactly one `GraphChanged` event after
//! the lock is released. Observers therefore never see a half-applied
//! change such as an edge whose endpoint node is already gone.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};
use crate::events::{EditorEvent, EventSink, GraphChange};
use crate::types::{
    ConfigMap, EdgeId, GraphEdge, GraphNode, NodeId, Position, Viewport, WorkflowDocument,
};
use crate::undo::{UndoStack, DEFAULT_UNDO_DEPTH};

/// Lifecycle of the editing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Fresh document, nothing loaded or added yet
    Empty,
    /// A document was loaded or a node was added
    Populated,
}

/// Document-level fields outside the graph itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub name: String,
    pub description: String,
    pub category: String,
    pub tags: BTreeSet<String>,
}

/// A node removed together with its incident edges
#[derive(Debug, Clone)]
pub struct RemovedNode {
    pub node: GraphNode,
    pub edges: Vec<GraphEdge>,
}

struct StoreInner {
    document: WorkflowDocument,
    state: SessionState,
    revision: u64,
    epoch: u64,
    undo: UndoStack,
}

impl StoreInner {
    fn record_snapshot(&mut self) {
        if let Err(e) = self.undo.push(&self.document) {
            log::warn!("Failed to record undo snapshot: {}", e);
        }
    }
}

/// The canonical in-memory model of the workflow being edited
pub struct GraphStore {
    inner: RwLock<StoreInner>,
    sink: Arc<dyn EventSink>,
}

impl GraphStore {
    /// Create an empty store with the default undo depth
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_undo_depth(sink, DEFAULT_UNDO_DEPTH)
    }

    pub fn with_undo_depth(sink: Arc<dyn EventSink>, undo_depth: usize) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                document: WorkflowDocument::default(),
                state: SessionState::Empty,
                revision: 0,
                epoch: 0,
                undo: UndoStack::new(undo_depth),
            }),
            sink,
        }
    }

    fn emit(&self, event: EditorEvent) {
        if let Err(e) = self.sink.send(event) {
            log::debug!("Dropped editor event: {}", e);
        }
    }

    /// Apply one state transition
    ///
    /// `apply` must check its preconditions before mutating, so an error
    /// leaves the document untouched.
    fn transition<R>(
        &self,
        record_undo: bool,
        apply: impl FnOnce(&mut WorkflowDocument) -> Result<(R, GraphChange)>,
    ) -> Result<R> {
        let (value, event) = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;
            if record_undo && inner.undo.is_empty() {
                inner.record_snapshot();
            }
            let (value, change) = apply(&mut inner.document)?;
            if record_undo {
                inner.record_snapshot();
            }
            inner.state = SessionState::Populated;
            inner.revision += 1;
            (
                value,
                EditorEvent::GraphChanged {
                    revision: inner.revision,
                    change,
                },
            )
        };
        self.emit(event);
        Ok(value)
    }

    // ---- queries ----

    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    /// Monotonic counter bumped by every transition
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    /// Run a read-only closure against the live document
    pub fn read<R>(&self, f: impl FnOnce(&WorkflowDocument) -> R) -> R {
        f(&self.inner.read().document)
    }

    /// Clone of the whole document
    pub fn snapshot(&self) -> WorkflowDocument {
        self.inner.read().document.clone()
    }

    /// Generation of the document; bumped when it is replaced wholesale
    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    /// Clone of the document together with its generation
    pub fn snapshot_with_epoch(&self) -> (WorkflowDocument, u64) {
        let inner = self.inner.read();
        (inner.document.clone(), inner.epoch)
    }

    pub fn nodes(&self) -> Vec<GraphNode> {
        self.read(|doc| doc.nodes.clone())
    }

    pub fn edges(&self) -> Vec<GraphEdge> {
        self.read(|doc| doc.edges.clone())
    }

    pub fn node(&self, id: &str) -> Option<GraphNode> {
        self.read(|doc| doc.find_node(id).cloned())
    }

    pub fn edge(&self, id: &str) -> Option<GraphEdge> {
        self.read(|doc| doc.find_edge(id).cloned())
    }

    pub fn node_count(&self) -> usize {
        self.read(|doc| doc.nodes.len())
    }

    pub fn edge_count(&self) -> usize {
        self.read(|doc| doc.edges.len())
    }

    pub fn workflow_id(&self) -> Option<String> {
        self.read(|doc| doc.workflow_id.clone())
    }

    pub fn metadata(&self) -> DocumentMetadata {
        self.read(|doc| DocumentMetadata {
            name: doc.name.clone(),
            description: doc.description.clone(),
            category: doc.category.clone(),
            tags: doc.tags.clone(),
        })
    }

    /// Current viewport, or the default when none was ever set
    pub fn viewport(&self) -> Viewport {
        self.read(|doc| doc.viewport.unwrap_or_default())
    }

    pub fn can_undo(&self) -> bool {
        self.inner.read().undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.read().undo.can_redo()
    }

    // ---- document lifecycle ----

    /// Replace the whole graph with a loaded document
    ///
    /// Clears undo history; the loaded state becomes the first snapshot.
    /// Connections to nodes the document does not contain are dropped.
    pub fn load_document(&self, mut document: WorkflowDocument) {
        let dropped = retain_connected(&document.nodes, &mut document.edges);
        if dropped > 0 {
            log::warn!(
                "Dropped {} connections to missing nodes while loading '{}'",
                dropped,
                document.name
            );
        }
        let event = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;
            let change = GraphChange::DocumentLoaded {
                node_count: document.nodes.len(),
                edge_count: document.edges.len(),
            };
            inner.document = document;
            inner.undo.clear();
            inner.record_snapshot();
            inner.state = SessionState::Populated;
            inner.revision += 1;
            inner.epoch += 1;
            EditorEvent::GraphChanged {
                revision: inner.revision,
                change,
            }
        };
        self.emit(event);
    }

    /// Start over with a new, unsaved document
    pub fn reset(&self, name: impl Into<String>) {
        let event = {
            let mut inner = self.inner.write();
            inner.document = WorkflowDocument::new(name);
            inner.undo.clear();
            inner.state = SessionState::Empty;
            inner.revision += 1;
            inner.epoch += 1;
            EditorEvent::GraphChanged {
                revision: inner.revision,
                change: GraphChange::DocumentLoaded {
                    node_count: 0,
                    edge_count: 0,
                },
            }
        };
        self.emit(event);
    }

    pub fn set_metadata(&self, metadata: DocumentMetadata) -> Result<()> {
        self.transition(true, |doc| {
            doc.name = metadata.name;
            doc.description = metadata.description;
            doc.category = metadata.category;
            doc.tags = metadata.tags;
            Ok(((), GraphChange::MetadataUpdated))
        })
    }

    /// Set the viewport without touching the graph revision
    pub fn set_viewport(&self, viewport: Viewport) {
        self.inner.write().document.viewport = Some(viewport);
        self.emit(EditorEvent::ViewportChanged { viewport });
    }

    // ---- node mutations ----

    pub fn add_node(&self, node: GraphNode) -> Result<()> {
        self.transition(true, |doc| {
            if doc.has_node(&node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
            let node_id = node.id.clone();
            doc.nodes.push(node);
            Ok(((), GraphChange::NodeAdded { node_id }))
        })
    }

    pub fn move_node(&self, node_id: &str, position: Position) -> Result<()> {
        self.transition(true, |doc| {
            let node = doc
                .find_node_mut(node_id)
                .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
            node.position = position;
            Ok((
                (),
                GraphChange::NodeMoved {
                    node_id: node_id.to_string(),
                },
            ))
        })
    }

    /// Set one config value on a node
    pub fn update_node_config(
        &self,
        node_id: &str,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Result<()> {
        let key = key.into();
        self.edit_node(node_id, |node| {
            node.display_data.config.insert(key, value);
        })
    }

    /// Remove one config value from a node
    pub fn clear_node_config(&self, node_id: &str, key: &str) -> Result<()> {
        self.edit_node(node_id, |node| {
            node.display_data.config.remove(key);
        })
    }

    /// Replace a node's whole config
    pub fn replace_node_config(&self, node_id: &str, config: ConfigMap) -> Result<()> {
        self.edit_node(node_id, |node| node.display_data.config = config)
    }

    /// Change a node's label
    pub fn rename_node(&self, node_id: &str, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.edit_node(node_id, |node| node.display_data.name = name)
    }

    fn edit_node(&self, node_id: &str, edit: impl FnOnce(&mut GraphNode)) -> Result<()> {
        self.transition(true, |doc| {
            let node = doc
                .find_node_mut(node_id)
                .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
            edit(node);
            Ok((
                (),
                GraphChange::NodeUpdated {
                    node_id: node_id.to_string(),
                },
            ))
        })
    }

    /// Remove a node and every edge touching it, as one transition
    pub fn remove_node(&self, node_id: &str) -> Result<RemovedNode> {
        self.transition(true, |doc| {
            let index = doc
                .nodes
                .iter()
                .position(|n| n.id == node_id)
                .ok_or_else(|| GraphError::NodeNotFound(node_id.to_string()))?;
            let node = doc.nodes.remove(index);
            let (edges, kept): (Vec<_>, Vec<_>) =
                doc.edges.drain(..).partition(|e| e.touches(node_id));
            doc.edges = kept;

            let change = GraphChange::NodeRemoved {
                node_id: node_id.to_string(),
                removed_edges: edges.iter().map(|e| e.id.clone()).collect(),
            };
            Ok((RemovedNode { node, edges }, change))
        })
    }

    /// Let a closure update nodes in place, recording which ones changed
    ///
    /// Used by enrichment: it runs against the nodes present at call time,
    /// so nodes added while a catalogue fetch was pending are covered and
    /// nodes deleted meanwhile are skipped. Not an undoable step: the same
    /// update is applied to every recorded snapshot, so stepping through
    /// history keeps the enriched display data.
    pub fn apply_display_updates(&self, mut update: impl FnMut(&mut GraphNode) -> bool) -> Vec<NodeId> {
        let event = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;
            let changed: Vec<NodeId> = inner
                .document
                .nodes
                .iter_mut()
                .filter_map(|node| update(node).then(|| node.id.clone()))
                .collect();
            if changed.is_empty() {
                return changed;
            }
            let rewritten = inner.undo.rewrite(|doc| {
                for node in doc.nodes.iter_mut() {
                    update(node);
                }
            });
            if let Err(e) = rewritten {
                log::warn!("Failed to carry display data into undo history: {}", e);
            }
            inner.revision += 1;
            (
                changed.clone(),
                EditorEvent::GraphChanged {
                    revision: inner.revision,
                    change: GraphChange::DisplayEnriched { node_ids: changed },
                },
            )
        };
        self.emit(event.1);
        event.0
    }

    // ---- edge mutations ----

    /// Add an edge between two existing nodes
    pub fn add_edge(&self, edge: GraphEdge) -> Result<EdgeId> {
        self.transition(true, |doc| {
            for endpoint in [&edge.source_node_id, &edge.target_node_id] {
                if !doc.has_node(endpoint) {
                    return Err(GraphError::DanglingEdge {
                        edge_id: edge.id.clone(),
                        node_id: endpoint.clone(),
                    });
                }
            }
            if edge.source_node_id == edge.target_node_id {
                return Err(GraphError::SelfLoop(edge.source_node_id));
            }
            if doc
                .edges
                .iter()
                .any(|e| e.id == edge.id || e.same_ports(&edge))
            {
                return Err(GraphError::DuplicateEdge(edge.id));
            }
            let edge_id = edge.id.clone();
            doc.edges.push(edge);
            Ok((edge_id.clone(), GraphChange::EdgeAdded { edge_id }))
        })
    }

    /// Remove a set of edges; ids not present are ignored
    pub fn remove_edges(&self, edge_ids: &[EdgeId]) -> Result<Vec<GraphEdge>> {
        let present = self.read(|doc| edge_ids.iter().any(|id| doc.find_edge(id).is_some()));
        if !present {
            return Ok(Vec::new());
        }
        let wanted: HashSet<&str> = edge_ids.iter().map(String::as_str).collect();
        self.transition(true, |doc| {
            let (removed, kept): (Vec<_>, Vec<_>) = doc
                .edges
                .drain(..)
                .partition(|e| wanted.contains(e.id.as_str()));
            doc.edges = kept;
            let change = GraphChange::EdgesRemoved {
                edge_ids: removed.iter().map(|e| e.id.clone()).collect(),
            };
            Ok((removed, change))
        })
    }

    /// Remove nodes (with their incident edges) and edges as one transition
    pub fn remove_selection(
        &self,
        node_ids: &[NodeId],
        edge_ids: &[EdgeId],
    ) -> Result<(Vec<GraphNode>, Vec<GraphEdge>)> {
        let node_set: HashSet<&str> = node_ids.iter().map(String::as_str).collect();
        let edge_set: HashSet<&str> = edge_ids.iter().map(String::as_str).collect();
        self.transition(true, |doc| {
            if let Some(missing) = node_ids.iter().find(|id| !doc.has_node(id)) {
                return Err(GraphError::NodeNotFound(missing.clone()));
            }
            let (nodes, kept_nodes): (Vec<_>, Vec<_>) = doc
                .nodes
                .drain(..)
                .partition(|n| node_set.contains(n.id.as_str()));
            doc.nodes = kept_nodes;
            let (edges, kept_edges): (Vec<_>, Vec<_>) =
                doc.edges.drain(..).partition(|e| {
                    edge_set.contains(e.id.as_str())
                        || node_set.contains(e.source_node_id.as_str())
                        || node_set.contains(e.target_node_id.as_str())
                });
            doc.edges = kept_edges;

            let change = GraphChange::SelectionRemoved {
                node_ids: nodes.iter().map(|n| n.id.clone()).collect(),
                edge_ids: edges.iter().map(|e| e.id.clone()).collect(),
            };
            Ok(((nodes, edges), change))
        })
    }

    // ---- persistence ----

    /// Install the outcome of a successful save
    ///
    /// `epoch` is the generation the saved snapshot was taken from. If the
    /// document has since been reset or reloaded, nothing is applied and
    /// `false` is returned. `adopted` replaces the graph only when
    /// reconciliation chose the server's copy and the local graph is still
    /// empty; otherwise the local graph is kept as-is.
    pub fn mark_saved(
        &self,
        epoch: u64,
        workflow_id: impl Into<String>,
        adopted: Option<(Vec<GraphNode>, Vec<GraphEdge>)>,
    ) -> bool {
        let workflow_id = workflow_id.into();
        let event = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;
            if inner.epoch != epoch {
                log::debug!(
                    "Document replaced since the save of '{}' started; not applying it",
                    workflow_id
                );
                return false;
            }
            let doc = &mut inner.document;
            doc.workflow_id = Some(workflow_id.clone());
            if let Some((nodes, mut edges)) = adopted {
                if doc.nodes.is_empty() {
                    retain_connected(&nodes, &mut edges);
                    doc.nodes = nodes;
                    doc.edges = edges;
                } else {
                    log::debug!("Nodes were added during the save; keeping the local graph");
                }
            }
            inner.state = SessionState::Populated;
            inner.revision += 1;
            EditorEvent::GraphChanged {
                revision: inner.revision,
                change: GraphChange::Reconciled { workflow_id },
            }
        };
        self.emit(event);
        true
    }

    // ---- history ----

    /// Step back one edit; returns false when there is nothing to undo
    pub fn undo(&self) -> Result<bool> {
        self.step_history(true)
    }

    /// Step forward one edit; returns false when there is nothing to redo
    pub fn redo(&self) -> Result<bool> {
        self.step_history(false)
    }

    fn step_history(&self, backwards: bool) -> Result<bool> {
        let event = {
            let mut guard = self.inner.write();
            let inner = &mut *guard;
            let step = if backwards {
                inner.undo.undo()
            } else {
                inner.undo.redo()
            };
            let Some(restored) = step else {
                return Ok(false);
            };
            let mut restored = restored?;
            // Identity and camera are not part of edit history
            restored.workflow_id = inner.document.workflow_id.clone();
            restored.viewport = inner.document.viewport;
            inner.document = restored;
            inner.revision += 1;
            EditorEvent::GraphChanged {
                revision: inner.revision,
                change: if backwards {
                    GraphChange::Undo
                } else {
                    GraphChange::Redo
                },
            }
        };
        self.emit(event);
        Ok(true)
    }
}

/// Keep only edges whose endpoints are both in `nodes`; returns how many went
fn retain_connected(nodes: &[GraphNode], edges: &mut Vec<GraphEdge>) -> usize {
    let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let before = edges.len();
    edges.retain(|e| {
        ids.contains(e.source_node_id.as_str()) && ids.contains(e.target_node_id.as_str())
    });
    before - edges.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::WorkflowBuilder;
    use crate::events::{EventError, VecEventSink};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{OnceLock, Weak};

    fn store() -> (Arc<GraphStore>, Arc<VecEventSink>) {
        let sink = Arc::new(VecEventSink::new());
        (Arc::new(GraphStore::new(sink.clone())), sink)
    }

    fn node(id: &str) -> GraphNode {
        GraphNode::new(id, "output", Position::default())
    }

    /// Sink that checks for dangling edges every time it is notified
    struct DanglingEdgeWatcher {
        store: OnceLock<Weak<GraphStore>>,
        checks: AtomicUsize,
        violations: AtomicUsize,
    }

    impl EventSink for DanglingEdgeWatcher {
        fn send(&self, _event: EditorEvent) -> std::result::Result<(), EventError> {
            if let Some(store) = self.store.get().and_then(Weak::upgrade) {
                self.checks.fetch_add(1, Ordering::SeqCst);
                let dangling = store.read(|doc| {
                    doc.edges.iter().any(|e| {
                        !doc.has_node(&e.source_node_id) || !doc.has_node(&e.target_node_id)
                    })
                });
                if dangling {
                    self.violations.fetch_add(1, Ordering::SeqCst);
                }
            }
            Ok(())
        }
    }

    #[test]
    fn test_empty_to_populated() {
        let (store, _) = store();
        assert_eq!(store.state(), SessionState::Empty);
        store.add_node(node("a")).unwrap();
        assert_eq!(store.state(), SessionState::Populated);
        store.remove_node("a").unwrap();
        assert_eq!(store.state(), SessionState::Populated);

        store.reset("Next");
        assert_eq!(store.state(), SessionState::Empty);
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let (store, sink) = store();
        store.add_node(node("a")).unwrap();
        assert!(matches!(
            store.add_node(node("a")),
            Err(GraphError::DuplicateNode(_))
        ));
        assert_eq!(sink.graph_changes().len(), 1);
    }

    #[test]
    fn test_remove_source_node_cascades_in_one_transition() {
        let (store, sink) = store();
        store.add_node(node("source")).unwrap();
        store.add_node(node("target")).unwrap();
        store
            .add_edge(GraphEdge::between("source", "out", "target", "in"))
            .unwrap();
        sink.clear();

        let removed = store.remove_node("source").unwrap();
        assert_eq!(removed.edges.len(), 1);

        assert!(store.node("target").is_some());
        assert!(store.edges().iter().all(|e| !e.touches("source")));
        assert_eq!(store.read(|doc| doc.incident_edges("target").count()), 0);

        let changes = sink.graph_changes();
        assert_eq!(changes.len(), 1);
        assert!(matches!(
            &changes[0],
            GraphChange::NodeRemoved { removed_edges, .. } if removed_edges.len() == 1
        ));
    }

    #[test]
    fn test_observers_never_see_dangling_edges() {
        let watcher = Arc::new(DanglingEdgeWatcher {
            store: OnceLock::new(),
            checks: AtomicUsize::new(0),
            violations: AtomicUsize::new(0),
        });
        let store = Arc::new(GraphStore::new(watcher.clone()));
        watcher.store.set(Arc::downgrade(&store)).unwrap();

        for id in ["a", "b", "c"] {
            store.add_node(node(id)).unwrap();
        }
        store.add_edge(GraphEdge::between("a", "out", "b", "in")).unwrap();
        store.add_edge(GraphEdge::between("b", "out", "c", "in")).unwrap();
        store.remove_node("b").unwrap();
        store
            .remove_selection(&["a".to_string()], &[])
            .unwrap();

        assert!(watcher.checks.load(Ordering::SeqCst) >= 7);
        assert_eq!(watcher.violations.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_add_edge_rejections() {
        let (store, _) = store();
        store.add_node(node("a")).unwrap();
        store.add_node(node("b")).unwrap();

        assert!(matches!(
            store.add_edge(GraphEdge::between("a", "out", "missing", "in")),
            Err(GraphError::DanglingEdge { .. })
        ));
        assert!(matches!(
            store.add_edge(GraphEdge::between("a", "out", "a", "in")),
            Err(GraphError::SelfLoop(_))
        ));
        store.add_edge(GraphEdge::between("a", "out", "b", "in")).unwrap();
        assert!(matches!(
            store.add_edge(GraphEdge::between("a", "out", "b", "in")),
            Err(GraphError::DuplicateEdge(_))
        ));
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_remove_edge_set() {
        let (store, sink) = store();
        let doc = WorkflowBuilder::new("wf")
            .add_node("a", "manual_trigger", (0.0, 0.0))
            .add_node("b", "output", (100.0, 0.0))
            .add_node("c", "output", (100.0, 100.0))
            .add_edge("a", "out", "b", "in")
            .add_edge("a", "out", "c", "in")
            .build();
        let ids: Vec<EdgeId> = doc.edges.iter().map(|e| e.id.clone()).collect();
        store.load_document(doc);
        sink.clear();

        let removed = store
            .remove_edges(&[ids[0].clone(), "unknown".to_string()])
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(store.edge_count(), 1);
        assert_eq!(sink.graph_changes().len(), 1);

        assert!(store.remove_edges(&["unknown".to_string()]).unwrap().is_empty());
        assert_eq!(sink.graph_changes().len(), 1);
    }

    #[test]
    fn test_config_edits_and_move() {
        let (store, _) = store();
        store.add_node(node("a")).unwrap();
        store
            .update_node_config("a", "url", serde_json::json!("https://x"))
            .unwrap();
        store.move_node("a", Position::new(-40.0, -12.5)).unwrap();
        store.rename_node("a", "Fetch").unwrap();

        let a = store.node("a").unwrap();
        assert_eq!(a.config()["url"], "https://x");
        assert_eq!(a.position, Position::new(-40.0, -12.5));
        assert_eq!(a.display_data.name, "Fetch");

        store.clear_node_config("a", "url").unwrap();
        assert!(store.node("a").unwrap().config().is_empty());
        assert!(matches!(
            store.move_node("zzz", Position::default()),
            Err(GraphError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_display_updates_only_report_changes() {
        let (store, sink) = store();
        store.add_node(node("a")).unwrap();
        store.add_node(node("b")).unwrap();
        sink.clear();

        let changed = store.apply_display_updates(|n| {
            if n.id == "a" {
                n.display_data.icon = Some("★".to_string());
                true
            } else {
                false
            }
        });
        assert_eq!(changed, vec!["a".to_string()]);
        assert_eq!(sink.graph_changes().len(), 1);

        assert!(store.apply_display_updates(|_| false).is_empty());
        assert_eq!(sink.graph_changes().len(), 1);
    }

    #[test]
    fn test_undo_redo_keeps_workflow_id() {
        let (store, _) = store();
        store.add_node(node("a")).unwrap();
        store.add_node(node("b")).unwrap();
        assert!(store.mark_saved(store.epoch(), "wf-1", None));

        assert!(store.undo().unwrap());
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.workflow_id().as_deref(), Some("wf-1"));

        assert!(store.redo().unwrap());
        assert_eq!(store.node_count(), 2);
        assert!(!store.redo().unwrap());
    }

    #[test]
    fn test_load_document_resets_history() {
        let (store, _) = store();
        store.add_node(node("a")).unwrap();
        store.add_node(node("b")).unwrap();
        store.load_document(WorkflowDocument::new("Loaded"));
        assert!(!store.can_undo());
        assert_eq!(store.metadata().name, "Loaded");
    }

    #[test]
    fn test_load_drops_connections_to_missing_nodes() {
        let (store, sink) = store();
        let mut doc = WorkflowBuilder::new("Partial")
            .add_node("a", "manual_trigger", (0.0, 0.0))
            .add_node("b", "output", (200.0, 0.0))
            .add_edge("a", "out", "b", "in")
            .build();
        doc.edges.push(GraphEdge::between("a", "out", "ghost", "in"));
        doc.edges.push(GraphEdge::between("ghost", "out", "b", "in"));
        sink.clear();

        store.load_document(doc);
        assert_eq!(store.edge_count(), 1);
        assert!(store.edges().iter().all(|e| !e.touches("ghost")));
        assert!(matches!(
            &sink.graph_changes()[0],
            GraphChange::DocumentLoaded { node_count: 2, edge_count: 1 }
        ));
    }

    #[test]
    fn test_enrichment_survives_undo() {
        let (store, _) = store();
        store.add_node(node("a")).unwrap();
        store.apply_display_updates(|n| {
            if n.display_data.icon.is_none() {
                n.display_data.icon = Some("★".to_string());
                true
            } else {
                false
            }
        });
        store.move_node("a", Position::new(50.0, 50.0)).unwrap();

        assert!(store.undo().unwrap());
        let a = store.node("a").unwrap();
        assert_eq!(a.position, Position::default());
        assert_eq!(a.display_data.icon.as_deref(), Some("★"));

        assert!(store.redo().unwrap());
        assert_eq!(store.node("a").unwrap().display_data.icon.as_deref(), Some("★"));
    }

    #[test]
    fn test_mark_saved_ignores_replaced_document() {
        let (store, _) = store();
        store.add_node(node("a")).unwrap();
        let (_, epoch) = store.snapshot_with_epoch();

        store.reset("Brand new");
        assert_ne!(store.epoch(), epoch);
        assert!(!store.mark_saved(epoch, "wf-1", Some((vec![node("a")], Vec::new()))));
        assert_eq!(store.workflow_id(), None);
        assert_eq!(store.node_count(), 0);
        assert_eq!(store.metadata().name, "Brand new");
        assert_eq!(store.state(), SessionState::Empty);
    }

    #[test]
    fn test_adoption_only_into_empty_graph() {
        let (store, _) = store();
        let server = vec![node("a"), node("b")];
        let edges = vec![
            GraphEdge::between("a", "out", "b", "in"),
            GraphEdge::between("a", "out", "ghost", "in"),
        ];

        assert!(store.mark_saved(store.epoch(), "wf-1", Some((server.clone(), edges.clone()))));
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 1);

        store.reset("Other");
        store.add_node(node("local")).unwrap();
        assert!(store.mark_saved(store.epoch(), "wf-2", Some((server, edges))));
        assert_eq!(store.nodes().len(), 1);
        assert!(store.node("local").is_some());
        assert_eq!(store.workflow_id().as_deref(), Some("wf-2"));
    }

    #[test]
    fn test_viewport_does_not_bump_revision() {
        let (store, sink) = store();
        let before = store.revision();
        store.set_viewport(Viewport {
            x: 10.0,
            y: -20.0,
            zoom: 1.5,
        });
        assert_eq!(store.revision(), before);
        assert_eq!(store.viewport().zoom, 1.5);
        assert!(matches!(
            sink.events().last(),
            Some(EditorEvent::ViewportChanged { .. })
        ));
    }
}
