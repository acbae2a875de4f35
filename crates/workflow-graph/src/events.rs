//! Editor change notification
//!
//! Events are sent from the store and the session to the UI (or any
//! consumer) to report graph changes, notifications and validation state.

use serde::{Deserialize, Serialize};

use crate::types::{EdgeId, NodeId, Viewport};
use crate::validation::ValidationReport;

/// Trait for sending editor events
///
/// This abstracts over the transport mechanism (UI channel, mpsc, etc.)
/// allowing the store to be used in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: EditorEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// What a single graph state transition did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GraphChange {
    /// A whole document replaced the graph
    #[serde(rename_all = "camelCase")]
    DocumentLoaded { node_count: usize, edge_count: usize },
    #[serde(rename_all = "camelCase")]
    NodeAdded { node_id: NodeId },
    #[serde(rename_all = "camelCase")]
    NodeMoved { node_id: NodeId },
    /// Config or label edit
    #[serde(rename_all = "camelCase")]
    NodeUpdated { node_id: NodeId },
    /// A node and every edge touching it, removed together
    #[serde(rename_all = "camelCase")]
    NodeRemoved {
        node_id: NodeId,
        removed_edges: Vec<EdgeId>,
    },
    #[serde(rename_all = "camelCase")]
    EdgeAdded { edge_id: EdgeId },
    #[serde(rename_all = "camelCase")]
    EdgesRemoved { edge_ids: Vec<EdgeId> },
    /// A mixed node/edge selection deleted in one step
    #[serde(rename_all = "camelCase")]
    SelectionRemoved {
        node_ids: Vec<NodeId>,
        edge_ids: Vec<EdgeId>,
    },
    /// Presentation metadata filled in from the catalogue
    #[serde(rename_all = "camelCase")]
    DisplayEnriched { node_ids: Vec<NodeId> },
    /// Name, description, category or tags changed
    MetadataUpdated,
    /// Post-save reconciliation installed the persisted state
    #[serde(rename_all = "camelCase")]
    Reconciled { workflow_id: String },
    Undo,
    Redo,
}

impl GraphChange {
    /// Whether the change alters the set of nodes or edges
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DocumentLoaded { .. }
                | Self::NodeAdded { .. }
                | Self::NodeRemoved { .. }
                | Self::EdgeAdded { .. }
                | Self::EdgesRemoved { .. }
                | Self::SelectionRemoved { .. }
                | Self::Reconciled { .. }
                | Self::Undo
                | Self::Redo
        )
    }
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Events emitted during an editing session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorEvent {
    /// The graph moved to a new revision
    #[serde(rename_all = "camelCase")]
    GraphChanged { revision: u64, change: GraphChange },

    /// The viewport was set programmatically
    #[serde(rename_all = "camelCase")]
    ViewportChanged { viewport: Viewport },

    /// A dismissible message for the user
    #[serde(rename_all = "camelCase")]
    Notification {
        level: NotificationLevel,
        message: String,
    },

    /// A save round trip finished
    #[serde(rename_all = "camelCase")]
    SaveCompleted { workflow_id: String },

    /// Fresh validation results
    #[serde(rename_all = "camelCase")]
    ValidationUpdated { report: ValidationReport },
}

impl EditorEvent {
    /// Create a notification event
    pub fn notify(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self::Notification {
            level,
            message: message.into(),
        }
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: EditorEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink {
    events: parking_lot::Mutex<Vec<EditorEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self {
            events: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<EditorEvent> {
        self.events.lock().clone()
    }

    /// Only the graph changes, in order
    pub fn graph_changes(&self) -> Vec<GraphChange> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                EditorEvent::GraphChanged { change, .. } => Some(change.clone()),
                _ => None,
            })
            .collect()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for VecEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: EditorEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}
