//! Workflow Graph - the live editing model of the workflow editor
//!
//! This crate holds the in-memory graph a user edits on the canvas and
//! everything that mutates or inspects it:
//!
//! - `GraphStore`: single source of truth, one event per state transition
//! - `CanvasController`: drag-and-drop, connect, delete and double-click
//! - `NodeEnricher`: fills presentation metadata from the node catalogue
//! - `ValidationAdvisor`: advisory structural checks
//! - Compressed snapshot-based undo/redo
//!
//! # Architecture
//!
//! - `GraphStore` owns a `WorkflowDocument` behind a lock and reports
//!   changes through an `EventSink` (not tied to any UI toolkit)
//! - Enrichment follows an existing-wins, registry-fallback,
//!   default-last rule, identically for dropped and loaded nodes
//!
//! # Example
//!
//! ```ignore
//! use workflow_graph::{CanvasController, DragPayload, GraphStore, NullEventSink, Position};
//!
//! let store = Arc::new(GraphStore::new(Arc::new(NullEventSink)));
//! let canvas = CanvasController::new(store.clone());
//! let id = canvas.drop_node(&payload, Position::new(120.0, 40.0), Some(&catalog))?;
//! ```

pub mod builder;
pub mod canvas;
pub mod enrich;
pub mod error;
pub mod events;
pub mod legacy;
pub mod store;
pub mod types;
pub mod undo;
pub mod validation;

// Re-export key types
pub use builder::WorkflowBuilder;
pub use canvas::{CanvasController, DragPayload, EdgeInfo, NodeConfigSurface};
pub use enrich::{
    apply_defaults, enrich_with_registry, find_node_type, merge_display,
    MatchKind, NodeEnricher,
};
pub use error::{GraphError, Result};
pub use events::{
    EditorEvent, EventError, EventSink, GraphChange, NotificationLevel, NullEventSink,
    VecEventSink,
};
pub use legacy::LegacyTypeTable;
pub use store::{DocumentMetadata, GraphStore, RemovedNode, SessionState};
pub use types::{
    edge_id_for, ConfigMap, DisplayData, EdgeId, GraphEdge, GraphNode, NodeId, Position,
    Viewport, WorkflowDocument,
};
pub use undo::{UndoStack, DEFAULT_UNDO_DEPTH};
pub use validation::{
    collect_findings, validate_document, Finding, Severity, ValidationAdvisor, ValidationIssue,
    ValidationReport,
};
