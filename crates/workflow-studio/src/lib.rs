//! Workflow Studio - editor sessions and workflow persistence
//!
//! Connects the editable graph to the outside world:
//!
//! - `EditorSession`: one live editor, with canvas, registry, persistence
//!   and auto-validation wired around its graph store
//! - `PersistenceCoordinator`: debounced save, local-wins reconciliation,
//!   load with enrichment, viewport restoration after the surface is ready
//! - `WorkflowApi`: the workflow service seam (`HttpWorkflowApi` over reqwest)
//! - `StudioConfig`: JSON file plus `STUDIO_*` environment overrides
//!
//! # Example
//!
//! ```ignore
//! use workflow_studio::{EditorSession, NullSurface, StudioConfig};
//!
//! let config = StudioConfig::load("studio.json").await?;
//! let session = EditorSession::from_config(&config, Arc::new(NullSurface), sink)?;
//! session.load("wf-42").await?;
//! session.save().await?;
//! ```

pub mod api;
pub mod config;
pub mod constants;
pub mod coordinator;
pub mod error;
pub mod session;
pub mod surface;
pub mod wire;

// Re-export key types
pub use api::{decode_record, server_detail, HttpWorkflowApi, WorkflowApi};
pub use config::{EditorConfig, PersistenceConfig, StudioConfig};
pub use coordinator::{reconcile, PersistenceCoordinator, SaveGate, SaveOutcome, SaveTicket};
pub use error::{Result, StudioError};
pub use session::EditorSession;
pub use surface::{CanvasSurface, Liveness, NullSurface};
pub use wire::{
    viewport_from_view_state, ValidationResponse, WireConnection, WireNode, WirePosition,
    WorkflowPayload, WorkflowRecord,
};
