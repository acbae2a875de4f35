//! Persistence coordination
//!
//! Moves documents between the graph store and the workflow service.
//!
//! Save: capture the viewport, serialize (visual metadata included), create
//! or update, reconcile, then restore the viewport once the surface has
//! rendered. Load: fetch, enrich, install, then apply the saved viewport or
//! fit the view. Failures leave the store untouched and surface as a
//! notification. A save that returns after the document was reset or
//! reloaded is not applied to the store.

use std::sync::Arc;
use std::time::Duration;

use node_catalog::RegistryClient;
use parking_lot::Mutex;
use tokio::time::Instant;
use workflow_graph::{
    enrich_with_registry, EditorEvent, EventSink, GraphEdge, GraphNode, GraphStore,
    NodeEnricher, NotificationLevel, ValidationReport, Viewport, WorkflowDocument,
};

use crate::api::WorkflowApi;
use crate::error::{Result, StudioError};
use crate::surface::{CanvasSurface, Liveness};
use crate::wire::{WorkflowPayload, WorkflowRecord};

/// What a save request did
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// The document was persisted; carries the reconciled document
    Saved(WorkflowDocument),
    /// Another save is running or has just run; nothing was sent
    AlreadyInProgress,
    /// The service stored the document, but the editor was reset or
    /// reloaded meanwhile, so the result was not applied to the store
    Superseded { workflow_id: String },
}

#[derive(Debug, Default)]
struct GateState {
    in_flight: bool,
    last_started: Option<Instant>,
}

/// Admits at most one save per debounce window
#[derive(Debug)]
pub struct SaveGate {
    window: Duration,
    state: Mutex<GateState>,
}

impl SaveGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Start a save, or `None` if one is running or started within the window
    pub fn try_acquire(&self) -> Option<SaveTicket<'_>> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let recent = state
            .last_started
            .is_some_and(|started| now.duration_since(started) < self.window);
        if state.in_flight || recent {
            return None;
        }
        state.in_flight = true;
        state.last_started = Some(now);
        Some(SaveTicket {
            gate: self,
            completed: false,
        })
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }
}

/// Held for the duration of one save; releases the gate on drop
///
/// A ticket dropped without `complete` was a failed attempt and does not
/// count against the debounce window.
pub struct SaveTicket<'a> {
    gate: &'a SaveGate,
    completed: bool,
}

impl SaveTicket<'_> {
    /// Mark the request as having reached the service
    pub fn complete(&mut self) {
        self.completed = true;
    }
}

impl Drop for SaveTicket<'_> {
    fn drop(&mut self) {
        let mut state = self.gate.state.lock();
        state.in_flight = false;
        if !self.completed {
            state.last_started = None;
        }
    }
}

/// Decide which node/edge list survives a save
///
/// The local graph wins. The server's lists are adopted only when the
/// local graph is empty and the server returned nodes.
pub fn reconcile(local_node_count: usize, record: &WorkflowRecord) -> Option<(Vec<GraphNode>, Vec<GraphEdge>)> {
    if local_node_count == 0 && !record.nodes.is_empty() {
        log::info!(
            "Adopting {} nodes from the server copy of '{}'",
            record.nodes.len(),
            record.id
        );
        Some(record.graph())
    } else {
        None
    }
}

/// Serializes the store to the workflow service and back
pub struct PersistenceCoordinator {
    api: Arc<dyn WorkflowApi>,
    store: Arc<GraphStore>,
    surface: Arc<dyn CanvasSurface>,
    registry: Arc<RegistryClient>,
    enricher: NodeEnricher,
    notifications: Arc<dyn EventSink>,
    liveness: Liveness,
    gate: SaveGate,
}

impl PersistenceCoordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: Arc<dyn WorkflowApi>,
        store: Arc<GraphStore>,
        surface: Arc<dyn CanvasSurface>,
        registry: Arc<RegistryClient>,
        enricher: NodeEnricher,
        notifications: Arc<dyn EventSink>,
        liveness: Liveness,
        save_debounce: Duration,
    ) -> Self {
        Self {
            api,
            store,
            surface,
            registry,
            enricher,
            notifications,
            liveness,
            gate: SaveGate::new(save_debounce),
        }
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        if let Err(e) = self.notifications.send(EditorEvent::notify(level, message)) {
            log::debug!("Dropped notification: {}", e);
        }
    }

    /// Report a failure to the user, unless the editor is already gone
    fn fail<T>(&self, action: &str, error: StudioError) -> Result<T> {
        if !matches!(error, StudioError::Detached) {
            log::error!("Failed to {} workflow: {}", action, error);
            self.notify(
                NotificationLevel::Error,
                format!("Failed to {} workflow: {}", action, error.user_message()),
            );
        }
        Err(error)
    }

    fn after_await(&self) -> Result<()> {
        self.liveness.check().inspect_err(|_| {
            log::debug!("Editor torn down; discarding response");
        })
    }

    pub fn is_saving(&self) -> bool {
        self.gate.is_in_flight()
    }

    /// Save the store's document
    pub async fn save(&self) -> Result<SaveOutcome> {
        let Some(mut ticket) = self.gate.try_acquire() else {
            log::info!("Save already in progress; ignoring request");
            self.notify(NotificationLevel::Info, "Save already in progress");
            return Ok(SaveOutcome::AlreadyInProgress);
        };

        let viewport = self
            .surface
            .current_viewport()
            .unwrap_or_else(|| self.store.viewport());
        let (document, epoch) = self.store.snapshot_with_epoch();
        let payload = WorkflowPayload::from_document(&document, Some(viewport));

        log::info!(
            "Saving workflow '{}' ({} nodes, {} edges)",
            document.name,
            payload.nodes.len(),
            payload.connections.len()
        );
        let response = match document.workflow_id {
            None => self.api.create(&payload).await,
            Some(ref id) => self.api.update(id, &payload).await,
        };
        let record = match response.and_then(|r| self.after_await().map(|()| r)) {
            Ok(record) => record,
            Err(e) => return self.fail("save", e),
        };

        ticket.complete();

        let adopted = reconcile(document.nodes.len(), &record);
        if !self.store.mark_saved(epoch, record.id.clone(), adopted) {
            log::info!(
                "Saved workflow '{}' after the editor moved to another document",
                record.id
            );
            return Ok(SaveOutcome::Superseded {
                workflow_id: record.id,
            });
        }
        self.restore_viewport(Some(viewport)).await?;

        log::info!("Saved workflow '{}'", record.id);
        if let Err(e) = self.notifications.send(EditorEvent::SaveCompleted {
            workflow_id: record.id,
        }) {
            log::debug!("Dropped save event: {}", e);
        }
        Ok(SaveOutcome::Saved(self.store.snapshot()))
    }

    /// Load a document, enrich it and install it in the store
    pub async fn load(&self, workflow_id: &str) -> Result<WorkflowDocument> {
        log::info!("Loading workflow '{}'", workflow_id);
        let record = match self
            .api
            .get(workflow_id)
            .await
            .and_then(|r| self.after_await().map(|()| r))
        {
            Ok(record) => record,
            Err(e) => return self.fail("load", e),
        };

        let mut document = record.into_document();
        let nodes = std::mem::take(&mut document.nodes);
        document.nodes = enrich_with_registry(&self.enricher, &self.registry, nodes).await;
        if let Err(e) = self.after_await() {
            return self.fail("load", e);
        }

        let viewport = document.viewport;
        log::info!(
            "Loaded workflow '{}' ({} nodes, {} edges)",
            workflow_id,
            document.nodes.len(),
            document.edges.len()
        );
        self.store.load_document(document);
        self.restore_viewport(viewport).await?;
        Ok(self.store.snapshot())
    }

    /// Apply `viewport` once the surface has rendered, or fit the view
    async fn restore_viewport(&self, viewport: Option<Viewport>) -> Result<()> {
        self.surface.ready().await;
        self.after_await()?;
        match viewport {
            Some(viewport) => {
                self.store.set_viewport(viewport);
                self.surface.apply_viewport(viewport);
            }
            None => self.surface.fit_view(),
        }
        Ok(())
    }

    /// Ask the workflow service to validate the current document
    pub async fn validate_remote(&self) -> Result<ValidationReport> {
        let payload = WorkflowPayload::from_document(&self.store.snapshot(), None);
        match self
            .api
            .validate(&payload)
            .await
            .and_then(|r| self.after_await().map(|()| r))
        {
            Ok(response) => Ok(response.into_report()),
            Err(e) => self.fail("validate", e),
        }
    }
}
