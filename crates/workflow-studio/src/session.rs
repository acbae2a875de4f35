//! Editor session
//!
//! One `EditorSession` per open editor. It owns the graph store and wires
//! the canvas, the registry, persistence and auto-validation around it.
//! Dropping the session (or calling `teardown`) clears the liveness flag,
//! so responses still in flight are discarded instead of applied.

use std::sync::{Arc, OnceLock, Weak};

use node_catalog::{Catalog, RegistryCache, RegistryClient};
use parking_lot::RwLock;
use workflow_graph::{
    CanvasController, DragPayload, EditorEvent, EventError, EventSink, GraphStore, NodeEnricher,
    NodeId, Position, ValidationAdvisor, ValidationReport, WorkflowDocument,
};

use crate::api::{HttpWorkflowApi, WorkflowApi};
use crate::config::StudioConfig;
use crate::constants::defaults;
use crate::coordinator::{PersistenceCoordinator, SaveOutcome};
use crate::error::Result;
use crate::surface::{CanvasSurface, Liveness};

/// Forwards store events and publishes validation after structural changes
struct AutoValidateSink {
    outer: Arc<dyn EventSink>,
    store: OnceLock<Weak<GraphStore>>,
    registry: Arc<RegistryClient>,
    advisor: RwLock<ValidationAdvisor>,
    liveness: Liveness,
}

impl AutoValidateSink {
    fn publish(&self, report: ValidationReport) {
        if let Err(e) = self.outer.send(EditorEvent::ValidationUpdated { report }) {
            log::debug!("Dropped validation event: {}", e);
        }
    }

    fn validate_now(&self) -> Option<ValidationReport> {
        let store = self.store.get().and_then(Weak::upgrade)?;
        let catalog = self.registry.cached();
        let report = self
            .advisor
            .read()
            .validate(&store.snapshot(), catalog.as_deref());
        log::debug!(
            "Auto-validation: {} errors, {} warnings",
            report.errors.len(),
            report.warnings.len()
        );
        Some(report)
    }
}

impl EventSink for AutoValidateSink {
    fn send(&self, event: EditorEvent) -> std::result::Result<(), EventError> {
        let should_validate = match event {
            EditorEvent::GraphChanged { ref change, .. } => self.advisor.read().should_run(change),
            _ => false,
        };
        self.outer.send(event)?;
        if should_validate && self.liveness.is_alive() {
            if let Some(report) = self.validate_now() {
                self.publish(report);
            }
        }
        Ok(())
    }
}

/// A live editing session over one workflow document
pub struct EditorSession {
    store: Arc<GraphStore>,
    canvas: CanvasController,
    registry: Arc<RegistryClient>,
    coordinator: PersistenceCoordinator,
    events: Arc<AutoValidateSink>,
    liveness: Liveness,
}

impl EditorSession {
    /// Create a session with explicit collaborators
    pub fn new(
        config: &StudioConfig,
        api: Arc<dyn WorkflowApi>,
        registry: Arc<RegistryClient>,
        surface: Arc<dyn CanvasSurface>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let liveness = Liveness::new();
        let events = Arc::new(AutoValidateSink {
            outer: sink.clone(),
            store: OnceLock::new(),
            registry: registry.clone(),
            advisor: RwLock::new(ValidationAdvisor::new(config.editor.auto_validate)),
            liveness: liveness.clone(),
        });

        let store_sink: Arc<dyn EventSink> = events.clone();
        let store = Arc::new(GraphStore::with_undo_depth(
            store_sink,
            config.editor.undo_depth,
        ));
        // Only ever set here
        let _ = events.store.set(Arc::downgrade(&store));
        store.reset(defaults::UNTITLED_WORKFLOW);

        let enricher = NodeEnricher::new();
        let canvas = CanvasController::with_enricher(store.clone(), enricher.clone());
        let coordinator = PersistenceCoordinator::new(
            api,
            store.clone(),
            surface,
            registry.clone(),
            enricher,
            sink,
            liveness.clone(),
            config.persistence.save_debounce(),
        );

        Self {
            store,
            canvas,
            registry,
            coordinator,
            events,
            liveness,
        }
    }

    /// Create a session talking to the services named in `config`
    ///
    /// Uses the process-wide registry cache unless the configured TTL
    /// differs from its window.
    pub fn from_config(
        config: &StudioConfig,
        surface: Arc<dyn CanvasSurface>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let shared = RegistryCache::shared();
        let cache = if shared.ttl() == config.catalog.ttl() {
            shared
        } else {
            log::debug!(
                "Using a dedicated registry cache ({}s TTL)",
                config.catalog.ttl_secs
            );
            Arc::new(RegistryCache::new(config.catalog.ttl()))
        };
        let registry = Arc::new(RegistryClient::from_config(&config.catalog, cache)?);
        let api = Arc::new(HttpWorkflowApi::from_config(&config.persistence)?);
        Ok(Self::new(config, api, registry, surface, sink))
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn canvas(&self) -> &CanvasController {
        &self.canvas
    }

    pub fn registry(&self) -> &Arc<RegistryClient> {
        &self.registry
    }

    pub fn is_alive(&self) -> bool {
        self.liveness.is_alive()
    }

    pub fn is_saving(&self) -> bool {
        self.coordinator.is_saving()
    }

    /// Node types for the palette
    pub async fn palette(&self, force_refresh: bool) -> Result<Arc<Catalog>> {
        let catalog = self.registry.list_node_types(force_refresh).await?;
        self.liveness.check()?;
        Ok(catalog)
    }

    /// Handle a drop from the palette
    ///
    /// The node is inserted immediately. With no cached catalogue, the
    /// session then waits for the registry and enriches every node present
    /// at that point, including nodes dropped while the fetch was pending.
    pub async fn drop_node(&self, payload: &DragPayload, position: Position) -> Result<NodeId> {
        let cached = self.registry.cached();
        let node_id = self.canvas.drop_node(payload, position, cached.as_deref())?;
        if cached.is_none() {
            self.enrich_pending().await?;
        }
        Ok(node_id)
    }

    /// Await the registry and enrich every node currently in the store
    pub async fn enrich_pending(&self) -> Result<Vec<NodeId>> {
        let catalog = match self.registry.list_node_types(false).await {
            Ok(catalog) => Some(catalog),
            Err(e) => {
                log::warn!("Node types unavailable, applying default display data: {}", e);
                None
            }
        };
        self.liveness.check()?;

        let enricher = self.canvas.enricher();
        let changed = self
            .store
            .apply_display_updates(|node| enricher.enrich_node(node, catalog.as_deref()));
        if !changed.is_empty() {
            log::debug!("Enriched {} nodes", changed.len());
        }
        Ok(changed)
    }

    pub async fn save(&self) -> Result<SaveOutcome> {
        self.coordinator.save().await
    }

    pub async fn load(&self, workflow_id: &str) -> Result<WorkflowDocument> {
        self.coordinator.load(workflow_id).await
    }

    /// Validate locally and publish the report
    pub fn validate(&self) -> ValidationReport {
        let catalog = self.registry.cached();
        let report = self
            .events
            .advisor
            .read()
            .validate(&self.store.snapshot(), catalog.as_deref());
        self.events.publish(report.clone());
        report
    }

    /// Validate with the workflow service and publish the report
    pub async fn validate_remote(&self) -> Result<ValidationReport> {
        let report = self.coordinator.validate_remote().await?;
        self.events.publish(report.clone());
        Ok(report)
    }

    pub fn auto_validate(&self) -> bool {
        self.events.advisor.read().auto_validate()
    }

    pub fn set_auto_validate(&self, enabled: bool) {
        self.events.advisor.write().set_auto_validate(enabled);
    }

    /// Discard the current graph and start an unsaved document
    pub fn new_document(&self, name: impl Into<String>) {
        self.store.reset(name);
    }

    /// Detach the session; pending operations finish as `Detached`
    pub fn teardown(&self) {
        if self.liveness.is_alive() {
            log::debug!("Tearing down editor session");
            self.liveness.teardown();
        }
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
