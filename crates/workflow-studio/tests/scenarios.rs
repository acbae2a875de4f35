//! End-to-end editing scenarios against in-memory collaborators

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use node_catalog::{
    CatalogError, ConfigField, ConfigFieldType, ConfigSchema, DiscoverySource, NodeType,
    RegistryCache, RegistryClient, StaticSource,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::Notify;
use workflow_graph::{
    DragPayload, EditorEvent, NotificationLevel, Position, SessionState, VecEventSink, Viewport,
};
use workflow_studio::{
    CanvasSurface, EditorSession, Result, SaveOutcome, StudioConfig, StudioError,
    ValidationResponse, WireNode, WorkflowApi, WorkflowPayload, WorkflowRecord,
};

const NEUTRAL_ICON: &str = node_catalog::constants::glyphs::DEFAULT_ICON;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---- collaborators ----

/// Workflow service kept in memory
#[derive(Default)]
struct FakeApi {
    stored: Mutex<HashMap<String, WorkflowPayload>>,
    writes: AtomicUsize,
    next_id: AtomicUsize,
    failure: Mutex<Option<(u16, String)>>,
    echo_nodes: Mutex<Option<Vec<WireNode>>>,
    hold: Mutex<Option<Arc<Notify>>>,
}

impl FakeApi {
    fn seed(&self, id: &str, payload: serde_json::Value) {
        let payload: WorkflowPayload = serde_json::from_value(payload).unwrap();
        self.stored.lock().insert(id.to_string(), payload);
    }

    fn stored(&self, id: &str) -> Option<WorkflowPayload> {
        self.stored.lock().get(id).cloned()
    }

    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn write(&self, id: String, payload: &WorkflowPayload) -> Result<WorkflowRecord> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let hold = self.hold.lock().clone();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        if let Some((status, detail)) = self.failure.lock().clone() {
            return Err(StudioError::Server { status, detail });
        }
        self.stored.lock().insert(id.clone(), payload.clone());

        let mut record = record(&id, payload);
        if let Some(nodes) = self.echo_nodes.lock().clone() {
            record.nodes = nodes;
            record.connections.clear();
        }
        Ok(record)
    }
}

fn record(id: &str, payload: &WorkflowPayload) -> WorkflowRecord {
    let mut value = serde_json::to_value(payload).unwrap();
    value["id"] = json!(id);
    serde_json::from_value(value).unwrap()
}

#[async_trait]
impl WorkflowApi for FakeApi {
    async fn get(&self, workflow_id: &str) -> Result<WorkflowRecord> {
        self.stored(workflow_id)
            .map(|payload| record(workflow_id, &payload))
            .ok_or_else(|| StudioError::NotFound(workflow_id.to_string()))
    }

    async fn create(&self, payload: &WorkflowPayload) -> Result<WorkflowRecord> {
        let id = format!("wf-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.write(id, payload).await
    }

    async fn update(&self, workflow_id: &str, payload: &WorkflowPayload) -> Result<WorkflowRecord> {
        self.write(workflow_id.to_string(), payload).await
    }

    async fn validate(&self, payload: &WorkflowPayload) -> Result<ValidationResponse> {
        let errors = if payload.nodes.is_empty() {
            vec![json!({"message": "Workflow has no nodes", "code": "empty"})]
        } else {
            vec![]
        };
        Ok(ValidationResponse {
            is_valid: errors.is_empty(),
            summary: Some(format!("{} nodes checked", payload.nodes.len())),
            errors,
            warnings: vec![json!("No trigger node")],
        })
    }
}

/// Rendering layer that records what was asked of it
#[derive(Default)]
struct FakeSurface {
    current: Mutex<Option<Viewport>>,
    calls: Mutex<Vec<String>>,
    applied: Mutex<Vec<Viewport>>,
}

impl FakeSurface {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CanvasSurface for FakeSurface {
    fn current_viewport(&self) -> Option<Viewport> {
        *self.current.lock()
    }

    fn apply_viewport(&self, viewport: Viewport) {
        self.calls.lock().push("apply".to_string());
        self.applied.lock().push(viewport);
    }

    fn fit_view(&self) {
        self.calls.lock().push("fit".to_string());
    }

    async fn ready(&self) {
        tokio::task::yield_now().await;
        self.calls.lock().push("ready".to_string());
    }
}

/// Discovery source that blocks until released
struct GatedSource {
    types: Vec<NodeType>,
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl DiscoverySource for GatedSource {
    fn id(&self) -> &str {
        "gated"
    }

    async fn fetch(&self) -> node_catalog::Result<Vec<NodeType>> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(self.types.clone())
    }
}

struct FailingSource;

#[async_trait]
impl DiscoverySource for FailingSource {
    fn id(&self) -> &str {
        "primary"
    }

    async fn fetch(&self) -> node_catalog::Result<Vec<NodeType>> {
        Err(CatalogError::Transport {
            source_id: "primary".to_string(),
            message: "operation timed out".to_string(),
        })
    }
}

fn node_type(type_id: &str, name: &str, icon: &str) -> NodeType {
    NodeType {
        type_id: type_id.to_string(),
        display_name: name.to_string(),
        description: format!("{} node", name),
        icon: icon.to_string(),
        color: "#7c3aed".to_string(),
        category: "custom".to_string(),
        config_schema: ConfigSchema::default(),
        default_config: serde_json::Map::new(),
        plugin_id: "acme".to_string(),
        plugin_version: "0.3.0".to_string(),
    }
}

fn registry_types() -> Vec<NodeType> {
    let mut fetch = node_type("acme.fetch", "Fetch URL", "🌐");
    fetch.config_schema =
        ConfigSchema::new(vec![ConfigField::new("url", "URL", ConfigFieldType::String).required()]);
    vec![
        node_type("T1", "Type One", "★"),
        node_type("llm_prompt", "LLM Prompt", "🤖"),
        node_type("output", "Output", "📤"),
        fetch,
    ]
}

fn registry_from(source: Arc<dyn DiscoverySource>) -> Arc<RegistryClient> {
    Arc::new(RegistryClient::new(
        vec![source],
        Arc::new(RegistryCache::new(Duration::from_secs(60))),
    ))
}

struct Harness {
    session: Arc<EditorSession>,
    api: Arc<FakeApi>,
    surface: Arc<FakeSurface>,
    sink: Arc<VecEventSink>,
}

impl Harness {
    fn with_registry(registry: Arc<RegistryClient>) -> Self {
        init_logging();
        let api = Arc::new(FakeApi::default());
        let surface = Arc::new(FakeSurface::default());
        let sink = Arc::new(VecEventSink::new());
        let session = EditorSession::new(
            &StudioConfig::default(),
            api.clone(),
            registry,
            surface.clone(),
            sink.clone(),
        );
        Self {
            session: Arc::new(session),
            api,
            surface,
            sink,
        }
    }

    fn new() -> Self {
        Self::with_registry(registry_from(Arc::new(StaticSource::new(
            "primary",
            registry_types(),
        ))))
    }

    fn notifications(&self, level: NotificationLevel) -> Vec<String> {
        self.sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                EditorEvent::Notification { level: l, message } if l == level => Some(message),
                _ => None,
            })
            .collect()
    }
}

fn bare_drop(type_id: &str) -> DragPayload {
    DragPayload {
        type_id: type_id.to_string(),
        definition: String::new(),
    }
}

fn seeded_document() -> serde_json::Value {
    json!({
        "name": "Daily digest",
        "description": "Summarize feeds",
        "category": "content",
        "tags": ["news"],
        "nodes": [
            {"node_id": "t1", "node_type": "T1", "name": "Kickoff", "config": {},
             "position": {"x": 0, "y": 0}, "icon": "▶", "color": "#22c55e"},
            {"node_id": "llm", "node_type": "llm_prompt", "config": {"prompt": "Summarize", "temperature": 0.2},
             "position": {"x": 240, "y": -60}},
            {"node_id": "out", "node_type": "output", "config": {"format": "markdown"},
             "position": {"x": 480, "y": 0}}
        ],
        "connections": [
            {"source_node": "t1", "target_node": "llm", "source_output": "out", "target_input": "in"},
            {"source_node": "llm", "target_node": "out", "source_output": "text", "target_input": "value"}
        ],
        "view_state": {"viewport": {"x": -120, "y": 35, "zoom": 0.8}}
    })
}

// ---- save ----

#[tokio::test(start_paused = true)]
async fn test_save_twice_within_window_sends_once() {
    let h = Harness::new();
    h.session
        .drop_node(&bare_drop("T1"), Position::new(0.0, 0.0))
        .await
        .unwrap();

    let (first, second) = tokio::join!(h.session.save(), h.session.save());
    assert!(matches!(first.unwrap(), SaveOutcome::Saved(_)));
    assert_eq!(second.unwrap(), SaveOutcome::AlreadyInProgress);
    assert_eq!(h.api.writes(), 1);

    tokio::time::advance(Duration::from_millis(100)).await;
    assert_eq!(h.session.save().await.unwrap(), SaveOutcome::AlreadyInProgress);
    assert_eq!(h.api.writes(), 1);
    assert_eq!(h.notifications(NotificationLevel::Info).len(), 2);

    tokio::time::advance(Duration::from_millis(300)).await;
    assert!(matches!(h.session.save().await.unwrap(), SaveOutcome::Saved(_)));
    assert_eq!(h.api.writes(), 2);
    // The second effective save updates the record the first one created
    assert_eq!(h.api.stored.lock().len(), 1);
    assert_eq!(h.session.store().workflow_id().as_deref(), Some("wf-1"));
}

#[tokio::test]
async fn test_save_sends_visual_metadata_and_viewport() {
    let h = Harness::new();
    let id = h
        .session
        .drop_node(&bare_drop("T1"), Position::new(-40.0, 12.0))
        .await
        .unwrap();
    let viewport = Viewport {
        x: 10.0,
        y: 20.0,
        zoom: 1.5,
    };
    *h.surface.current.lock() = Some(viewport);

    h.session.save().await.unwrap();

    let stored = h.api.stored("wf-1").unwrap();
    assert_eq!(stored.nodes[0].node_id, id);
    assert_eq!(stored.nodes[0].icon.as_deref(), Some("★"));
    assert_eq!(stored.nodes[0].color.as_deref(), Some("#7c3aed"));
    assert_eq!(stored.view_state.unwrap()["viewport"]["zoom"], 1.5);

    assert_eq!(h.surface.calls(), vec!["ready", "apply"]);
    assert_eq!(h.surface.applied.lock().last(), Some(&viewport));
    assert_eq!(h.session.store().viewport(), viewport);
    assert!(h
        .sink
        .events()
        .iter()
        .any(|e| matches!(e, EditorEvent::SaveCompleted { workflow_id } if workflow_id == "wf-1")));
}

#[tokio::test]
async fn test_failed_save_leaves_store_unchanged() {
    let h = Harness::new();
    h.session
        .drop_node(&bare_drop("llm_prompt"), Position::new(0.0, 0.0))
        .await
        .unwrap();
    *h.api.failure.lock() = Some((409, "Workflow name already exists".to_string()));
    let before = h.session.store().snapshot();
    let revision = h.session.store().revision();

    let err = h.session.save().await.unwrap_err();
    assert!(matches!(err, StudioError::Server { status: 409, .. }));

    assert_eq!(h.session.store().snapshot(), before);
    assert_eq!(h.session.store().revision(), revision);
    assert!(h.session.store().workflow_id().is_none());
    assert!(!h.session.is_saving());

    let errors = h.notifications(NotificationLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Workflow name already exists"));
}

#[tokio::test]
async fn test_local_graph_wins_over_server_echo() {
    let h = Harness::new();
    let canvas = h.session.canvas();
    let a = canvas
        .drop_node(&bare_drop("T1"), Position::new(0.0, 0.0), None)
        .unwrap();
    let b = canvas
        .drop_node(&bare_drop("output"), Position::new(200.0, 0.0), None)
        .unwrap();
    canvas.connect(&a, "out", &b, "in").unwrap();
    let local = h.session.store().snapshot();

    // Server silently drops a node and every connection
    *h.api.echo_nodes.lock() = Some(vec![WireNode::from(&local.nodes[1])]);

    let SaveOutcome::Saved(saved) = h.session.save().await.unwrap() else {
        panic!("expected a save");
    };
    assert_eq!(saved.nodes, local.nodes);
    assert_eq!(saved.edges, local.edges);
    assert_eq!(saved.workflow_id.as_deref(), Some("wf-1"));
}

#[tokio::test(start_paused = true)]
async fn test_empty_local_graph_adopts_server_nodes() {
    let h = Harness::new();
    let echoed: WireNode = serde_json::from_value(json!({
        "node_id": "srv-1", "node_type": "output", "name": "Output", "icon": "📤"
    }))
    .unwrap();
    *h.api.echo_nodes.lock() = Some(vec![echoed]);

    let SaveOutcome::Saved(saved) = h.session.save().await.unwrap() else {
        panic!("expected a save");
    };
    assert_eq!(saved.nodes.len(), 1);
    assert_eq!(saved.nodes[0].id, "srv-1");
    assert_eq!(h.session.store().state(), SessionState::Populated);
}

#[tokio::test]
async fn test_response_after_teardown_is_discarded() {
    let h = Harness::new();
    h.session
        .drop_node(&bare_drop("T1"), Position::new(0.0, 0.0))
        .await
        .unwrap();
    let hold = Arc::new(Notify::new());
    *h.api.hold.lock() = Some(hold.clone());

    let (result, ()) = tokio::join!(h.session.save(), async {
        h.session.teardown();
        hold.notify_one();
    });

    assert!(matches!(result, Err(StudioError::Detached)));
    assert_eq!(h.api.writes(), 1);
    assert!(h.session.store().workflow_id().is_none());
    assert!(h.surface.calls().is_empty());
    assert!(h.notifications(NotificationLevel::Error).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_new_document_during_save_stays_fresh() {
    let h = Harness::new();
    h.session
        .drop_node(&bare_drop("T1"), Position::new(0.0, 0.0))
        .await
        .unwrap();
    let hold = Arc::new(Notify::new());
    *h.api.hold.lock() = Some(hold.clone());

    let (result, ()) = tokio::join!(h.session.save(), async {
        h.session.new_document("Brand new");
        hold.notify_one();
    });

    assert_eq!(
        result.unwrap(),
        SaveOutcome::Superseded {
            workflow_id: "wf-1".to_string()
        }
    );
    let store = h.session.store();
    assert_eq!(store.metadata().name, "Brand new");
    assert!(store.workflow_id().is_none());
    assert_eq!(store.node_count(), 0);
    assert_eq!(store.state(), SessionState::Empty);
    assert!(h.surface.calls().is_empty());
    assert!(!h
        .sink
        .events()
        .iter()
        .any(|e| matches!(e, EditorEvent::SaveCompleted { .. })));

    // The next save creates a separate record instead of overwriting wf-1
    *h.api.hold.lock() = None;
    tokio::time::advance(Duration::from_millis(400)).await;
    h.session
        .drop_node(&bare_drop("output"), Position::new(0.0, 0.0))
        .await
        .unwrap();
    assert!(matches!(h.session.save().await.unwrap(), SaveOutcome::Saved(_)));
    assert_eq!(h.session.store().workflow_id().as_deref(), Some("wf-2"));
    assert_eq!(h.api.stored("wf-1").unwrap().nodes[0].node_type, "T1");
    assert_eq!(h.api.stored("wf-2").unwrap().name, "Brand new");
}

#[tokio::test(start_paused = true)]
async fn test_retry_right_after_failed_save_is_sent() {
    let h = Harness::new();
    h.session
        .drop_node(&bare_drop("T1"), Position::new(0.0, 0.0))
        .await
        .unwrap();
    *h.api.failure.lock() = Some((503, "Service unavailable".to_string()));
    assert!(h.session.save().await.is_err());

    *h.api.failure.lock() = None;
    assert!(matches!(h.session.save().await.unwrap(), SaveOutcome::Saved(_)));
    assert_eq!(h.api.writes(), 2);
    assert!(h.notifications(NotificationLevel::Info).is_empty());
}

// ---- load ----

#[tokio::test(start_paused = true)]
async fn test_load_then_save_round_trips() {
    let h = Harness::new();
    h.api.seed("wf-9", seeded_document());
    let original = h.api.stored("wf-9").unwrap();

    let loaded = h.session.load("wf-9").await.unwrap();
    assert_eq!(loaded.nodes.len(), 3);
    assert_eq!(loaded.edges.len(), 2);
    h.session.save().await.unwrap();

    let saved = h.api.stored("wf-9").unwrap();
    assert_eq!(h.api.writes(), 1);
    assert_eq!(saved.nodes.len(), original.nodes.len());
    assert_eq!(saved.connections, original.connections);
    for (before, after) in original.nodes.iter().zip(&saved.nodes) {
        assert_eq!(after.node_id, before.node_id);
        assert_eq!(after.node_type, before.node_type);
        assert_eq!(after.config, before.config);
        assert_eq!(after.position, before.position);
        if let Some(ref icon) = before.icon {
            assert_eq!(after.icon.as_ref(), Some(icon));
        } else {
            assert!(after.icon.is_some());
        }
    }
    // Explicit choices survive; gaps are filled from the catalogue
    assert_eq!(saved.nodes[0].icon.as_deref(), Some("▶"));
    assert_eq!(saved.nodes[0].name, "Kickoff");
    assert_eq!(saved.nodes[1].icon.as_deref(), Some("🤖"));
    assert_eq!(saved.nodes[1].name, "LLM Prompt");
}

#[tokio::test]
async fn test_load_restores_viewport_after_ready() {
    let h = Harness::new();
    h.api.seed("wf-9", seeded_document());

    h.session.load("wf-9").await.unwrap();

    let expected = Viewport {
        x: -120.0,
        y: 35.0,
        zoom: 0.8,
    };
    assert_eq!(h.surface.calls(), vec!["ready", "apply"]);
    assert_eq!(h.surface.applied.lock().as_slice(), &[expected]);
    assert_eq!(h.session.store().viewport(), expected);
}

#[tokio::test]
async fn test_load_without_viewport_fits_view() {
    let h = Harness::new();
    let mut doc = seeded_document();
    doc.as_object_mut().unwrap().remove("view_state");
    h.api.seed("wf-3", doc);

    h.session.load("wf-3").await.unwrap();
    assert_eq!(h.surface.calls(), vec!["ready", "fit"]);
}

#[tokio::test]
async fn test_corrupted_icon_becomes_neutral_glyph() {
    let h = Harness::new();
    h.api.seed(
        "wf-5",
        json!({
            "name": "Legacy",
            "nodes": [
                {"node_id": "w", "node_type": "legacy_widget", "icon": "\u{FFFD}"},
                {"node_id": "x", "node_type": "T1", "icon": "ðŸ”—"}
            ]
        }),
    );

    let doc = h.session.load("wf-5").await.unwrap();
    assert_eq!(doc.nodes[0].display_data.icon.as_deref(), Some(NEUTRAL_ICON));
    // A known type adopts the catalogue's icon instead
    assert_eq!(doc.nodes[1].display_data.icon.as_deref(), Some("★"));
}

#[tokio::test]
async fn test_load_missing_workflow_notifies() {
    let h = Harness::new();
    let err = h.session.load("nope").await.unwrap_err();
    assert!(matches!(err, StudioError::NotFound(_)));
    assert_eq!(h.session.store().state(), SessionState::Empty);

    let errors = h.notifications(NotificationLevel::Error);
    assert!(errors[0].contains("'nope' was not found"));
}

#[tokio::test]
async fn test_load_drops_connections_to_missing_nodes() {
    let h = Harness::new();
    h.api.seed(
        "wf-6",
        json!({
            "name": "Half wired",
            "description": null,
            "tags": null,
            "nodes": [
                {"node_id": "a", "node_type": "T1", "config": null},
                {"node_id": "b", "node_type": "output"}
            ],
            "connections": [
                {"source_node": "a", "target_node": "b", "source_output": "out", "target_input": "in"},
                {"source_node": "a", "target_node": "ghost", "source_output": "o", "target_input": "i"}
            ]
        }),
    );

    let doc = h.session.load("wf-6").await.unwrap();
    assert_eq!(doc.nodes.len(), 2);
    assert_eq!(doc.edges.len(), 1);
    assert!(h.session.store().edges().iter().all(|e| !e.touches("ghost")));
    assert!(doc.description.is_empty());
}

// ---- canvas and enrichment ----

#[tokio::test]
async fn test_dropped_t1_shows_registry_icon() {
    let h = Harness::new();
    assert!(h.session.registry().cached().is_none());

    let id = h
        .session
        .drop_node(&bare_drop("T1"), Position::new(100.0, 100.0))
        .await
        .unwrap();

    let node = h.session.store().node(&id).unwrap();
    assert!(id.starts_with("T1-"));
    assert_eq!(node.display_data.icon.as_deref(), Some("★"));
    assert_eq!(node.display_data.name, "Type One");

    // Warm cache: resolved synchronously at drop time
    let second = h
        .session
        .drop_node(&bare_drop("T1"), Position::new(0.0, 0.0))
        .await
        .unwrap();
    assert_ne!(second, id);
    let node = h.session.store().node(&second).unwrap();
    assert_eq!(node.display_data.icon.as_deref(), Some("★"));
}

#[tokio::test]
async fn test_node_dropped_mid_fetch_is_enriched() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let source = Arc::new(GatedSource {
        types: registry_types(),
        started: started.clone(),
        release: release.clone(),
    });
    let h = Harness::with_registry(registry_from(source));

    let session = h.session.clone();
    let first = tokio::spawn(async move {
        session
            .drop_node(&bare_drop("T1"), Position::new(0.0, 0.0))
            .await
    });
    started.notified().await;

    // Second drop lands while the fetch is still pending
    let late = h
        .session
        .canvas()
        .drop_node(&bare_drop("llm_prompt"), Position::new(200.0, 0.0), None)
        .unwrap();
    let node = h.session.store().node(&late).unwrap();
    assert_eq!(node.display_data.icon.as_deref(), Some(NEUTRAL_ICON));

    release.notify_one();
    let early = first.await.unwrap().unwrap();

    let early = h.session.store().node(&early).unwrap();
    let late = h.session.store().node(&late).unwrap();
    assert_eq!(early.display_data.icon.as_deref(), Some("★"));
    assert_eq!(late.display_data.icon.as_deref(), Some("🤖"));
    assert_eq!(late.display_data.name, "LLM Prompt");
    assert_eq!(late.display_data.category.as_deref(), Some("custom"));
}

#[tokio::test]
async fn test_undo_keeps_enriched_display_data() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let source = Arc::new(GatedSource {
        types: registry_types(),
        started: started.clone(),
        release: release.clone(),
    });
    let h = Harness::with_registry(registry_from(source));

    let session = h.session.clone();
    let dropped = tokio::spawn(async move {
        session
            .drop_node(&bare_drop("T1"), Position::new(0.0, 0.0))
            .await
    });
    started.notified().await;
    release.notify_one();
    let id = dropped.await.unwrap().unwrap();

    let store = h.session.store();
    let placed = store.node(&id).unwrap();
    assert_eq!(placed.display_data.icon.as_deref(), Some("★"));

    h.session
        .canvas()
        .move_node(&id, Position::new(80.0, 40.0))
        .unwrap();
    assert!(store.undo().unwrap());

    let node = store.node(&id).unwrap();
    assert_eq!(node.position, placed.position);
    assert_eq!(node.display_data.icon.as_deref(), Some("★"));
    assert_eq!(node.display_data.name, "Type One");
}

#[tokio::test]
async fn test_deleting_source_node_removes_edge() {
    let h = Harness::new();
    let canvas = h.session.canvas();
    let a = canvas
        .drop_node(&bare_drop("T1"), Position::new(0.0, 0.0), None)
        .unwrap();
    let b = canvas
        .drop_node(&bare_drop("output"), Position::new(200.0, 0.0), None)
        .unwrap();
    let edge = canvas.connect(&a, "out", &b, "in").unwrap();

    let removed = canvas.delete_node(&a).unwrap();
    assert_eq!(removed.edges.len(), 1);
    assert_eq!(removed.edges[0].id, edge);

    let store = h.session.store();
    assert_eq!(store.edge_count(), 0);
    assert!(store.node(&b).is_some());
    assert_eq!(store.read(|doc| doc.incident_edges(&b).count()), 0);
}

#[tokio::test]
async fn test_palette_survives_primary_timeout() {
    let direct: Arc<dyn DiscoverySource> = Arc::new(StaticSource::new(
        "direct",
        vec![
            node_type("a", "Alpha", "α"),
            node_type("b", "Beta", "β"),
            node_type("c", "Gamma", "γ"),
        ],
    ));
    let sources: Vec<Arc<dyn DiscoverySource>> = vec![Arc::new(FailingSource), direct];
    let registry = Arc::new(RegistryClient::new(
        sources,
        Arc::new(RegistryCache::new(Duration::from_secs(60))),
    ));
    let h = Harness::with_registry(registry);

    let palette = h.session.palette(false).await.unwrap();
    assert_eq!(palette.source(), "direct");
    let ids: Vec<_> = palette.iter().map(|t| t.type_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

// ---- validation ----

#[tokio::test]
async fn test_structural_changes_publish_validation() {
    let h = Harness::new();
    h.session.palette(false).await.unwrap();
    h.sink.clear();

    let id = h
        .session
        .drop_node(&bare_drop("acme.fetch"), Position::new(0.0, 0.0))
        .await
        .unwrap();

    let reports: Vec<_> = h
        .sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            EditorEvent::ValidationUpdated { report } => Some(report),
            _ => None,
        })
        .collect();
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert!(!report.is_valid);
    let issue = report.for_node(&id).next().unwrap();
    assert_eq!(issue.code, "missing_required_config");

    // Moving a node is not structural
    h.sink.clear();
    h.session
        .canvas()
        .move_node(&id, Position::new(50.0, 50.0))
        .unwrap();
    assert!(!h
        .sink
        .events()
        .iter()
        .any(|e| matches!(e, EditorEvent::ValidationUpdated { .. })));

    h.session
        .canvas()
        .open_node_config(&id)
        .unwrap()
        .set("url", json!("https://example.com/feed"))
        .unwrap();
    assert!(h.session.validate().is_valid);
}

#[tokio::test]
async fn test_remote_validation_report() {
    let h = Harness::new();
    let report = h.session.validate_remote().await.unwrap();
    assert!(!report.is_valid);
    assert_eq!(report.errors[0].message, "Workflow has no nodes");
    assert_eq!(report.warnings[0].message, "No trigger node");
    assert_eq!(report.summary.as_deref(), Some("0 nodes checked"));
    assert!(matches!(
        h.sink.events().last(),
        Some(EditorEvent::ValidationUpdated { .. })
    ));
}
