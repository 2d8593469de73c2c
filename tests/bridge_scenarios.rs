//! Purpose: End-to-end bridge scenarios over the simulated engine and memory catalog.
//! Role: Exercises command handling, event ordering and teardown through the public API.
//! Invariants: Each test owns its own bridge; `snapshot()` is used as a queue barrier.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use arbridge::bridge::{BridgeBuilder, BridgeEvents, BridgeHandle};
use arbridge::catalog::{CatalogItem, MemoryCatalog};
use arbridge::channel::{CallId, MethodCall, parse_call_line};
use arbridge::core::command::{Command, decode_command};
use arbridge::core::error::{Error, ErrorKind};
use arbridge::core::event::{Event, event_json};
use arbridge::core::state::{LoadState, ObjectId, SessionState};
use arbridge::core::vec3::Vec3;
use arbridge::engine::sim::SimEngine;
use arbridge::engine::{ArEngine, EngineEvents, ProgressSink};
use arbridge::observer::{HostNotice, HostNotifier};

const WAIT: Duration = Duration::from_secs(5);

fn catalog() -> Arc<MemoryCatalog> {
    Arc::new(MemoryCatalog::from_items([
        CatalogItem::new("42").with_name("Sofa"),
        CatalogItem::new("7").with_name("Lamp"),
        CatalogItem::new("broken"),
    ]))
}

fn spawn(engine: Arc<dyn ArEngine>) -> (BridgeHandle, BridgeEvents) {
    BridgeBuilder::new(engine, catalog()).with_view_id(1).spawn()
}

fn add(component_id: &str) -> Command {
    Command::AddModel {
        component_id: component_id.to_string(),
        world_position: None,
    }
}

async fn next_event(events: &mut BridgeEvents) -> Event {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("event in time")
        .expect("event stream open")
}

fn without_progress(events: Vec<Event>) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| !matches!(event, Event::ModelLoadingProgress { .. }))
        .collect()
}

/// Delegates to `SimEngine` and keeps the callback registration for scripted callbacks.
struct Scripted {
    sim: SimEngine,
    events: Mutex<Option<EngineEvents>>,
    reject_placement: bool,
}

impl Scripted {
    fn new(sim: SimEngine) -> Self {
        Self {
            sim,
            events: Mutex::new(None),
            reject_placement: false,
        }
    }

    fn rejecting_placement(sim: SimEngine) -> Self {
        Self {
            reject_placement: true,
            ..Self::new(sim)
        }
    }

    fn events(&self) -> EngineEvents {
        self.events
            .lock()
            .expect("lock")
            .clone()
            .expect("attached")
    }
}

#[async_trait]
impl ArEngine for Scripted {
    fn attach(&self, events: EngineEvents) {
        *self.events.lock().expect("lock") = Some(events.clone());
        self.sim.attach(events);
    }

    fn start_session(&self, restart: bool) -> Result<(), Error> {
        self.sim.start_session(restart)
    }

    fn pause_session(&self) -> Result<(), Error> {
        self.sim.pause_session()
    }

    fn create_object(&self, item: &CatalogItem) -> Result<ObjectId, Error> {
        self.sim.create_object(item)
    }

    async fn load_object(
        &self,
        id: ObjectId,
        item: &CatalogItem,
        progress: ProgressSink,
    ) -> Result<(), Error> {
        self.sim.load_object(id, item, progress).await
    }

    fn place_object(&self, id: ObjectId, position: Option<Vec3>) -> Result<(), Error> {
        if self.reject_placement {
            return Err(Error::new(ErrorKind::EngineFailure)
                .with_message("no anchor available")
                .with_model_id(id));
        }
        self.sim.place_object(id, position)
    }

    fn select_object(&self, id: ObjectId) -> Result<(), Error> {
        self.sim.select_object(id)
    }

    fn deselect_all(&self) -> Result<(), Error> {
        self.sim.deselect_all()
    }

    fn remove_object(&self, id: ObjectId) -> Result<(), Error> {
        self.sim.remove_object(id)
    }

    fn list_objects(&self) -> Vec<ObjectId> {
        self.sim.list_objects()
    }
}

#[tokio::test]
async fn distinct_adds_get_distinct_ids() {
    let engine = Arc::new(SimEngine::new());
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    for component in ["42", "42", "7"] {
        bridge.call(add(component)).await.expect("add");
    }

    let added: Vec<ObjectId> = events
        .drain()
        .into_iter()
        .filter_map(|event| match event {
            Event::ModelAdded { model_id, .. } => Some(model_id),
            _ => None,
        })
        .collect();
    assert_eq!(added.len(), 3);
    let mut unique = added.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), 3);

    let snapshot = bridge.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.objects.len(), 3);
    assert!(
        snapshot
            .objects
            .iter()
            .all(|object| object.load_state == LoadState::Loaded)
    );
    assert_eq!(snapshot.selected, added.last().copied());
}

#[tokio::test]
async fn adding_second_model_moves_selection_in_order() {
    let engine = Arc::new(SimEngine::new());
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    bridge.call(add("42")).await.expect("add a");
    bridge.call(add("7")).await.expect("add b");

    let events = without_progress(events.drain());
    assert_eq!(
        events,
        vec![
            Event::SessionStarted { restarted: false },
            Event::ModelAdded {
                model_id: 1,
                component_id: "42".to_string()
            },
            Event::ModelSelected {
                model_id: 1,
                component_id: "42".to_string()
            },
            Event::ModelAdded {
                model_id: 2,
                component_id: "7".to_string()
            },
            Event::SelectionReset,
            Event::ModelSelected {
                model_id: 2,
                component_id: "7".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn tapping_another_model_deselects_once_then_selects() {
    let engine = Arc::new(SimEngine::new());
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    bridge.call(add("42")).await.expect("add a");
    bridge.call(add("7")).await.expect("add b");
    events.drain();

    assert!(engine.tap_object(1));
    let snapshot = bridge.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.selected, Some(1));
    assert_eq!(
        events.drain(),
        vec![
            Event::SelectionReset,
            Event::ModelSelected {
                model_id: 1,
                component_id: "42".to_string()
            },
        ]
    );

    // tapping the selected model again changes nothing
    assert!(engine.tap_object(1));
    bridge.snapshot().await.expect("snapshot");
    assert!(events.drain().is_empty());

    engine.tap_empty();
    let snapshot = bridge.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.selected, None);
    assert_eq!(events.drain(), vec![Event::SelectionReset]);
}

#[tokio::test]
async fn remove_selected_without_selection_is_noop() {
    let engine = Arc::new(SimEngine::new());
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    events.drain();

    assert_eq!(
        bridge
            .call(Command::RemoveSelectedModel)
            .await
            .expect("remove"),
        Value::Null
    );
    assert!(events.drain().is_empty());
    assert!(!engine.calls().iter().any(|call| call.starts_with("remove_object")));
}

#[tokio::test]
async fn remove_unknown_model_succeeds_silently() {
    let engine = Arc::new(SimEngine::new());
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    bridge.call(add("42")).await.expect("add");
    events.drain();

    bridge
        .call(Command::RemoveModel { model_id: 999 })
        .await
        .expect("remove unknown");
    assert!(events.drain().is_empty());
    assert_eq!(bridge.snapshot().await.expect("snapshot").objects.len(), 1);
}

#[tokio::test]
async fn remove_model_by_id_reports_deselect_then_delete() {
    let engine = Arc::new(SimEngine::new());
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    bridge.call(add("42")).await.expect("add a");
    bridge.call(add("7")).await.expect("add b");
    events.drain();

    // not selected: only the deletion
    bridge
        .call(Command::RemoveModel { model_id: 1 })
        .await
        .expect("remove a");
    assert_eq!(
        events.drain(),
        vec![Event::ModelDeleted {
            model_id: 1,
            component_id: "42".to_string()
        }]
    );

    bridge
        .call(Command::RemoveModel { model_id: 2 })
        .await
        .expect("remove b");
    assert_eq!(
        events.drain(),
        vec![
            Event::SelectionReset,
            Event::ModelDeleted {
                model_id: 2,
                component_id: "7".to_string()
            },
        ]
    );
    assert!(engine.list_objects().is_empty());
}

#[tokio::test]
async fn removing_a_loading_model_fails_its_add_silently() {
    let engine = Arc::new(SimEngine::new().with_load_step(Duration::from_millis(50)));
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    events.drain();

    let pending = bridge.submit(add("42"));
    let mut seen = vec![next_event(&mut events).await];
    let snapshot = bridge.snapshot().await.expect("snapshot");
    let id = snapshot.placing.expect("placing while loading");
    assert_eq!(
        snapshot.object(id).map(|object| &object.load_state),
        Some(&LoadState::Loading)
    );

    bridge
        .call(Command::RemoveModel { model_id: id })
        .await
        .expect("remove loading");
    let err = pending.wait().await.expect_err("removed mid-load");
    assert_eq!(err.kind(), ErrorKind::ModelLoadFailed);
    assert_eq!(err.component_id(), Some("42"));
    assert_eq!(err.model_id(), Some(id));

    let snapshot = bridge.snapshot().await.expect("snapshot");
    assert!(snapshot.objects.is_empty());
    assert_eq!(snapshot.placing, None);
    assert_eq!(snapshot.selected, None);

    seen.extend(events.drain());
    assert!(
        seen.iter()
            .all(|event| matches!(event, Event::ModelLoadingProgress { .. })),
        "{seen:?}"
    );
    assert_eq!(
        seen.last(),
        Some(&Event::ModelLoadingProgress {
            component_id: "42".to_string(),
            progress: 100
        })
    );
}

#[tokio::test]
async fn remove_model_clears_engine_only_objects() {
    let engine = Arc::new(SimEngine::new());
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    let stray = engine.create_object(&CatalogItem::new("7")).expect("create");
    events.drain();

    bridge
        .call(Command::RemoveModel { model_id: stray })
        .await
        .expect("remove stray");
    assert!(!engine.list_objects().contains(&stray));
    assert!(engine.calls().contains(&format!("remove_object({stray})")));
    bridge.snapshot().await.expect("barrier");
    assert!(events.drain().is_empty());
}

#[tokio::test]
async fn placement_failure_surfaces_as_model_load_failure() {
    let engine = Arc::new(Scripted::rejecting_placement(SimEngine::new()));
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    events.drain();

    let err = bridge.call(add("42")).await.expect_err("placement rejected");
    assert_eq!(err.kind(), ErrorKind::ModelLoadFailed);
    assert_eq!(err.component_id(), Some("42"));
    assert_eq!(err.model_id(), Some(1));
    assert_eq!(err.message(), Some("no anchor available"));

    let seen = events.drain();
    assert!(
        !seen
            .iter()
            .any(|event| matches!(event, Event::ModelAdded { .. } | Event::ModelSelected { .. })),
        "{seen:?}"
    );
    let snapshot = bridge.snapshot().await.expect("snapshot");
    assert!(snapshot.objects.is_empty());
    assert_eq!(snapshot.placing, None);
    assert!(engine.list_objects().is_empty());
}

#[tokio::test]
async fn first_plane_is_reported_once_per_bridge() {
    let plane = Vec3::new(0.0, -1.2, -0.5);
    let engine = Arc::new(SimEngine::new().with_first_plane(Some(plane)));
    let notifier = HostNotifier::new();
    let (bridge, mut events) = BridgeBuilder::new(engine.clone(), catalog())
        .with_notifier(&notifier)
        .spawn();

    bridge.call(Command::Init).await.expect("init");
    bridge.snapshot().await.expect("barrier");
    engine.interrupt();
    engine.resume();
    engine.detect_plane(Some(Vec3::new(1.0, 1.0, 1.0)));
    let snapshot = bridge.snapshot().await.expect("snapshot");
    assert!(snapshot.first_plane_reported);

    // app lifecycle restarts the session, which reports the plane again
    let mut seen = events.drain();
    notifier.publish(HostNotice::AppPaused);
    loop {
        let event = next_event(&mut events).await;
        let paused = event == Event::SessionPaused;
        seen.push(event);
        if paused {
            break;
        }
    }
    notifier.publish(HostNotice::AppResumed);
    loop {
        let event = next_event(&mut events).await;
        let started = event == Event::SessionStarted { restarted: true };
        seen.push(event);
        if started {
            break;
        }
    }
    bridge.snapshot().await.expect("barrier");
    seen.extend(events.drain());

    bridge.call(Command::Dispose).await.expect("dispose");
    engine.detect_plane(None);
    bridge.snapshot().await.expect("barrier");
    seen.extend(events.drain());

    let planes: Vec<&Event> = seen
        .iter()
        .filter(|event| matches!(event, Event::FirstPlaneDetected { .. }))
        .collect();
    assert_eq!(
        planes,
        vec![&Event::FirstPlaneDetected {
            position: Some(plane)
        }]
    );
}

#[tokio::test]
async fn add_then_remove_selected_scenario() {
    let engine = Arc::new(SimEngine::new());
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    bridge.call(add("42")).await.expect("add");

    let snapshot = bridge.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.objects.len(), 1);
    let object = &snapshot.objects[0];
    assert_eq!(object.catalog_item_id, "42");
    assert_eq!(snapshot.selected, Some(object.id));
    let id = object.id;
    events.drain();

    bridge
        .call(Command::RemoveSelectedModel)
        .await
        .expect("remove selected");
    let snapshot = bridge.snapshot().await.expect("snapshot");
    assert!(snapshot.objects.is_empty());
    assert_eq!(snapshot.selected, None);
    assert_eq!(
        events.drain(),
        vec![
            Event::SelectionReset,
            Event::ModelDeleted {
                model_id: id,
                component_id: "42".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn blank_component_id_fails_before_engine_interaction() {
    let engine = Arc::new(SimEngine::new());
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    let calls_before = engine.calls();
    events.drain();

    let mut arguments = Map::new();
    arguments.insert("componentId".to_string(), json!(""));
    let err = bridge
        .call_method("addModel", &arguments)
        .await
        .expect_err("blank id");
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert_eq!(err.message(), Some("'componentId' parameter must not be blank."));
    assert_eq!(engine.calls(), calls_before);
    assert!(events.drain().is_empty());
}

#[tokio::test]
async fn unknown_component_is_not_found_without_progress() {
    let engine = Arc::new(SimEngine::new());
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    events.drain();

    let err = bridge.call(add("nope")).await.expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.message(), Some("Unable to find component with such id."));
    assert!(events.drain().is_empty());
    assert!(!engine.calls().iter().any(|call| call.starts_with("create_object")));
}

#[tokio::test]
async fn failed_load_reports_final_progress_and_leaves_no_object() {
    let engine = Arc::new(SimEngine::new().with_failing_component("broken"));
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    events.drain();

    let err = bridge.call(add("broken")).await.expect_err("load failure");
    assert_eq!(err.kind(), ErrorKind::ModelLoadFailed);
    assert_eq!(err.component_id(), Some("broken"));

    let progress: Vec<u8> = events
        .drain()
        .into_iter()
        .map(|event| match event {
            Event::ModelLoadingProgress { progress, .. } => progress,
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(progress, vec![25, 50, 100]);
    let snapshot = bridge.snapshot().await.expect("snapshot");
    assert!(snapshot.objects.is_empty());
    assert_eq!(snapshot.placing, None);
    assert!(engine.list_objects().is_empty());
}

#[tokio::test]
async fn dispose_is_idempotent_and_terminal() {
    let engine = Arc::new(SimEngine::new());
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    bridge.call(add("42")).await.expect("add");
    events.drain();

    bridge.call(Command::Dispose).await.expect("dispose");
    bridge.call(Command::Dispose).await.expect("dispose again");
    assert_eq!(events.drain(), vec![Event::SessionPaused]);
    assert!(engine.list_objects().is_empty());
    assert!(!engine.is_running());

    let snapshot = bridge.snapshot().await.expect("snapshot");
    assert!(snapshot.disposed);
    assert_eq!(snapshot.session, SessionState::Stopped);
    assert!(snapshot.objects.is_empty());

    let err = bridge.call(Command::Init).await.expect_err("disposed");
    assert_eq!(err.kind(), ErrorKind::NotInitialized);
    engine.interrupt();
    bridge.snapshot().await.expect("barrier");
    assert!(events.drain().is_empty());
}

#[tokio::test]
async fn dispose_fails_loads_in_flight() {
    let engine = Arc::new(SimEngine::new().with_load_step(Duration::from_millis(50)));
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");

    let pending = bridge.submit(add("42"));
    // wait for the load to start
    loop {
        if let Event::ModelLoadingProgress { .. } = next_event(&mut events).await {
            break;
        }
    }
    bridge.call(Command::Dispose).await.expect("dispose");
    let err = pending.wait().await.expect_err("disposed mid-load");
    assert_eq!(err.kind(), ErrorKind::NotInitialized);

    tokio::time::sleep(Duration::from_millis(250)).await;
    bridge.snapshot().await.expect("barrier");
    let rest = events.drain();
    assert!(!rest.iter().any(|event| matches!(
        event,
        Event::ModelLoadingProgress { progress: 100, .. } | Event::ModelAdded { .. }
    )));
    assert_eq!(without_progress(rest), vec![Event::SessionPaused]);
}

#[tokio::test]
async fn measurement_follows_engine_capability() {
    let (bridge, _events) = spawn(Arc::new(SimEngine::new()));
    bridge.call(Command::Init).await.expect("init");
    let shown = bridge
        .call(Command::SetMeasurementShown { value: true })
        .await
        .expect("measurement");
    assert_eq!(shown, Value::Bool(false));

    let engine = Arc::new(SimEngine::new().with_measurement_support(true));
    let (bridge, _events) = spawn(engine.clone());
    let shown = bridge
        .call(Command::SetMeasurementShown { value: true })
        .await
        .expect("measurement");
    assert_eq!(shown, Value::Bool(true));
    assert!(engine.measurement_shown());
    assert!(bridge.snapshot().await.expect("snapshot").measurement_shown);
}

#[tokio::test]
async fn unknown_method_is_unimplemented() {
    let (bridge, _events) = spawn(Arc::new(SimEngine::new()));
    let err = bridge
        .call_method("takeScreenshot", &Map::new())
        .await
        .expect_err("unimplemented");
    assert_eq!(err.kind(), ErrorKind::Unimplemented);
}

#[tokio::test]
async fn reset_selection_clears_and_reports_once() {
    let engine = Arc::new(SimEngine::new());
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    bridge.call(add("42")).await.expect("add");
    events.drain();

    bridge.call(Command::ResetSelection).await.expect("reset");
    bridge.call(Command::ResetSelection).await.expect("reset again");
    assert_eq!(events.drain(), vec![Event::SelectionReset]);
    assert_eq!(engine.selected(), None);
}

#[tokio::test]
async fn engine_callbacks_map_to_events() {
    let engine = Arc::new(Scripted::new(SimEngine::new()));
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    events.drain();

    let callbacks = engine.events();
    callbacks.help_shown("Move your phone slowly");
    callbacks.help_hidden();
    callbacks.object_add_failed("anchor lost");
    callbacks.unsupported("ARKit is not supported on this device");
    bridge.snapshot().await.expect("barrier");

    assert_eq!(
        events.drain(),
        vec![
            Event::ShowHelpMessage {
                message: "Move your phone slowly".to_string()
            },
            Event::HideHelpMessage,
            Event::non_critical("anchor lost"),
            Event::critical("ARKit is not supported on this device"),
        ]
    );
    let snapshot = bridge.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.session, SessionState::Paused);
}

#[tokio::test]
async fn engine_originated_objects_are_adopted_and_echoes_ignored() {
    let engine = Arc::new(Scripted::new(SimEngine::new()));
    let (bridge, mut events) = spawn(engine.clone());
    bridge.call(Command::Init).await.expect("init");
    bridge.call(add("42")).await.expect("add");
    events.drain();

    let callbacks = engine.events();
    // echo of the bridge's own selection
    callbacks.object_selected(1);
    callbacks.object_added(50, "7");
    callbacks.object_added(50, "7");
    bridge.snapshot().await.expect("barrier");
    assert_eq!(
        events.drain(),
        vec![Event::ModelAdded {
            model_id: 50,
            component_id: "7".to_string()
        }]
    );

    callbacks.object_removed(50);
    callbacks.object_removed(50);
    let snapshot = bridge.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.objects.len(), 1);
    assert_eq!(
        events.drain(),
        vec![Event::ModelDeleted {
            model_id: 50,
            component_id: "7".to_string()
        }]
    );
}

#[tokio::test]
async fn sign_out_reaches_live_bridge_only() {
    let notifier = HostNotifier::new();
    let (bridge, mut events) = BridgeBuilder::new(Arc::new(SimEngine::new()), catalog())
        .with_notifier(&notifier)
        .spawn();
    assert_eq!(notifier.subscriber_count(), 1);

    notifier.publish(HostNotice::Unauthorized {
        message: "Session expired.".to_string(),
    });
    assert_eq!(
        next_event(&mut events).await,
        Event::SignOut {
            message: "Session expired.".to_string()
        }
    );

    bridge.call(Command::Dispose).await.expect("dispose");
    assert_eq!(next_event(&mut events).await, Event::SessionPaused);
    for _ in 0..100 {
        if notifier.subscriber_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(notifier.subscriber_count(), 0);
    assert_eq!(
        notifier.publish(HostNotice::Unauthorized {
            message: "late".to_string()
        }),
        0
    );
}

#[tokio::test]
async fn app_lifecycle_pauses_and_resumes_session() {
    let engine = Arc::new(SimEngine::new());
    let notifier = HostNotifier::new();
    let (bridge, mut events) = BridgeBuilder::new(engine.clone(), catalog())
        .with_notifier(&notifier)
        .spawn();
    bridge.call(Command::Init).await.expect("init");
    assert_eq!(
        next_event(&mut events).await,
        Event::SessionStarted { restarted: false }
    );

    notifier.publish(HostNotice::AppPaused);
    assert_eq!(next_event(&mut events).await, Event::SessionPaused);
    assert!(!engine.is_running());

    notifier.publish(HostNotice::AppResumed);
    assert_eq!(
        next_event(&mut events).await,
        Event::SessionStarted { restarted: true }
    );
    assert!(engine.is_running());
    assert_eq!(
        bridge.snapshot().await.expect("snapshot").session,
        SessionState::Running
    );
}

#[tokio::test]
async fn channel_round_trip_drives_bridge() {
    let (bridge, mut events) = spawn(Arc::new(SimEngine::new()));
    let command = Command::RemoveModel {
        model_id: 123_456_789,
    };
    let line = MethodCall::from_command(CallId::String("r1".to_string()), &command)
        .to_json()
        .to_string();
    let call = parse_call_line(&line).expect("parse");
    assert_eq!(call.arguments["modelId"], json!("123456789"));
    let decoded = decode_command(&call.method, &call.arguments).expect("decode");
    assert_eq!(decoded, command);

    bridge.call(decoded).await.expect("remove unknown");
    bridge.call(Command::Init).await.expect("init");
    let event = next_event(&mut events).await;
    assert_eq!(
        event_json(&event),
        json!({"event": "onArSessionStarted", "arguments": false})
    );
}
