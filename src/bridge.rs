//! Purpose: Drive one AR view from channel commands and re-emit engine callbacks as events.
//! Exports: `BridgeBuilder`, `BridgeHandle`, `BridgeEvents`, `PendingCall`, `Snapshot`.
//! Role: Single-consumer actor; commands, engine callbacks, load progress and host
//! notices all funnel through one queue before touching placement state.
//! Invariants: Only the actor task mutates `PlacementState`.
//! Invariants: Every outbound event goes through `EventSink::deliver`.
//! Invariants: After dispose the engine handle is gone and every late message is a no-op.
//! Invariants: `onArFirstPlaneDetected` is latched once per bridge.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::{mpsc, oneshot};

use crate::catalog::{Catalog, CatalogItem};
use crate::core::command::{Command, decode_command};
use crate::core::error::{Error, ErrorKind};
use crate::core::event::Event;
use crate::core::state::{ObjectId, PlacedObject, PlacementState, SessionState, Signal};
use crate::core::vec3::Vec3;
use crate::engine::{ArEngine, EngineCallback, EngineEvents, ProgressSink};
use crate::observer::{HostNotice, HostNotifier, Subscription};

const CHANNEL_PREFIX: &str = "cwflutter_ar";

type Reply = oneshot::Sender<Result<Value, Error>>;

pub(crate) enum Inbound {
    Command {
        command: Command,
        reply: Reply,
    },
    Engine(EngineCallback),
    Host(HostNotice),
    Lookup {
        component_id: String,
        position: Option<Vec3>,
        result: Result<Option<CatalogItem>, Error>,
        reply: Reply,
    },
    LoadProgress {
        id: ObjectId,
        percent: u8,
    },
    LoadFinished {
        id: ObjectId,
        result: Result<(), Error>,
    },
    Snapshot(oneshot::Sender<Snapshot>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Uninitialized,
    Running,
    Paused,
    Disposed,
}

/// Point-in-time view of a bridge, answered in queue order.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub session: SessionState,
    pub disposed: bool,
    pub objects: Vec<PlacedObject>,
    pub selected: Option<ObjectId>,
    pub placing: Option<ObjectId>,
    pub measurement_shown: bool,
    pub first_plane_reported: bool,
}

impl Snapshot {
    pub fn object(&self, id: ObjectId) -> Option<&PlacedObject> {
        self.objects.iter().find(|object| object.id == id)
    }
}

pub struct BridgeBuilder {
    engine: Arc<dyn ArEngine>,
    catalog: Arc<dyn Catalog>,
    view_id: i64,
    notifier: Option<HostNotifier>,
}

impl BridgeBuilder {
    pub fn new(engine: Arc<dyn ArEngine>, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            engine,
            catalog,
            view_id: 0,
            notifier: None,
        }
    }

    pub fn with_view_id(mut self, view_id: i64) -> Self {
        self.view_id = view_id;
        self
    }

    pub fn with_notifier(mut self, notifier: &HostNotifier) -> Self {
        self.notifier = Some(notifier.clone());
        self
    }

    /// Starts the actor. Must be called from within a tokio runtime.
    pub fn spawn(self) -> (BridgeHandle, BridgeEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        self.engine.attach(EngineEvents::new(tx.downgrade()));
        let subscription = self
            .notifier
            .as_ref()
            .map(|notifier| Subscription::spawn(notifier.subscribe(), tx.downgrade()));

        let controller = Controller {
            view_id: self.view_id,
            phase: Phase::Uninitialized,
            engine: EngineHandle(Some(self.engine)),
            catalog: self.catalog,
            state: PlacementState::new(),
            loads: HashMap::new(),
            first_plane_reported: false,
            measurement_shown: false,
            sink: EventSink {
                tx: event_tx,
                view_id: self.view_id,
            },
            inbox: tx.downgrade(),
            subscription,
        };
        tracing::debug!(view_id = self.view_id, "bridge spawned");
        tokio::spawn(controller.run(rx));

        (
            BridgeHandle {
                tx,
                view_id: self.view_id,
            },
            BridgeEvents { rx: event_rx },
        )
    }
}

/// Caller side of a bridge. Commands are processed in submission order.
#[derive(Clone, Debug)]
pub struct BridgeHandle {
    tx: mpsc::UnboundedSender<Inbound>,
    view_id: i64,
}

impl BridgeHandle {
    pub fn view_id(&self) -> i64 {
        self.view_id
    }

    pub fn channel_name(&self) -> String {
        channel_name(self.view_id)
    }

    /// Enqueues now, so submission order is processing order.
    pub fn submit(&self, command: Command) -> PendingCall {
        let (reply, rx) = oneshot::channel();
        let rx = self
            .tx
            .send(Inbound::Command { command, reply })
            .ok()
            .map(|()| rx);
        PendingCall { rx }
    }

    pub async fn call(&self, command: Command) -> Result<Value, Error> {
        self.submit(command).wait().await
    }

    pub async fn call_method(
        &self,
        method: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, Error> {
        let command = decode_command(method, arguments)?;
        self.call(command).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Inbound::Snapshot(reply))
            .map_err(|_| bridge_gone())?;
        rx.await.map_err(|_| bridge_gone())
    }
}

/// Result of a submitted command; resolves once the bridge has finished it.
#[derive(Debug)]
pub struct PendingCall {
    rx: Option<oneshot::Receiver<Result<Value, Error>>>,
}

impl PendingCall {
    pub async fn wait(self) -> Result<Value, Error> {
        match self.rx {
            Some(rx) => rx.await.unwrap_or_else(|_| Err(bridge_gone())),
            None => Err(bridge_gone()),
        }
    }
}

pub fn channel_name(view_id: i64) -> String {
    format!("{CHANNEL_PREFIX}_{view_id}")
}

fn bridge_gone() -> Error {
    Error::new(ErrorKind::NotInitialized).with_message("AR view bridge has stopped")
}

/// Outbound events in delivery order.
#[derive(Debug)]
pub struct BridgeEvents {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl BridgeEvents {
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Everything delivered so far, without waiting.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

/// The one path onto the caller's delivery context.
#[derive(Debug)]
struct EventSink {
    tx: mpsc::UnboundedSender<Event>,
    view_id: i64,
}

impl EventSink {
    fn deliver(&self, event: Event) {
        tracing::debug!(view_id = self.view_id, event = event.name(), "event delivered");
        if self.tx.send(event).is_err() {
            tracing::trace!(view_id = self.view_id, "event receiver gone");
        }
    }
}

/// Engine reference that disappears on dispose.
struct EngineHandle(Option<Arc<dyn ArEngine>>);

impl EngineHandle {
    fn live(&self) -> Result<Arc<dyn ArEngine>, Error> {
        self.0.clone().ok_or_else(|| {
            Error::new(ErrorKind::NotInitialized).with_message("AR view is disposed")
        })
    }

    fn take(&mut self) -> Option<Arc<dyn ArEngine>> {
        self.0.take()
    }
}

struct PendingLoad {
    component_id: String,
    position: Option<Vec3>,
    last_progress: Option<u8>,
    reply: Reply,
}

struct Controller {
    view_id: i64,
    phase: Phase,
    engine: EngineHandle,
    catalog: Arc<dyn Catalog>,
    state: PlacementState,
    loads: HashMap<ObjectId, PendingLoad>,
    first_plane_reported: bool,
    measurement_shown: bool,
    sink: EventSink,
    inbox: mpsc::WeakUnboundedSender<Inbound>,
    subscription: Option<Subscription>,
}

impl Controller {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Inbound>) {
        while let Some(message) = rx.recv().await {
            self.handle(message);
        }
        tracing::debug!(view_id = self.view_id, "bridge stopped");
    }

    fn handle(&mut self, message: Inbound) {
        match message {
            Inbound::Command { command, reply } => self.on_command(command, reply),
            Inbound::Engine(callback) => self.on_engine(callback),
            Inbound::Host(notice) => self.on_host(notice),
            Inbound::Lookup {
                component_id,
                position,
                result,
                reply,
            } => self.on_lookup(component_id, position, result, reply),
            Inbound::LoadProgress { id, percent } => self.on_load_progress(id, percent),
            Inbound::LoadFinished { id, result } => self.on_load_finished(id, result),
            Inbound::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            session: self.session_state(),
            disposed: self.phase == Phase::Disposed,
            objects: self.state.objects().cloned().collect(),
            selected: self.state.selected().map(|object| object.id),
            placing: self.state.placing().map(|object| object.id),
            measurement_shown: self.measurement_shown,
            first_plane_reported: self.first_plane_reported,
        }
    }

    fn session_state(&self) -> SessionState {
        match self.phase {
            Phase::Running => SessionState::Running,
            Phase::Paused => SessionState::Paused,
            Phase::Uninitialized | Phase::Disposed => SessionState::Stopped,
        }
    }

    fn deliver_signals(&self, signals: Vec<Signal>) {
        for signal in signals {
            self.sink.deliver(Event::from(signal));
        }
    }

    // ── Commands ──

    fn on_command(&mut self, command: Command, reply: Reply) {
        tracing::debug!(view_id = self.view_id, method = command.method(), "command received");
        if self.phase == Phase::Disposed && command != Command::Dispose {
            let _ = reply.send(Err(Error::new(ErrorKind::NotInitialized)
                .with_message(format!("AR view is disposed; `{}` rejected", command.method()))));
            return;
        }
        let result = match command {
            Command::Init => self.init(),
            Command::Dispose => self.dispose(),
            Command::AddModel {
                component_id,
                world_position,
            } => {
                self.add_model(component_id, world_position, reply);
                return;
            }
            Command::ResetSelection => self.reset_selection(),
            Command::RemoveSelectedModel => self.remove_selected_model(),
            Command::RemoveModel { model_id } => self.remove_model(model_id),
            Command::SetMeasurementShown { value } => self.set_measurement_shown(value),
            Command::Unimplemented { method } => Err(Error::new(ErrorKind::Unimplemented)
                .with_message(format!("method not implemented: {method}"))),
        };
        if let Err(err) = &result {
            tracing::debug!(view_id = self.view_id, error = %err, "command failed");
        }
        let _ = reply.send(result);
    }

    fn init(&mut self) -> Result<Value, Error> {
        let restarted = match self.phase {
            Phase::Running => return Ok(Value::Null),
            Phase::Paused => true,
            Phase::Uninitialized => false,
            Phase::Disposed => return Err(Error::new(ErrorKind::NotInitialized)),
        };
        self.engine.live()?.start_session(restarted)?;
        self.phase = Phase::Running;
        tracing::info!(view_id = self.view_id, restarted, "AR session started");
        self.sink.deliver(Event::SessionStarted { restarted });
        Ok(Value::Null)
    }

    fn dispose(&mut self) -> Result<Value, Error> {
        if self.phase == Phase::Disposed {
            return Ok(Value::Null);
        }
        if let Some(engine) = self.engine.take() {
            if let Err(err) = engine.pause_session() {
                tracing::warn!(view_id = self.view_id, error = %err, "pause on dispose failed");
            }
            for id in engine.list_objects() {
                if let Err(err) = engine.remove_object(id) {
                    tracing::warn!(view_id = self.view_id, id, error = %err, "remove on dispose failed");
                }
            }
        }
        self.state.clear();
        for (id, load) in self.loads.drain() {
            let _ = load.reply.send(Err(Error::new(ErrorKind::NotInitialized)
                .with_message("AR view disposed while the model was loading")
                .with_model_id(id)
                .with_component_id(load.component_id)));
        }
        self.subscription = None;
        self.phase = Phase::Disposed;
        tracing::info!(view_id = self.view_id, "AR view disposed");
        self.sink.deliver(Event::SessionPaused);
        Ok(Value::Null)
    }

    fn add_model(&mut self, component_id: String, position: Option<Vec3>, reply: Reply) {
        if self.phase == Phase::Uninitialized {
            let _ = reply.send(Err(Error::new(ErrorKind::NotInitialized)
                .with_message("call `init` before adding models")));
            return;
        }
        let Some(inbox) = self.inbox.upgrade() else {
            let _ = reply.send(Err(bridge_gone()));
            return;
        };
        let catalog = Arc::clone(&self.catalog);
        tokio::spawn(async move {
            let result = catalog.component(&component_id).await;
            let _ = inbox.send(Inbound::Lookup {
                component_id,
                position,
                result,
                reply,
            });
        });
    }

    fn on_lookup(
        &mut self,
        component_id: String,
        position: Option<Vec3>,
        result: Result<Option<CatalogItem>, Error>,
        reply: Reply,
    ) {
        let item = match result {
            Ok(Some(item)) => item,
            Ok(None) => {
                let _ = reply.send(Err(Error::new(ErrorKind::NotFound)
                    .with_message("Unable to find component with such id.")
                    .with_component_id(component_id)));
                return;
            }
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };
        let engine = match self.engine.live() {
            Ok(engine) => engine,
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };
        let Some(inbox) = self.inbox.upgrade() else {
            let _ = reply.send(Err(bridge_gone()));
            return;
        };
        let id = match engine.create_object(&item) {
            Ok(id) => id,
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };

        self.state
            .stage(PlacedObject::new(id, component_id.clone()).with_position(position));
        self.loads.insert(
            id,
            PendingLoad {
                component_id,
                position,
                last_progress: None,
                reply,
            },
        );
        tracing::debug!(view_id = self.view_id, id, "model loading");

        let progress = ProgressSink::new(inbox.clone(), id);
        tokio::spawn(async move {
            let result = engine.load_object(id, &item, progress).await;
            let _ = inbox.send(Inbound::LoadFinished { id, result });
        });
    }

    fn on_load_progress(&mut self, id: ObjectId, percent: u8) {
        let Some(load) = self.loads.get_mut(&id) else {
            return;
        };
        // 100 is reserved for completion
        if percent >= 100 || load.last_progress.is_some_and(|last| percent <= last) {
            return;
        }
        load.last_progress = Some(percent);
        self.sink.deliver(Event::ModelLoadingProgress {
            component_id: load.component_id.clone(),
            progress: percent,
        });
    }

    fn on_load_finished(&mut self, id: ObjectId, result: Result<(), Error>) {
        let Some(load) = self.loads.remove(&id) else {
            tracing::debug!(view_id = self.view_id, id, "late load completion dropped");
            return;
        };
        self.sink.deliver(Event::ModelLoadingProgress {
            component_id: load.component_id.clone(),
            progress: 100,
        });
        let outcome = result
            .and_then(|()| self.commit_model(id, load.position))
            .map_err(|err| load_failed(err, id, &load.component_id));
        if let Err(err) = &outcome {
            tracing::warn!(view_id = self.view_id, id, error = %err, "model not added");
            self.state.cancel(id, err.describe());
            if let Ok(engine) = self.engine.live() {
                if let Err(err) = engine.remove_object(id) {
                    tracing::warn!(view_id = self.view_id, id, error = %err, "cleanup failed");
                }
            }
        }
        let _ = load.reply.send(outcome);
    }

    fn commit_model(&mut self, id: ObjectId, position: Option<Vec3>) -> Result<Value, Error> {
        if !self.state.contains(id) {
            return Err(Error::new(ErrorKind::ModelLoadFailed)
                .with_message("model was removed before loading finished")
                .with_model_id(id));
        }
        let engine = self.engine.live()?;
        engine.place_object(id, position)?;
        engine.select_object(id)?;
        let signals = self.state.commit(id);
        tracing::info!(view_id = self.view_id, id, "model added");
        self.deliver_signals(signals);
        Ok(Value::Null)
    }

    fn reset_selection(&mut self) -> Result<Value, Error> {
        let engine = self.engine.live()?;
        if self.state.selected().is_some() {
            engine.deselect_all()?;
        }
        let signals = self.state.reset_selection();
        self.deliver_signals(signals);
        Ok(Value::Null)
    }

    fn remove_selected_model(&mut self) -> Result<Value, Error> {
        match self.state.selected().map(|object| object.id) {
            Some(id) => self.remove_object(id),
            None => Ok(Value::Null),
        }
    }

    fn remove_model(&mut self, id: ObjectId) -> Result<Value, Error> {
        if self.state.contains(id) {
            return self.remove_object(id);
        }
        let engine = self.engine.live()?;
        if engine.list_objects().contains(&id) {
            tracing::debug!(view_id = self.view_id, id, "removing engine-only object");
            engine.remove_object(id)?;
        }
        Ok(Value::Null)
    }

    fn remove_object(&mut self, id: ObjectId) -> Result<Value, Error> {
        self.engine.live()?.remove_object(id)?;
        let signals = self.state.remove(id);
        self.deliver_signals(signals);
        Ok(Value::Null)
    }

    fn set_measurement_shown(&mut self, value: bool) -> Result<Value, Error> {
        let shown = self.engine.live()?.set_measurement_shown(value);
        self.measurement_shown = shown;
        Ok(Value::Bool(shown))
    }

    // ── Engine callbacks ──

    fn on_engine(&mut self, callback: EngineCallback) {
        if self.phase == Phase::Disposed {
            tracing::debug!(view_id = self.view_id, ?callback, "callback after dispose dropped");
            return;
        }
        match callback {
            EngineCallback::SessionInterrupted => self.on_session_interrupted(),
            EngineCallback::SessionResumed => self.on_session_resumed(),
            EngineCallback::Error { message, critical } => self.on_engine_error(message, critical),
            EngineCallback::Unsupported { message } => self.on_engine_error(message, true),
            EngineCallback::PlaneDetected { position } => self.on_plane_detected(position),
            EngineCallback::ObjectAdded { id, component_id } => {
                self.on_object_added(id, component_id)
            }
            EngineCallback::ObjectAddFailed { message } => {
                self.sink.deliver(Event::non_critical(message))
            }
            EngineCallback::ObjectRemoved { id } => {
                let signals = self.state.remove(id);
                self.deliver_signals(signals);
            }
            EngineCallback::ObjectSelected { id } => {
                let signals = self.state.select(id);
                self.deliver_signals(signals);
            }
            EngineCallback::ObjectDeselected { id } => {
                let signals = self.state.deselect(id);
                self.deliver_signals(signals);
            }
            EngineCallback::HelpShown { message } => {
                self.sink.deliver(Event::ShowHelpMessage { message })
            }
            EngineCallback::HelpHidden => self.sink.deliver(Event::HideHelpMessage),
        }
    }

    fn on_session_interrupted(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.phase = Phase::Paused;
        tracing::info!(view_id = self.view_id, "AR session interrupted");
        self.sink.deliver(Event::SessionPaused);
    }

    fn on_session_resumed(&mut self) {
        if self.phase != Phase::Paused {
            return;
        }
        self.phase = Phase::Running;
        tracing::info!(view_id = self.view_id, "AR session resumed");
        self.sink.deliver(Event::SessionStarted { restarted: true });
    }

    fn on_engine_error(&mut self, message: String, critical: bool) {
        tracing::warn!(view_id = self.view_id, critical, %message, "AR engine error");
        if critical && self.phase == Phase::Running {
            // the caller has to `init` again
            self.phase = Phase::Paused;
        }
        self.sink.deliver(Event::Error {
            is_critical: critical,
            message,
        });
    }

    fn on_plane_detected(&mut self, position: Option<Vec3>) {
        if self.first_plane_reported {
            return;
        }
        self.first_plane_reported = true;
        self.sink.deliver(Event::FirstPlaneDetected { position });
    }

    fn on_object_added(&mut self, id: ObjectId, component_id: String) {
        if self.loads.contains_key(&id) {
            return;
        }
        let signals = self.state.adopt(PlacedObject::new(id, component_id));
        self.deliver_signals(signals);
    }

    // ── Host notices ──

    fn on_host(&mut self, notice: HostNotice) {
        if self.phase == Phase::Disposed {
            return;
        }
        match notice {
            HostNotice::Unauthorized { message } => {
                self.sink.deliver(Event::SignOut { message })
            }
            HostNotice::AppPaused => {
                if self.phase != Phase::Running {
                    return;
                }
                if let Ok(engine) = self.engine.live() {
                    if let Err(err) = engine.pause_session() {
                        tracing::warn!(view_id = self.view_id, error = %err, "pause failed");
                    }
                }
                self.on_session_interrupted();
            }
            HostNotice::AppResumed => {
                if self.phase != Phase::Paused {
                    return;
                }
                let started = self
                    .engine
                    .live()
                    .and_then(|engine| engine.start_session(true));
                match started {
                    Ok(()) => self.on_session_resumed(),
                    Err(err) => self.on_engine_error(err.describe(), false),
                }
            }
        }
    }
}

/// Every addModel failure after the lookup surfaces as `ModelLoadFailed` with full context.
fn load_failed(err: Error, id: ObjectId, component_id: &str) -> Error {
    if err.kind() == ErrorKind::ModelLoadFailed {
        return err.with_model_id(id).with_component_id(component_id);
    }
    Error::new(ErrorKind::ModelLoadFailed)
        .with_message(err.describe())
        .with_model_id(id)
        .with_component_id(component_id)
        .with_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::engine::sim::SimEngine;

    fn spawn_bridge(engine: Arc<SimEngine>) -> (BridgeHandle, BridgeEvents) {
        let catalog = MemoryCatalog::from_items([CatalogItem::new("42"), CatalogItem::new("7")]);
        BridgeBuilder::new(engine, Arc::new(catalog))
            .with_view_id(3)
            .spawn()
    }

    #[tokio::test]
    async fn channel_name_follows_view_id() {
        let (handle, _events) = spawn_bridge(Arc::new(SimEngine::new()));
        assert_eq!(handle.channel_name(), "cwflutter_ar_3");
    }

    #[tokio::test]
    async fn init_is_noop_while_running() {
        let engine = Arc::new(SimEngine::new());
        let (handle, mut events) = spawn_bridge(Arc::clone(&engine));
        handle.call(Command::Init).await.expect("init");
        handle.call(Command::Init).await.expect("init again");
        assert_eq!(events.drain(), vec![Event::SessionStarted { restarted: false }]);
        assert_eq!(engine.calls(), vec!["start_session(false)".to_string()]);
    }

    #[tokio::test]
    async fn add_model_before_init_is_rejected() {
        let engine = Arc::new(SimEngine::new());
        let (handle, _events) = spawn_bridge(Arc::clone(&engine));
        let err = handle
            .call(Command::AddModel {
                component_id: "42".to_string(),
                world_position: None,
            })
            .await
            .expect_err("not initialized");
        assert_eq!(err.kind(), ErrorKind::NotInitialized);
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn progress_is_monotonic_and_ends_at_100() {
        let engine = Arc::new(SimEngine::new());
        let (handle, mut events) = spawn_bridge(Arc::clone(&engine));
        handle.call(Command::Init).await.expect("init");
        handle
            .call(Command::AddModel {
                component_id: "42".to_string(),
                world_position: Some(Vec3::new(1.0, 0.0, -1.0)),
            })
            .await
            .expect("add");

        let progress: Vec<u8> = events
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                Event::ModelLoadingProgress { progress, .. } => Some(progress),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![25, 50, 75, 100]);
        let snapshot = handle.snapshot().await.expect("snapshot");
        let id = snapshot.selected.expect("selected");
        assert_eq!(engine.position_of(id), Some(Vec3::new(1.0, 0.0, -1.0)));
        assert_eq!(snapshot.placing, None);
    }

    #[tokio::test]
    async fn critical_engine_error_requires_reinit() {
        let engine = Arc::new(SimEngine::new());
        let (handle, mut events) = spawn_bridge(Arc::clone(&engine));
        handle.call(Command::Init).await.expect("init");
        engine.fail("camera unavailable", true);
        let snapshot = handle.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.session, SessionState::Paused);

        handle.call(Command::Init).await.expect("reinit");
        assert_eq!(
            events.drain(),
            vec![
                Event::SessionStarted { restarted: false },
                Event::critical("camera unavailable"),
                Event::SessionStarted { restarted: true },
            ]
        );
    }

    #[tokio::test]
    async fn non_critical_error_keeps_session_running() {
        let engine = Arc::new(SimEngine::new());
        let (handle, mut events) = spawn_bridge(Arc::clone(&engine));
        handle.call(Command::Init).await.expect("init");
        engine.fail("texture missing", false);
        let snapshot = handle.snapshot().await.expect("snapshot");
        assert_eq!(snapshot.session, SessionState::Running);
        assert_eq!(
            events.drain().pop(),
            Some(Event::non_critical("texture missing"))
        );
    }
}
