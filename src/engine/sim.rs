//! Purpose: In-memory AR engine used by the stdio host and tests.
//! Exports: `SimEngine`.
//! Role: Implements `ArEngine` without rendering; gestures are driven by method calls.
//! Invariants: Object ids are monotonic and never reused within one engine.
//! Invariants: Callbacks fire only for engine-originated changes (gestures, tracking),
//! never as echoes of bridge-initiated calls.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{ArEngine, EngineEvents, ProgressSink};
use crate::catalog::CatalogItem;
use crate::core::error::{Error, ErrorKind};
use crate::core::state::ObjectId;
use crate::core::vec3::Vec3;

const PROGRESS_STEPS: [u8; 4] = [25, 50, 75, 100];

#[derive(Clone, Debug, PartialEq)]
struct SimObject {
    component_id: String,
    loaded: bool,
    position: Option<Vec3>,
}

#[derive(Debug, Default)]
struct SimInner {
    events: Option<EngineEvents>,
    running: bool,
    objects: BTreeMap<ObjectId, SimObject>,
    selected: Option<ObjectId>,
    measurement_shown: bool,
    calls: Vec<String>,
}

#[derive(Debug)]
pub struct SimEngine {
    inner: Mutex<SimInner>,
    next_id: AtomicU64,
    measurement_supported: bool,
    first_plane: Option<Vec3>,
    load_step: Duration,
    failing_components: BTreeSet<String>,
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEngine {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SimInner::default()),
            next_id: AtomicU64::new(1),
            measurement_supported: false,
            first_plane: None,
            load_step: Duration::ZERO,
            failing_components: BTreeSet::new(),
        }
    }

    /// Older engines that still render size overlays.
    pub fn with_measurement_support(mut self, supported: bool) -> Self {
        self.measurement_supported = supported;
        self
    }

    /// Report a tracked plane at `position` every time the session starts.
    pub fn with_first_plane(mut self, position: Option<Vec3>) -> Self {
        self.first_plane = position;
        self
    }

    pub fn with_load_step(mut self, step: Duration) -> Self {
        self.load_step = step;
        self
    }

    pub fn with_failing_component(mut self, component_id: impl Into<String>) -> Self {
        self.failing_components.insert(component_id.into());
        self
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    pub fn selected(&self) -> Option<ObjectId> {
        self.lock().selected
    }

    pub fn position_of(&self, id: ObjectId) -> Option<Vec3> {
        self.lock().objects.get(&id).and_then(|object| object.position)
    }

    pub fn measurement_shown(&self) -> bool {
        self.lock().measurement_shown
    }

    /// Names of every contract method invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// User taps a placed model.
    pub fn tap_object(&self, id: ObjectId) -> bool {
        let (events, previous) = {
            let mut inner = self.lock();
            match inner.objects.get(&id) {
                Some(object) if object.loaded => {}
                _ => return false,
            }
            let previous = inner.selected.replace(id);
            (inner.events.clone(), previous)
        };
        if let Some(events) = events {
            if let Some(previous) = previous.filter(|previous| *previous != id) {
                events.object_deselected(previous);
            }
            events.object_selected(id);
        }
        true
    }

    /// User taps empty space.
    pub fn tap_empty(&self) {
        let (events, previous) = {
            let mut inner = self.lock();
            let previous = inner.selected.take();
            (inner.events.clone(), previous)
        };
        if let (Some(events), Some(previous)) = (events, previous) {
            events.object_deselected(previous);
        }
    }

    pub fn interrupt(&self) {
        let events = {
            let mut inner = self.lock();
            inner.running = false;
            inner.events.clone()
        };
        if let Some(events) = events {
            events.session_interrupted();
        }
    }

    pub fn resume(&self) {
        let events = {
            let mut inner = self.lock();
            inner.running = true;
            inner.events.clone()
        };
        if let Some(events) = events {
            events.session_resumed();
        }
    }

    pub fn detect_plane(&self, position: Option<Vec3>) {
        if let Some(events) = self.events() {
            events.plane_detected(position);
        }
    }

    pub fn fail(&self, message: &str, critical: bool) {
        if let Some(events) = self.events() {
            events.error(message, critical);
        }
    }

    fn events(&self) -> Option<EngineEvents> {
        self.lock().events.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: impl Into<String>) {
        self.lock().calls.push(call.into());
    }
}

#[async_trait]
impl ArEngine for SimEngine {
    fn attach(&self, events: EngineEvents) {
        self.lock().events = Some(events);
    }

    fn start_session(&self, restart: bool) -> Result<(), Error> {
        let events = {
            let mut inner = self.lock();
            inner.calls.push(format!("start_session({restart})"));
            inner.running = true;
            inner.events.clone()
        };
        if let (Some(events), Some(position)) = (events, self.first_plane) {
            events.plane_detected(Some(position));
        }
        Ok(())
    }

    fn pause_session(&self) -> Result<(), Error> {
        let mut inner = self.lock();
        inner.calls.push("pause_session".to_string());
        inner.running = false;
        Ok(())
    }

    fn create_object(&self, item: &CatalogItem) -> Result<ObjectId, Error> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.lock();
        inner.calls.push(format!("create_object({})", item.id));
        inner.objects.insert(
            id,
            SimObject {
                component_id: item.id.clone(),
                loaded: false,
                position: None,
            },
        );
        Ok(id)
    }

    async fn load_object(
        &self,
        id: ObjectId,
        item: &CatalogItem,
        progress: ProgressSink,
    ) -> Result<(), Error> {
        self.record(format!("load_object({id})"));
        let fails = self.failing_components.contains(&item.id);
        for step in PROGRESS_STEPS {
            if fails && step > 50 {
                return Err(Error::new(ErrorKind::ModelLoadFailed)
                    .with_message(format!("unable to load model for component {}", item.id))
                    .with_model_id(id)
                    .with_component_id(item.id.clone()));
            }
            progress.report(step);
            if self.load_step.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.load_step).await;
            }
        }
        let mut inner = self.lock();
        match inner.objects.get_mut(&id) {
            Some(object) => {
                object.loaded = true;
                Ok(())
            }
            None => Err(Error::new(ErrorKind::ModelLoadFailed)
                .with_message("model was removed while loading")
                .with_model_id(id)),
        }
    }

    fn place_object(&self, id: ObjectId, position: Option<Vec3>) -> Result<(), Error> {
        let mut inner = self.lock();
        inner.calls.push(format!("place_object({id})"));
        let object = inner.objects.get_mut(&id).ok_or_else(|| {
            Error::new(ErrorKind::EngineFailure)
                .with_message("cannot place unknown object")
                .with_model_id(id)
        })?;
        object.position = Some(position.unwrap_or(Vec3::ZERO));
        Ok(())
    }

    fn select_object(&self, id: ObjectId) -> Result<(), Error> {
        let mut inner = self.lock();
        inner.calls.push(format!("select_object({id})"));
        if !inner.objects.contains_key(&id) {
            return Err(Error::new(ErrorKind::EngineFailure)
                .with_message("cannot select unknown object")
                .with_model_id(id));
        }
        inner.selected = Some(id);
        Ok(())
    }

    fn deselect_all(&self) -> Result<(), Error> {
        let mut inner = self.lock();
        inner.calls.push("deselect_all".to_string());
        inner.selected = None;
        Ok(())
    }

    fn remove_object(&self, id: ObjectId) -> Result<(), Error> {
        let mut inner = self.lock();
        inner.calls.push(format!("remove_object({id})"));
        inner.objects.remove(&id);
        if inner.selected == Some(id) {
            inner.selected = None;
        }
        Ok(())
    }

    fn list_objects(&self) -> Vec<ObjectId> {
        self.lock().objects.keys().copied().collect()
    }

    fn set_measurement_shown(&self, shown: bool) -> bool {
        if !self.measurement_supported {
            return false;
        }
        let mut inner = self.lock();
        inner.calls.push(format!("set_measurement_shown({shown})"));
        inner.measurement_shown = shown;
        inner.measurement_shown
    }
}
