//! Purpose: Define the contract between the bridge and the external AR engine.
//! Exports: `ArEngine`, `EngineEvents`, `EngineCallback`, `ProgressSink`, `sim`.
//! Role: Typed facade over the SDK; callbacks flow back through `EngineEvents`.
//! Invariants: Callbacks may fire from any thread; they only enqueue, never touch bridge state.
//! Invariants: Callbacks after the bridge is gone are dropped, not errors.

pub mod sim;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bridge::Inbound;
use crate::catalog::CatalogItem;
use crate::core::error::Error;
use crate::core::state::ObjectId;
use crate::core::vec3::Vec3;

#[async_trait]
pub trait ArEngine: Send + Sync {
    /// Wires engine callbacks to the bridge. Called once before any other method.
    fn attach(&self, events: EngineEvents);

    fn start_session(&self, restart: bool) -> Result<(), Error>;

    fn pause_session(&self) -> Result<(), Error>;

    /// Creates the rendering-side node for a catalog item and returns its id.
    fn create_object(&self, item: &CatalogItem) -> Result<ObjectId, Error>;

    /// Downloads and prepares the model. Progress is reported as a percentage.
    async fn load_object(
        &self,
        id: ObjectId,
        item: &CatalogItem,
        progress: ProgressSink,
    ) -> Result<(), Error>;

    /// Anchors a loaded object, at `position` or at the engine's default spot.
    fn place_object(&self, id: ObjectId, position: Option<Vec3>) -> Result<(), Error>;

    fn select_object(&self, id: ObjectId) -> Result<(), Error>;

    fn deselect_all(&self) -> Result<(), Error>;

    fn remove_object(&self, id: ObjectId) -> Result<(), Error>;

    fn list_objects(&self) -> Vec<ObjectId>;

    /// Engines that dropped size overlays keep this default: always off, nothing mutated.
    fn set_measurement_shown(&self, shown: bool) -> bool {
        let _ = shown;
        false
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EngineCallback {
    SessionInterrupted,
    SessionResumed,
    Error { message: String, critical: bool },
    Unsupported { message: String },
    PlaneDetected { position: Option<Vec3> },
    ObjectAdded { id: ObjectId, component_id: String },
    ObjectAddFailed { message: String },
    ObjectRemoved { id: ObjectId },
    ObjectSelected { id: ObjectId },
    ObjectDeselected { id: ObjectId },
    HelpShown { message: String },
    HelpHidden,
}

/// Callback registration handed to the engine; one method per callback kind.
#[derive(Clone, Debug)]
pub struct EngineEvents {
    tx: Option<mpsc::WeakUnboundedSender<Inbound>>,
}

impl EngineEvents {
    pub(crate) fn new(tx: mpsc::WeakUnboundedSender<Inbound>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A registration that drops everything; for engines used without a bridge.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    pub fn session_interrupted(&self) -> bool {
        self.emit(EngineCallback::SessionInterrupted)
    }

    pub fn session_resumed(&self) -> bool {
        self.emit(EngineCallback::SessionResumed)
    }

    pub fn error(&self, message: impl Into<String>, critical: bool) -> bool {
        self.emit(EngineCallback::Error {
            message: message.into(),
            critical,
        })
    }

    pub fn unsupported(&self, message: impl Into<String>) -> bool {
        self.emit(EngineCallback::Unsupported {
            message: message.into(),
        })
    }

    pub fn plane_detected(&self, position: Option<Vec3>) -> bool {
        self.emit(EngineCallback::PlaneDetected { position })
    }

    pub fn object_added(&self, id: ObjectId, component_id: impl Into<String>) -> bool {
        self.emit(EngineCallback::ObjectAdded {
            id,
            component_id: component_id.into(),
        })
    }

    pub fn object_add_failed(&self, message: impl Into<String>) -> bool {
        self.emit(EngineCallback::ObjectAddFailed {
            message: message.into(),
        })
    }

    pub fn object_removed(&self, id: ObjectId) -> bool {
        self.emit(EngineCallback::ObjectRemoved { id })
    }

    pub fn object_selected(&self, id: ObjectId) -> bool {
        self.emit(EngineCallback::ObjectSelected { id })
    }

    pub fn object_deselected(&self, id: ObjectId) -> bool {
        self.emit(EngineCallback::ObjectDeselected { id })
    }

    pub fn help_shown(&self, message: impl Into<String>) -> bool {
        self.emit(EngineCallback::HelpShown {
            message: message.into(),
        })
    }

    pub fn help_hidden(&self) -> bool {
        self.emit(EngineCallback::HelpHidden)
    }

    /// Returns false when the bridge is gone and the callback was dropped.
    fn emit(&self, callback: EngineCallback) -> bool {
        let Some(tx) = self.tx.as_ref().and_then(|weak| weak.upgrade()) else {
            tracing::debug!(?callback, "engine callback dropped: bridge gone");
            return false;
        };
        tx.send(Inbound::Engine(callback)).is_ok()
    }
}

/// Reports load progress for one object back to the bridge.
#[derive(Clone, Debug)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<Inbound>>,
    id: ObjectId,
}

impl ProgressSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Inbound>, id: ObjectId) -> Self {
        Self { tx: Some(tx), id }
    }

    pub fn detached(id: ObjectId) -> Self {
        Self { tx: None, id }
    }

    pub fn object_id(&self) -> ObjectId {
        self.id
    }

    /// `percent` is clamped to 0..=100.
    pub fn report(&self, percent: u8) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(Inbound::LoadProgress {
                id: self.id,
                percent: percent.min(100),
            });
        }
    }

    /// Convenience for engines that track a completed fraction.
    pub fn report_fraction(&self, completed: f64) {
        let percent = (completed.clamp(0.0, 1.0) * 100.0) as u8;
        self.report(percent);
    }
}
