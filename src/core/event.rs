//! Purpose: Define outbound bridge events and their fixed channel payloads.
//! Exports: `Event`, `event_json`, event name constants.
//! Role: Single encoder for every event the bridge delivers to the host.
//! Invariants: Each event name has exactly one payload shape.
//! Invariants: Numeric ids are encoded as strings; vectors as `[x, y, z]`.

use serde_json::{Value, json};

use super::state::{ObjectId, Signal};
use super::vec3::Vec3;

pub const ON_AR_SESSION_STARTED: &str = "onArSessionStarted";
pub const ON_AR_SESSION_PAUSED: &str = "onArSessionPaused";
pub const ON_AR_FIRST_PLANE_DETECTED: &str = "onArFirstPlaneDetected";
pub const ON_AR_MODEL_ADDED: &str = "onArModelAdded";
pub const ON_MODEL_SELECTED: &str = "onModelSelected";
pub const ON_MODEL_DELETED: &str = "onModelDeleted";
pub const ON_SELECTION_RESET: &str = "onSelectionReset";
pub const ON_MODEL_LOADING_PROGRESS: &str = "onModelLoadingProgress";
pub const ON_ERROR: &str = "onError";
pub const ON_AR_SHOW_HELP_MESSAGE: &str = "onArShowHelpMessage";
pub const ON_AR_HIDE_HELP_MESSAGE: &str = "onArHideHelpMessage";
pub const ON_SIGN_OUT: &str = "onSignOut";

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    SessionStarted {
        restarted: bool,
    },
    SessionPaused,
    FirstPlaneDetected {
        position: Option<Vec3>,
    },
    ModelAdded {
        model_id: ObjectId,
        component_id: String,
    },
    ModelSelected {
        model_id: ObjectId,
        component_id: String,
    },
    ModelDeleted {
        model_id: ObjectId,
        component_id: String,
    },
    SelectionReset,
    ModelLoadingProgress {
        component_id: String,
        progress: u8,
    },
    Error {
        is_critical: bool,
        message: String,
    },
    ShowHelpMessage {
        message: String,
    },
    HideHelpMessage,
    SignOut {
        message: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::SessionStarted { .. } => ON_AR_SESSION_STARTED,
            Event::SessionPaused => ON_AR_SESSION_PAUSED,
            Event::FirstPlaneDetected { .. } => ON_AR_FIRST_PLANE_DETECTED,
            Event::ModelAdded { .. } => ON_AR_MODEL_ADDED,
            Event::ModelSelected { .. } => ON_MODEL_SELECTED,
            Event::ModelDeleted { .. } => ON_MODEL_DELETED,
            Event::SelectionReset => ON_SELECTION_RESET,
            Event::ModelLoadingProgress { .. } => ON_MODEL_LOADING_PROGRESS,
            Event::Error { .. } => ON_ERROR,
            Event::ShowHelpMessage { .. } => ON_AR_SHOW_HELP_MESSAGE,
            Event::HideHelpMessage => ON_AR_HIDE_HELP_MESSAGE,
            Event::SignOut { .. } => ON_SIGN_OUT,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Event::SessionStarted { restarted } => json!(restarted),
            Event::SessionPaused | Event::SelectionReset | Event::HideHelpMessage => Value::Null,
            Event::FirstPlaneDetected { position } => position.unwrap_or(Vec3::ZERO).to_json(),
            Event::ModelAdded {
                model_id,
                component_id,
            }
            | Event::ModelSelected {
                model_id,
                component_id,
            }
            | Event::ModelDeleted {
                model_id,
                component_id,
            } => model_payload(*model_id, component_id),
            Event::ModelLoadingProgress {
                component_id,
                progress,
            } => json!({
                "componentId": component_id,
                "progress": (*progress).min(100),
            }),
            Event::Error {
                is_critical,
                message,
            } => json!({
                "isCritical": is_critical,
                "message": message,
            }),
            Event::ShowHelpMessage { message } | Event::SignOut { message } => json!(message),
        }
    }

    pub fn critical(message: impl Into<String>) -> Self {
        Event::Error {
            is_critical: true,
            message: message.into(),
        }
    }

    pub fn non_critical(message: impl Into<String>) -> Self {
        Event::Error {
            is_critical: false,
            message: message.into(),
        }
    }
}

impl From<Signal> for Event {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Added { id, component_id } => Event::ModelAdded {
                model_id: id,
                component_id,
            },
            Signal::Selected { id, component_id } => Event::ModelSelected {
                model_id: id,
                component_id,
            },
            Signal::Deselected { .. } => Event::SelectionReset,
            Signal::Removed { id, component_id } => Event::ModelDeleted {
                model_id: id,
                component_id,
            },
        }
    }
}

fn model_payload(model_id: ObjectId, component_id: &str) -> Value {
    json!({
        "modelId": model_id.to_string(),
        "componentId": component_id,
    })
}

/// Channel line for an event: `{"event": name, "arguments": payload}`.
pub fn event_json(event: &Event) -> Value {
    json!({
        "event": event.name(),
        "arguments": event.payload(),
    })
}
