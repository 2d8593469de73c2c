//! Purpose: Decode inbound channel calls into typed bridge commands.
//! Exports: `Command`, `decode_command`, `Command::encode`.
//! Role: Pure validation between the wire envelope and the bridge controller.
//! Invariants: Decoding has no side effects and never touches the engine.
//! Invariants: Unknown methods decode to `Command::Unimplemented`, never dropped.
//! Invariants: `encode` followed by `decode_command` yields the same command.

use serde_json::{Map, Value, json};

use super::error::{Error, ErrorKind};
use super::state::ObjectId;
use super::vec3::Vec3;

pub const INIT: &str = "init";
pub const DISPOSE: &str = "dispose";
pub const ADD_MODEL: &str = "addModel";
pub const RESET_SELECTION: &str = "resetSelection";
pub const REMOVE_SELECTED_MODEL: &str = "removeSelectedModel";
pub const REMOVE_MODEL: &str = "removeModel";
pub const SET_MEASUREMENT_SHOWN: &str = "setMeasurementShown";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Init,
    Dispose,
    AddModel {
        component_id: String,
        world_position: Option<Vec3>,
    },
    ResetSelection,
    RemoveSelectedModel,
    RemoveModel {
        model_id: ObjectId,
    },
    SetMeasurementShown {
        value: bool,
    },
    Unimplemented {
        method: String,
    },
}

impl Command {
    pub fn method(&self) -> &str {
        match self {
            Command::Init => INIT,
            Command::Dispose => DISPOSE,
            Command::AddModel { .. } => ADD_MODEL,
            Command::ResetSelection => RESET_SELECTION,
            Command::RemoveSelectedModel => REMOVE_SELECTED_MODEL,
            Command::RemoveModel { .. } => REMOVE_MODEL,
            Command::SetMeasurementShown { .. } => SET_MEASUREMENT_SHOWN,
            Command::Unimplemented { method } => method,
        }
    }

    /// Wire form: method name plus argument map. Ids travel as strings.
    pub fn encode(&self) -> (String, Map<String, Value>) {
        let mut arguments = Map::new();
        match self {
            Command::AddModel {
                component_id,
                world_position,
            } => {
                arguments.insert("componentId".to_string(), json!(component_id));
                if let Some(position) = world_position {
                    arguments.insert("worldPosition".to_string(), position.to_json());
                }
            }
            Command::RemoveModel { model_id } => {
                arguments.insert("modelId".to_string(), json!(model_id.to_string()));
            }
            Command::SetMeasurementShown { value } => {
                arguments.insert("value".to_string(), json!(value));
            }
            _ => {}
        }
        (self.method().to_string(), arguments)
    }
}

pub fn decode_command(method: &str, arguments: &Map<String, Value>) -> Result<Command, Error> {
    match method {
        INIT => Ok(Command::Init),
        DISPOSE => Ok(Command::Dispose),
        ADD_MODEL => {
            let component_id = require_non_blank(arguments, "componentId")?;
            let world_position = match arguments.get("worldPosition") {
                None | Some(Value::Null) => None,
                // an empty list means "no position", same as absent
                Some(Value::Array(items)) if items.is_empty() => None,
                Some(value) => Some(Vec3::from_json(value).map_err(|err| {
                    Error::new(ErrorKind::InvalidArgument).with_message(format!(
                        "'worldPosition' parameter is invalid: {}",
                        err.describe()
                    ))
                })?),
            };
            Ok(Command::AddModel {
                component_id,
                world_position,
            })
        }
        RESET_SELECTION => Ok(Command::ResetSelection),
        REMOVE_SELECTED_MODEL => Ok(Command::RemoveSelectedModel),
        REMOVE_MODEL => {
            let raw = require_non_blank(arguments, "modelId")?;
            // canonical decimal only: no sign, no leading zeros
            let canonical = raw.bytes().all(|b| b.is_ascii_digit())
                && (raw.len() == 1 || !raw.starts_with('0'));
            if !canonical {
                return Err(Error::new(ErrorKind::InvalidArgument).with_message(format!(
                    "'modelId' parameter must be a decimal id, got `{raw}`"
                )));
            }
            let model_id = raw.parse::<ObjectId>().map_err(|err| {
                Error::new(ErrorKind::InvalidArgument)
                    .with_message(format!("'modelId' parameter must be numeric, got `{raw}`"))
                    .with_source(err)
            })?;
            Ok(Command::RemoveModel { model_id })
        }
        SET_MEASUREMENT_SHOWN => {
            let value = arguments
                .get("value")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Ok(Command::SetMeasurementShown { value })
        }
        other => Ok(Command::Unimplemented {
            method: other.to_string(),
        }),
    }
}

fn require_non_blank(arguments: &Map<String, Value>, key: &str) -> Result<String, Error> {
    match arguments.get(key).and_then(Value::as_str) {
        Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
        _ => Err(Error::new(ErrorKind::InvalidArgument)
            .with_message(format!("'{key}' parameter must not be blank."))),
    }
}
