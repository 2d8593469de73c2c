//! Purpose: Frame method calls, results and events for a line-oriented JSON channel.
//! Exports: `CallId`, `MethodCall`, `ChannelError`, `parse_call_line`, `response_json`.
//! Role: Transport-agnostic envelope shared by the stdio host and tests.
//! Invariants: A malformed envelope still produces a response (with `id: null` if unknown).
//! Invariants: Failures carry a stable `code` plus a human `message`, never type names.
//! Invariants: Success responses always include `result`, even when it is null.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::core::command::Command;
use crate::core::error::{Error, ErrorKind, error_code};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallId {
    String(String),
    Number(i64),
    Null,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodCall {
    pub id: CallId,
    pub method: String,
    pub arguments: Map<String, Value>,
}

impl MethodCall {
    pub fn from_command(id: CallId, command: &Command) -> Self {
        let (method, arguments) = command.encode();
        Self {
            id,
            method,
            arguments,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "method": self.method,
            "arguments": Value::Object(self.arguments.clone()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelError {
    pub code: String,
    pub message: String,
}

impl From<&Error> for ChannelError {
    fn from(err: &Error) -> Self {
        Self {
            code: error_code(err.kind()).to_string(),
            message: err.describe(),
        }
    }
}

/// A rejected envelope, with whatever id could be recovered.
#[derive(Debug)]
pub struct Rejected {
    pub id: CallId,
    pub error: Error,
}

pub fn parse_call_line(line: &str) -> Result<MethodCall, Rejected> {
    let value = serde_json::from_str::<Value>(line).map_err(|err| Rejected {
        id: CallId::Null,
        error: Error::new(ErrorKind::InvalidArgument)
            .with_message("invalid JSON")
            .with_source(err),
    })?;
    parse_call(value)
}

pub fn parse_call(value: Value) -> Result<MethodCall, Rejected> {
    let mut object = match value {
        Value::Object(object) => object,
        _ => return Err(rejected(CallId::Null, "call must be a JSON object")),
    };

    let id = match object.remove("id") {
        None => CallId::Null,
        Some(raw) => parse_call_id(raw).map_err(|message| rejected(CallId::Null, message))?,
    };

    let method = match object.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => return Err(rejected(id, "missing method field")),
    };

    let arguments = match object.remove("arguments") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(arguments)) => arguments,
        Some(_) => return Err(rejected(id, "`arguments` must be an object")),
    };

    Ok(MethodCall {
        id,
        method,
        arguments,
    })
}

fn parse_call_id(value: Value) -> Result<CallId, &'static str> {
    match value {
        Value::String(value) => Ok(CallId::String(value)),
        Value::Number(value) => value
            .as_i64()
            .map(CallId::Number)
            .ok_or("id must be an integer number"),
        Value::Null => Ok(CallId::Null),
        _ => Err("id must be a string, integer number, or null"),
    }
}

fn rejected(id: CallId, message: &'static str) -> Rejected {
    Rejected {
        id,
        error: Error::new(ErrorKind::InvalidArgument).with_message(message),
    }
}

pub fn response_json(id: &CallId, result: &Result<Value, Error>) -> Value {
    match result {
        Ok(value) => json!({ "id": id, "result": value }),
        Err(err) => json!({ "id": id, "error": ChannelError::from(err) }),
    }
}
