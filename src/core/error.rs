use std::error::Error as StdError;
use std::fmt;

use super::state::ObjectId;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Internal,
    InvalidArgument,
    NotFound,
    ModelLoadFailed,
    EngineFailure,
    NotInitialized,
    Unimplemented,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    model_id: Option<ObjectId>,
    component_id: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            model_id: None,
            component_id: None,
            source: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn model_id(&self) -> Option<ObjectId> {
        self.model_id
    }

    pub fn component_id(&self) -> Option<&str> {
        self.component_id.as_deref()
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_model_id(mut self, model_id: ObjectId) -> Self {
        self.model_id = Some(model_id);
        self
    }

    pub fn with_component_id(mut self, component_id: impl Into<String>) -> Self {
        self.component_id = Some(component_id.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Human-readable text for the channel: the message if set, else a kind default.
    pub fn describe(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        match self.kind {
            ErrorKind::Internal => "internal error".to_string(),
            ErrorKind::InvalidArgument => "invalid argument".to_string(),
            ErrorKind::NotFound => "not found".to_string(),
            ErrorKind::ModelLoadFailed => "model loading failed".to_string(),
            ErrorKind::EngineFailure => "AR engine failure".to_string(),
            ErrorKind::NotInitialized => "AR view is not initialized".to_string(),
            ErrorKind::Unimplemented => "method not implemented".to_string(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(model_id) = self.model_id {
            write!(f, " (model: {model_id})")?;
        }
        if let Some(component_id) = &self.component_id {
            write!(f, " (component: {component_id})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

/// Stable wire code carried by every failed command result.
pub fn error_code(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidArgument => "400",
        ErrorKind::NotFound => "404",
        ErrorKind::NotInitialized => "412",
        ErrorKind::Internal => "500",
        ErrorKind::Unimplemented => "501",
        ErrorKind::ModelLoadFailed => "502",
        ErrorKind::EngineFailure => "503",
    }
}

pub fn to_exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Internal => 1,
        ErrorKind::InvalidArgument => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::ModelLoadFailed => 4,
        ErrorKind::EngineFailure => 5,
        ErrorKind::NotInitialized => 6,
        ErrorKind::Unimplemented => 7,
    }
}
