//! The per-call record handed to the encoder

use super::level::LevelInfo;
use super::value::{FieldValue, Fields};
use std::sync::Arc;

/// One log call, after hooks, serializers and redaction have run
///
/// Events live for the duration of a single call. `bindings` is the merged
/// view of the logger's bindings chain, shared between calls.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub time: Option<FieldValue>,
    pub level: LevelInfo,
    pub bindings: Arc<Fields>,
    pub object: Fields,
    pub message: Option<String>,
    pub format_args: Vec<FieldValue>,
}

impl LogEvent {
    pub fn new(level: LevelInfo) -> Self {
        Self {
            time: None,
            level,
            bindings: Arc::new(Fields::new()),
            object: Fields::new(),
            message: None,
            format_args: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_time(mut self, time: Option<FieldValue>) -> Self {
        self.time = time;
        self
    }

    #[must_use]
    pub fn with_bindings(mut self, bindings: Arc<Fields>) -> Self {
        self.bindings = bindings;
        self
    }

    #[must_use]
    pub fn with_object(mut self, object: Fields) -> Self {
        self.object = object;
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_format_args(mut self, args: Vec<FieldValue>) -> Self {
        self.format_args = args;
        self
    }
}
