//! Error types for the logger system

pub type Result<T> = std::result::Result<T, LoggerError>;

/// Boxed error returned by serializers and other user callbacks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Level name or value not present in the level registry
    #[error("Unknown log level: '{level}'")]
    UnknownLevel { level: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// A serializer failed for a single field
    #[error("Serializer for '{key}' failed: {message}")]
    Serialization { key: String, message: String },

    /// A log line could not be encoded
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Write attempted after the sink started draining or closed
    #[error("Destination sink is closed")]
    SinkClosed,

    /// Destination error with its name
    #[error("Destination '{name}' error: {message}")]
    Destination { name: String, message: String },

    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Channel send error
    #[error("Failed to send data to the sink worker")]
    ChannelSendError,
}

impl LoggerError {
    /// Create an unknown level error
    pub fn unknown_level(level: impl Into<String>) -> Self {
        LoggerError::UnknownLevel {
            level: level.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a serialization fault for a key
    pub fn serialization(key: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Serialization {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        LoggerError::Encoding {
            message: message.into(),
        }
    }

    /// Create a destination error
    pub fn destination(name: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Destination {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// True for errors raised while building a logger or child
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LoggerError::UnknownLevel { .. } | LoggerError::InvalidConfiguration { .. }
        )
    }
}
