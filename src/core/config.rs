//! Serializable logger configuration
//!
//! Everything that can be expressed as data (no closures) can be loaded from
//! JSON and turned into a [`LoggerBuilder`]. Callbacks such as mixins, hooks
//! and custom serializers are added to the returned builder in code.
//!
//! ```
//! use rust_structured_logger::core::LoggerConfig;
//!
//! let config = LoggerConfig::from_json_str(r#"{
//!     "level": "debug",
//!     "name": "billing",
//!     "redact": { "paths": ["card.number"] },
//!     "destination": { "type": "stderr" },
//!     "sink": { "mode": { "type": "async", "queue_capacity": 256 } }
//! }"#).unwrap();
//!
//! assert_eq!(config.level, "debug");
//! ```

use super::{
    destination::Destination,
    encoder::{DEFAULT_LEVEL_KEY, DEFAULT_MESSAGE_KEY},
    error::{LoggerError, Result},
    logger::{Logger, LoggerBuilder, DEFAULT_LEVEL},
    redact::{Censor, RedactOptions, RedactScope},
    serializers::{std_serializers, Serializers},
    sink::{SinkMode, DEFAULT_HIGH_WATER_MARK},
    timestamp::TimestampFormat,
    value::{FieldValue, Fields},
};
use crate::destinations::{ConsoleDestination, ConsoleTarget};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(feature = "file")]
use crate::destinations::{FileDestination, FileOptions};

/// Where lines are written
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DestinationConfig {
    #[default]
    Stdout,
    Stderr,
    File {
        path: PathBuf,
        #[serde(default = "default_true")]
        append: bool,
        #[serde(default)]
        mkdir: bool,
    },
}

impl DestinationConfig {
    /// Open the configured destination
    pub fn open(&self) -> Result<Box<dyn Destination>> {
        match self {
            DestinationConfig::Stdout => Ok(Box::new(ConsoleDestination::new())),
            DestinationConfig::Stderr => {
                Ok(Box::new(ConsoleDestination::with_target(ConsoleTarget::Stderr)))
            }
            #[cfg(feature = "file")]
            DestinationConfig::File { path, append, mkdir } => {
                let options = FileOptions {
                    append: *append,
                    mkdir: *mkdir,
                };
                Ok(Box::new(FileDestination::with_options(path, options)?))
            }
            #[cfg(not(feature = "file"))]
            DestinationConfig::File { .. } => Err(LoggerError::config(
                "DestinationConfig",
                "file destinations require the 'file' feature",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub mode: SinkMode,
    pub high_water_mark: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            mode: SinkMode::Sync,
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedactConfig {
    pub paths: Vec<String>,
    /// Replacement value; any JSON value, `"[Redacted]"` when absent
    pub censor: Option<serde_json::Value>,
    pub remove: bool,
    pub scope: RedactScope,
}

impl From<&RedactConfig> for RedactOptions {
    fn from(config: &RedactConfig) -> Self {
        let censor = match &config.censor {
            None => Censor::default(),
            Some(serde_json::Value::String(text)) => Censor::Text(text.clone()),
            Some(value) => Censor::Value(FieldValue::from(value.clone())),
        };
        RedactOptions::new(config.paths.iter().cloned())
            .censor(censor)
            .remove(config.remove)
            .scope(config.scope)
    }
}

fn default_true() -> bool {
    true
}

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub level: String,
    pub custom_levels: BTreeMap<String, u32>,
    pub use_only_custom_levels: bool,
    pub name: Option<String>,
    /// Replaces the default `pid`/`hostname` bindings
    pub base: Option<serde_json::Map<String, serde_json::Value>>,
    /// With no `base` given, `false` omits the default bindings
    pub include_base: bool,
    pub message_key: String,
    pub level_key: String,
    pub nested_key: Option<String>,
    pub level_labels: bool,
    pub timestamp: TimestampFormat,
    pub redact: Option<RedactConfig>,
    /// Names of built-in serializers to install: `err`, `req`, `res`
    pub serializers: Vec<String>,
    pub safe: bool,
    pub enabled: bool,
    pub destination: DestinationConfig,
    pub sink: SinkConfig,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            custom_levels: BTreeMap::new(),
            use_only_custom_levels: false,
            name: None,
            base: None,
            include_base: true,
            message_key: DEFAULT_MESSAGE_KEY.to_string(),
            level_key: DEFAULT_LEVEL_KEY.to_string(),
            nested_key: None,
            level_labels: false,
            timestamp: TimestampFormat::EpochMillis,
            redact: None,
            serializers: Vec::new(),
            safe: true,
            enabled: true,
            destination: DestinationConfig::Stdout,
            sink: SinkConfig::default(),
        }
    }
}

impl LoggerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| LoggerError::config("LoggerConfig", format!("invalid JSON: {}", e)))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            LoggerError::io_operation("reading logger config", path.display().to_string(), e)
        })?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Built-in serializers named by this configuration
    pub fn serializer_set(&self) -> Result<Serializers> {
        let mut serializers = Serializers::new();
        for name in &self.serializers {
            match name.as_str() {
                "err" => serializers.insert("err", std_serializers::err),
                "req" => serializers.insert("req", std_serializers::req),
                "res" => serializers.insert("res", std_serializers::res),
                other => {
                    return Err(LoggerError::config(
                        "LoggerConfig",
                        format!("unknown serializer '{}' (expected err, req or res)", other),
                    ))
                }
            }
        }
        Ok(serializers)
    }

    /// Shortcut for `LoggerBuilder::from_config(self)?.build()`
    pub fn build(&self) -> Result<Logger> {
        LoggerBuilder::from_config(self)?.build()
    }
}

impl LoggerBuilder {
    /// Builder preloaded from a configuration
    ///
    /// Opens the configured destination, so file errors surface here.
    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        config.timestamp.validate()?;
        let mut builder = LoggerBuilder::new()
            .level(config.level.clone())
            .custom_levels(config.custom_levels.iter().map(|(name, value)| (name.clone(), *value)))
            .use_only_custom_levels(config.use_only_custom_levels)
            .message_key(config.message_key.clone())
            .level_key(config.level_key.clone())
            .level_labels(config.level_labels)
            .timestamp(config.timestamp.clone())
            .serializers(config.serializer_set()?)
            .safe(config.safe)
            .enabled(config.enabled)
            .buffer_mode(config.sink.mode)
            .high_water_mark(config.sink.high_water_mark);

        if let Some(nested_key) = &config.nested_key {
            builder = builder.nested_key(nested_key.clone());
        }
        if let Some(name) = &config.name {
            builder = builder.name(name.clone());
        }
        match &config.base {
            Some(base) => {
                let fields: Fields = base
                    .iter()
                    .map(|(key, value)| (key.clone(), FieldValue::from(value.clone())))
                    .collect();
                builder = builder.base(Some(fields));
            }
            None if !config.include_base => builder = builder.base(None),
            None => {}
        }
        if let Some(redact) = &config.redact {
            builder = builder.redact(RedactOptions::from(redact));
        }

        let destination = config.destination.open()?;
        Ok(builder.boxed_destination(destination))
    }
}
