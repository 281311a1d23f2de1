//! Core logger types and traits

pub mod args;
pub mod bindings;
pub mod config;
pub mod destination;
pub mod encoder;
pub mod error;
pub mod event;
pub mod format;
pub mod level;
pub mod logger;
pub mod metrics;
pub mod redact;
pub mod serializers;
pub mod sink;
pub mod timestamp;
pub mod value;

pub use args::{LogArgs, NormalizedCall};
pub use bindings::Bindings;
pub use config::{DestinationConfig, LoggerConfig, RedactConfig, SinkConfig};
pub use destination::Destination;
pub use encoder::{
    to_json, Encoder, EncoderConfig, Formatters, CIRCULAR, DEFAULT_LEVEL_KEY,
    DEFAULT_MESSAGE_KEY, LOG_VERSION,
};
pub use error::{BoxError, LoggerError, Result};
pub use event::LogEvent;
pub use format::format_message;
pub use level::{Level, LevelInfo, LevelMap, LevelSpec, SILENT, SILENT_VALUE};
pub use logger::{
    ChildOptions, FinalizeHandler, LevelChange, ListenerId, LogMethodHook, Logger,
    LoggerBuilder, MixinFn, DEFAULT_LEVEL,
};
pub use metrics::SinkMetrics;
pub use redact::{Censor, RedactOptions, RedactScope, Redactor, DEFAULT_CENSOR};
pub use serializers::{std_serializers, SerializerFn, Serializers, SERIALIZATION_ERROR_KEY};
pub use sink::{
    default_error_callback, DestinationSink, ErrorCallback, SinkMode, SinkOptions, SinkState,
    DEFAULT_HIGH_WATER_MARK, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use timestamp::{TimeFunction, TimestampFormat};
pub use value::{FieldValue, Fields, SharedValue};
