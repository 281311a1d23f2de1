//! # Rust Structured Logger
//!
//! A fast structured logger that writes one JSON object per line.
//!
//! ## Features
//!
//! - **Structured output**: every call becomes a single JSON line with
//!   `level`, `time`, bindings, the call's fields, `msg` and `v`
//! - **Child loggers**: bindings are merged once, when the child is created
//! - **Redaction**: censor or remove values by path, wildcards included
//! - **Serializers**: per-key transforms that can never break a log call
//! - **Sinks**: synchronous, buffered or worker-thread delivery with
//!   backpressure reporting and a timed drain on shutdown
//!
//! ## Example
//!
//! ```
//! use rust_structured_logger::prelude::*;
//!
//! let memory = MemoryDestination::new();
//! let output = memory.handle();
//!
//! let logger = Logger::builder()
//!     .destination(memory)
//!     .redact(RedactOptions::new(["user.password"]))
//!     .build()
//!     .unwrap();
//!
//! let request = logger.child(fields! { "request_id" => 7 }).unwrap();
//! request.info(log_args!(
//!     { "user" => fields! { "name" => "ada", "password" => "hunter2" } },
//!     "login from %s",
//!     "10.0.0.1"
//! ));
//!
//! let line = &output.json_lines().unwrap()[0];
//! assert_eq!(line["msg"], "login from 10.0.0.1");
//! assert_eq!(line["user"]["password"], "[Redacted]");
//! ```

pub mod core;
pub mod destinations;
pub mod macros;

pub mod prelude {
    pub use crate::core::{
        ChildOptions, Censor, Destination, DestinationSink, FieldValue, Fields, FinalizeHandler,
        Formatters, Level, LevelInfo, LogArgs, Logger, LoggerBuilder, LoggerConfig, LoggerError,
        RedactOptions, RedactScope, Result, Serializers, SharedValue, SinkMetrics, SinkMode,
        SinkOptions, TimeFunction, TimestampFormat,
    };
    pub use crate::destinations::{ConsoleDestination, MemoryDestination, WriterDestination};
    #[cfg(feature = "file")]
    pub use crate::destinations::FileDestination;
    pub use crate::{fields, log_args};
}

pub use crate::core::{
    ChildOptions, Destination, DestinationSink, FieldValue, Fields, FinalizeHandler, Level,
    LogArgs, Logger, LoggerBuilder, LoggerConfig, LoggerError, RedactOptions, Result,
    Serializers, SinkMetrics, SinkMode, TimeFunction, TimestampFormat, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use destinations::{ConsoleDestination, MemoryDestination};
