//! Logging macros for building call arguments.
//!
//! `fields!` builds an ordered [`Fields`](crate::core::Fields) map and
//! `log_args!` builds the argument list of a log call: an optional object in
//! braces, then a message template and its `%s`/`%d`/`%j` arguments.
//!
//! The level macros check the level first, so disabled calls cost nothing
//! beyond the check.
//!
//! # Examples
//!
//! ```
//! use rust_structured_logger::prelude::*;
//! use rust_structured_logger::{info, warn};
//!
//! let logger = Logger::builder().destination(MemoryDestination::new()).build().unwrap();
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // With format arguments
//! info!(logger, "Server listening on port %d", 8080);
//!
//! // With fields
//! warn!(logger, { "user_id" => 42, "action" => "login" }, "slow %s", "request");
//! ```

/// Build a [`Fields`](crate::core::Fields) map, keeping insertion order.
///
/// # Examples
///
/// ```
/// use rust_structured_logger::fields;
///
/// let fields = fields! { "service" => "api", "port" => 8080 };
/// assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["service", "port"]);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::core::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::core::Fields::new();
        $(
            fields.insert($key, $value);
        )+
        fields
    }};
}

/// Build the [`LogArgs`](crate::core::LogArgs) of a log call.
///
/// # Examples
///
/// ```
/// use rust_structured_logger::log_args;
///
/// let args = log_args!({ "status" => 200 }, "served %s", "/index");
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! log_args {
    ({ $($key:expr => $value:expr),* $(,)? } $(, $arg:expr)* $(,)?) => {
        $crate::core::LogArgs::new()
            .arg($crate::fields! { $($key => $value),* })
            $(.arg($arg))*
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::core::LogArgs::new()
            $(.arg($arg))+
    };
}

/// Log at any level, standard or custom, by name or value.
///
/// # Examples
///
/// ```
/// # use rust_structured_logger::prelude::*;
/// # let logger = Logger::builder()
/// #     .custom_level("audit", 35)
/// #     .destination(MemoryDestination::new())
/// #     .build()
/// #     .unwrap();
/// use rust_structured_logger::log;
/// log!(logger, "audit", "Simple message");
/// log!(logger, Level::Error, "Error code: %d", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($args:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_level_enabled(level) {
            logger.log(level, $crate::log_args!($($args)+));
        }
    }};
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # use rust_structured_logger::prelude::*;
/// # let logger = Logger::builder().level("trace").destination(MemoryDestination::new()).build().unwrap();
/// use rust_structured_logger::trace;
/// trace!(logger, "Entering function: calculate()");
/// trace!(logger, "Variable value: %d", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($args:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Trace, $($args)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($args:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Debug, $($args)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use rust_structured_logger::prelude::*;
/// # let logger = Logger::builder().destination(MemoryDestination::new()).build().unwrap();
/// use rust_structured_logger::info;
/// info!(logger, "Application started");
/// info!(logger, "Processing %d items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($args:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Info, $($args)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($args:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Warn, $($args)+)
    };
}

/// Log an error-level message.
///
/// # Examples
///
/// ```
/// # use rust_structured_logger::prelude::*;
/// # let logger = Logger::builder().destination(MemoryDestination::new()).build().unwrap();
/// use rust_structured_logger::error;
/// error!(logger, { "code" => 500 }, "Failed to connect to %s", "db-1");
/// ```
#[macro_export]
macro_rules! error {
    ($logger:expr, $($args:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Error, $($args)+)
    };
}

/// Log a fatal-level message.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($args:tt)+) => {
        $crate::log!($logger, $crate::core::Level::Fatal, $($args)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{FieldValue, Logger, TimeFunction};
    use crate::destinations::MemoryDestination;

    #[test]
    fn test_fields_macro_order() {
        let fields = fields! { "b" => 1, "a" => "two", };
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(fields.get("a"), Some(&FieldValue::from("two")));
        assert!(fields! {}.is_empty());
    }

    #[test]
    fn test_level_macros() {
        let memory = MemoryDestination::new();
        let output = memory.handle();
        let logger = Logger::builder()
            .destination(memory)
            .base(None)
            .timestamp(TimeFunction::null())
            .build()
            .unwrap();

        debug!(logger, "hidden %d", 1);
        info!(logger, "port %d", 8080);
        error!(logger, { "code" => 500 }, "failed");
        log!(logger, 40u32, { }, "empty object");

        assert_eq!(
            output.lines(),
            vec![
                "{\"level\":30,\"msg\":\"port 8080\",\"v\":1}",
                "{\"level\":50,\"code\":500,\"msg\":\"failed\",\"v\":1}",
                "{\"level\":40,\"msg\":\"empty object\",\"v\":1}",
            ]
        );
    }
}
