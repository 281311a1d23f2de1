//! Main logger implementation
//!
//! A [`Logger`] is a cheap handle (`Clone`, `Send + Sync`). A root logger and
//! every child created from it share one level registry, one encoder and one
//! [`DestinationSink`]; each logger has its own level, bindings, serializers
//! and redaction rules.
//!
//! Per call, in order: level check, log method hook, argument parsing, mixin,
//! serializers, log formatter, redaction, encoding, sink write.

use super::{
    args::{LogArgs, NormalizedCall},
    bindings::Bindings,
    destination::Destination,
    encoder::{BindingsFormatterFn, Encoder, EncoderConfig, Formatters, LogFormatterFn},
    error::{LoggerError, Result},
    event::LogEvent,
    level::{Level, LevelInfo, LevelMap, LevelSpec},
    metrics::SinkMetrics,
    redact::{RedactOptions, RedactScope, Redactor},
    serializers::Serializers,
    sink::{DestinationSink, ErrorCallback, SinkMode, SinkOptions, DEFAULT_HIGH_WATER_MARK},
    timestamp::TimeFunction,
    value::{FieldValue, Fields},
};
use crate::destinations::ConsoleDestination;
use parking_lot::RwLock;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

pub const DEFAULT_LEVEL: &str = "info";

/// Extra fields merged into every call's object; the object wins on conflicts
pub type MixinFn = Arc<dyn Fn(&Fields, &LevelInfo) -> Fields + Send + Sync>;

/// Sees the raw arguments of every enabled call; returns the arguments to
/// log, or `None` to drop the call
pub type LogMethodHook = Arc<dyn Fn(LogArgs, &LevelInfo) -> Option<LogArgs> + Send + Sync>;

pub type LevelChangeFn = Arc<dyn Fn(&LevelChange) + Send + Sync>;

/// Notification passed to level-change listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelChange {
    pub label: String,
    pub value: u32,
    pub previous_label: String,
    pub previous_value: u32,
}

/// Handle returned by [`Logger::on_level_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// State shared by a root logger and all of its descendants
struct Tree {
    sink: Arc<DestinationSink>,
    levels: Arc<LevelMap>,
    encoder: Encoder,
    time: TimeFunction,
    mixin: Option<MixinFn>,
    hook: Option<LogMethodHook>,
    bindings_formatter: Option<BindingsFormatterFn>,
    log_formatter: Option<LogFormatterFn>,
    enabled: bool,
    next_listener: AtomicU64,
}

struct LoggerInner {
    tree: Arc<Tree>,
    level: AtomicU32,
    bindings: Bindings,
    merged_bindings: Arc<Fields>,
    serializers: Arc<Serializers>,
    redactor: Arc<Redactor>,
    listeners: RwLock<Vec<(ListenerId, LevelChangeFn)>>,
    flush_each_write: bool,
}

#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

/// Overrides applied when creating a child logger
#[derive(Debug, Clone, Default)]
pub struct ChildOptions {
    pub level: Option<String>,
    pub serializers: Option<Serializers>,
    /// Replaces the inherited rules; an empty path list disables redaction
    pub redact: Option<RedactOptions>,
}

impl ChildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    #[must_use]
    pub fn serializers(mut self, serializers: Serializers) -> Self {
        self.serializers = Some(serializers);
        self
    }

    #[must_use]
    pub fn redact(mut self, redact: RedactOptions) -> Self {
        self.redact = Some(redact);
        self
    }
}

impl Logger {
    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use rust_structured_logger::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .level("debug")
    ///     .destination(MemoryDestination::new())
    ///     .build()
    ///     .unwrap();
    /// assert!(logger.is_level_enabled("debug"));
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    fn from_parts(
        tree: Arc<Tree>,
        level: u32,
        bindings: Bindings,
        serializers: Arc<Serializers>,
        redactor: Arc<Redactor>,
        flush_each_write: bool,
    ) -> Self {
        let merged_bindings = Arc::new(bindings.merged());
        Self {
            inner: Arc::new(LoggerInner {
                tree,
                level: AtomicU32::new(level),
                bindings,
                merged_bindings,
                serializers,
                redactor,
                listeners: RwLock::new(Vec::new()),
                flush_each_write,
            }),
        }
    }

    #[inline]
    pub fn trace<A: Into<LogArgs>>(&self, args: A) {
        self.log_standard(Level::Trace, args);
    }

    #[inline]
    pub fn debug<A: Into<LogArgs>>(&self, args: A) {
        self.log_standard(Level::Debug, args);
    }

    #[inline]
    pub fn info<A: Into<LogArgs>>(&self, args: A) {
        self.log_standard(Level::Info, args);
    }

    #[inline]
    pub fn warn<A: Into<LogArgs>>(&self, args: A) {
        self.log_standard(Level::Warn, args);
    }

    #[inline]
    pub fn error<A: Into<LogArgs>>(&self, args: A) {
        self.log_standard(Level::Error, args);
    }

    #[inline]
    pub fn fatal<A: Into<LogArgs>>(&self, args: A) {
        self.log_standard(Level::Fatal, args);
    }

    fn log_standard<A: Into<LogArgs>>(&self, level: Level, args: A) {
        match self.inner.tree.levels.standard(level) {
            Some(value) => {
                if self.enabled_for(value) {
                    self.dispatch(value, args.into());
                }
            }
            None => self.report(&LoggerError::unknown_level(level.to_str())),
        }
    }

    /// Log at a standard or custom level, by name or value
    ///
    /// Errors (unknown level, encoding failure, closed sink) go to the error
    /// callback; use [`Logger::try_log`] to receive them instead.
    pub fn log<'a, A: Into<LogArgs>>(&self, level: impl Into<LevelSpec<'a>>, args: A) {
        match self.inner.tree.levels.resolve(level) {
            Ok(value) => {
                if self.enabled_for(value) {
                    self.dispatch(value, args.into());
                }
            }
            Err(e) => self.report(&e),
        }
    }

    /// Log and return the sink's backpressure flag
    ///
    /// `Ok(false)` when the level is disabled.
    pub fn try_log<'a, A: Into<LogArgs>>(
        &self,
        level: impl Into<LevelSpec<'a>>,
        args: A,
    ) -> Result<bool> {
        let value = self.inner.tree.levels.resolve(level)?;
        if !self.enabled_for(value) {
            return Ok(false);
        }
        self.emit(value, args.into())
    }

    fn dispatch(&self, value: u32, args: LogArgs) {
        if let Err(e) = self.emit(value, args) {
            self.report(&e);
        }
    }

    #[inline]
    fn enabled_for(&self, value: u32) -> bool {
        self.inner.tree.enabled && LevelMap::is_enabled(self.level_value(), value)
    }

    fn emit(&self, value: u32, args: LogArgs) -> Result<bool> {
        let inner = &*self.inner;
        let tree = &*inner.tree;
        let level = LevelInfo {
            label: tree.levels.label(value).unwrap_or_default().to_string(),
            value,
        };

        let args = match &tree.hook {
            Some(hook) => match hook(args, &level) {
                Some(args) => args,
                None => return Ok(false),
            },
            None => args,
        };

        let call = NormalizedCall::parse(args);
        let mut object = call.object.unwrap_or_default();

        if let Some(mixin) = &tree.mixin {
            let mut mixed = mixin(&object, &level);
            mixed.merge_from(&object);
            object = mixed;
        }

        let faults = inner.serializers.apply(&mut object);
        self.record_faults(&faults);

        if let Some(formatter) = &tree.log_formatter {
            object = formatter(object);
        }

        inner.redactor.apply(&mut object);
        let bindings = if inner.redactor.scope() == RedactScope::ObjectAndBindings
            && !inner.redactor.is_empty()
        {
            let mut redacted = (*inner.merged_bindings).clone();
            inner.redactor.apply(&mut redacted);
            Arc::new(redacted)
        } else {
            Arc::clone(&inner.merged_bindings)
        };

        let event = LogEvent {
            time: tree.time.now(),
            level,
            bindings,
            object,
            message: call.message,
            format_args: call.format_args,
        };

        let line = tree.encoder.encode(&event).inspect_err(|_| {
            tree.sink.metrics().record_encoding_error();
        })?;

        let backpressure = tree.sink.write(&line)?;
        if inner.flush_each_write {
            tree.sink.flush()?;
        }
        Ok(backpressure)
    }

    /// Create a child logger with additional bindings
    ///
    /// ```
    /// use rust_structured_logger::prelude::*;
    ///
    /// let memory = MemoryDestination::new();
    /// let output = memory.handle();
    /// let logger = Logger::builder().destination(memory).base(None).build().unwrap();
    ///
    /// let child = logger.child(fields! { "request_id" => "r-1" }).unwrap();
    /// child.info("handled");
    ///
    /// assert_eq!(output.json_lines().unwrap()[0]["request_id"], "r-1");
    /// ```
    pub fn child(&self, bindings: Fields) -> Result<Logger> {
        self.child_with(bindings, ChildOptions::default())
    }

    pub fn child_with(&self, bindings: Fields, options: ChildOptions) -> Result<Logger> {
        let inner = &*self.inner;
        let tree = &inner.tree;

        let level = match &options.level {
            Some(level) => tree.levels.resolve(level.as_str())?,
            None => self.level_value(),
        };

        let redactor = match &options.redact {
            Some(redact) => Arc::new(Redactor::compile(redact)?),
            None => Arc::clone(&inner.redactor),
        };

        let serializers = match &options.serializers {
            Some(overrides) => Arc::new(inner.serializers.merged_with(overrides)),
            None => Arc::clone(&inner.serializers),
        };

        let mut own = bindings;
        let faults = serializers.apply(&mut own);
        self.record_faults(&faults);
        if let Some(formatter) = &tree.bindings_formatter {
            own = formatter(own);
        }

        Ok(Logger::from_parts(
            Arc::clone(tree),
            level,
            inner.bindings.child(own),
            serializers,
            redactor,
            inner.flush_each_write,
        ))
    }

    /// Logger sharing this one's configuration that flushes the sink after
    /// every line, for use right before the process exits
    pub fn final_logger(&self) -> Logger {
        let inner = &*self.inner;
        Logger::from_parts(
            Arc::clone(&inner.tree),
            self.level_value(),
            inner.bindings.clone(),
            Arc::clone(&inner.serializers),
            Arc::clone(&inner.redactor),
            true,
        )
    }

    /// Change the minimum level and notify listeners
    pub fn set_level<'a>(&self, level: impl Into<LevelSpec<'a>>) -> Result<()> {
        let levels = &self.inner.tree.levels;
        let value = levels.resolve(level)?;
        let previous = self.inner.level.swap(value, Ordering::AcqRel);

        let change = LevelChange {
            label: levels.label(value).unwrap_or_default().to_string(),
            value,
            previous_label: levels.label(previous).unwrap_or_default().to_string(),
            previous_value: previous,
        };

        // Snapshot so listeners may register or remove listeners themselves.
        let listeners: Vec<LevelChangeFn> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, f)| Arc::clone(f))
            .collect();
        for listener in listeners {
            listener(&change);
        }
        Ok(())
    }

    /// Register a level-change listener; listeners run in registration order
    pub fn on_level_change<F>(&self, f: F) -> ListenerId
    where
        F: Fn(&LevelChange) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.tree.next_listener.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.write().push((id, Arc::new(f)));
        id
    }

    pub fn remove_level_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Label of the current level
    pub fn level(&self) -> String {
        self.inner
            .tree
            .levels
            .label(self.level_value())
            .unwrap_or_default()
            .to_string()
    }

    #[inline]
    pub fn level_value(&self) -> u32 {
        self.inner.level.load(Ordering::Acquire)
    }

    /// Whether a call at `level` would be written; unknown levels are not
    pub fn is_level_enabled<'a>(&self, level: impl Into<LevelSpec<'a>>) -> bool {
        self.inner
            .tree
            .levels
            .resolve(level)
            .map(|value| self.enabled_for(value))
            .unwrap_or(false)
    }

    pub fn levels(&self) -> &LevelMap {
        &self.inner.tree.levels
    }

    /// Merged bindings of this logger and its ancestors
    pub fn bindings(&self) -> Fields {
        (*self.inner.merged_bindings).clone()
    }

    /// Number of bindings entries from the root down to this logger
    pub fn depth(&self) -> usize {
        self.inner.bindings.depth()
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.tree.sink.flush()
    }

    /// Drain and close the shared sink; see [`DestinationSink::finalize`]
    pub fn finalize(&self) -> bool {
        self.inner.tree.sink.finalize()
    }

    pub fn sink(&self) -> &Arc<DestinationSink> {
        &self.inner.tree.sink
    }

    pub fn metrics(&self) -> &SinkMetrics {
        self.inner.tree.sink.metrics()
    }

    fn report(&self, err: &LoggerError) {
        self.inner.tree.sink.report_error(err);
    }

    fn record_faults(&self, faults: &[LoggerError]) {
        record_faults(&self.inner.tree.sink, faults);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("depth", &self.depth())
            .field("sink", &self.inner.tree.sink)
            .finish()
    }
}

enum BaseBindings {
    Default,
    Custom(Fields),
    Omit,
}

fn record_faults(sink: &DestinationSink, faults: &[LoggerError]) {
    sink.metrics().record_serialization_faults(faults.len() as u64);
    for fault in faults {
        sink.report_error(fault);
    }
}

fn default_base() -> Fields {
    let mut base = Fields::new().with_field("pid", std::process::id());
    if let Ok(name) = hostname::get() {
        base.insert("hostname", name.to_string_lossy().into_owned());
    }
    base
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_structured_logger::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder()
///     .level("debug")
///     .name("api")
///     .redact(RedactOptions::new(["password", "user.token"]))
///     .serializers(Serializers::standard())
///     .destination(MemoryDestination::new())
///     .buffer_mode(SinkMode::Async { queue_capacity: 1024 })
///     .on_error(Arc::new(|err| eprintln!("ALERT: {}", err)))
///     .build()
///     .unwrap();
/// ```
pub struct LoggerBuilder {
    level: String,
    custom_levels: Vec<(String, u32)>,
    use_only_custom_levels: bool,
    base: BaseBindings,
    name: Option<String>,
    encoder: EncoderConfig,
    redact: Option<RedactOptions>,
    serializers: Serializers,
    time: TimeFunction,
    mixin: Option<MixinFn>,
    hook: Option<LogMethodHook>,
    enabled: bool,
    formatters: Formatters,
    destination: Option<Box<dyn Destination>>,
    sink: Option<Arc<DestinationSink>>,
    mode: SinkMode,
    high_water_mark: usize,
    on_error: Option<ErrorCallback>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            level: DEFAULT_LEVEL.to_string(),
            custom_levels: Vec::new(),
            use_only_custom_levels: false,
            base: BaseBindings::Default,
            name: None,
            encoder: EncoderConfig::default(),
            redact: None,
            serializers: Serializers::new(),
            time: TimeFunction::default(),
            mixin: None,
            hook: None,
            enabled: true,
            formatters: Formatters::default(),
            destination: None,
            sink: None,
            mode: SinkMode::Sync,
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            on_error: None,
        }
    }

    /// Set the minimum level, by standard or custom name
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn custom_level(mut self, name: impl Into<String>, value: u32) -> Self {
        self.custom_levels.push((name.into(), value));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn custom_levels<I, S>(mut self, levels: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        self.custom_levels
            .extend(levels.into_iter().map(|(name, value)| (name.into(), value)));
        self
    }

    /// Drop the standard levels and use only the custom ones
    #[must_use = "builder methods return a new value"]
    pub fn use_only_custom_levels(mut self, only_custom: bool) -> Self {
        self.use_only_custom_levels = only_custom;
        self
    }

    /// Root bindings; `None` omits the default `pid` and `hostname`
    #[must_use = "builder methods return a new value"]
    pub fn base(mut self, base: Option<Fields>) -> Self {
        self.base = match base {
            Some(fields) => BaseBindings::Custom(fields),
            None => BaseBindings::Omit,
        };
        self
    }

    /// Adds a `name` binding to the root logger
    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn message_key(mut self, key: impl Into<String>) -> Self {
        self.encoder.message_key = key.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level_key(mut self, key: impl Into<String>) -> Self {
        self.encoder.level_key = key.into();
        self
    }

    /// Write each call's object under `key` instead of merging it into the line
    #[must_use = "builder methods return a new value"]
    pub fn nested_key(mut self, key: impl Into<String>) -> Self {
        self.encoder.nested_key = Some(key.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level_labels(mut self, labels: bool) -> Self {
        self.encoder.level_labels = labels;
        self
    }

    /// Replace circular references with `"[Circular]"` (default) or fail
    #[must_use = "builder methods return a new value"]
    pub fn safe(mut self, safe: bool) -> Self {
        self.encoder.safe = safe;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn redact(mut self, redact: RedactOptions) -> Self {
        self.redact = Some(redact);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn serializers(mut self, serializers: Serializers) -> Self {
        self.serializers = serializers;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn timestamp(mut self, time: impl Into<TimeFunction>) -> Self {
        self.time = time.into();
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn mixin<F>(mut self, f: F) -> Self
    where
        F: Fn(&Fields, &LevelInfo) -> Fields + Send + Sync + 'static,
    {
        self.mixin = Some(Arc::new(f));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn log_method_hook<F>(mut self, f: F) -> Self
    where
        F: Fn(LogArgs, &LevelInfo) -> Option<LogArgs> + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(f));
        self
    }

    /// `false` turns every log call into a no-op
    #[must_use = "builder methods return a new value"]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn formatters(mut self, formatters: Formatters) -> Self {
        self.formatters = formatters;
        self
    }

    /// Destination for a new sink owned by this logger tree (default: stdout)
    #[must_use = "builder methods return a new value"]
    pub fn destination<D: Destination + 'static>(mut self, destination: D) -> Self {
        self.destination = Some(Box::new(destination));
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn boxed_destination(mut self, destination: Box<dyn Destination>) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Write to an existing sink instead of creating one
    ///
    /// Sink options given to this builder are ignored.
    #[must_use = "builder methods return a new value"]
    pub fn sink(mut self, sink: Arc<DestinationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn buffer_mode(mut self, mode: SinkMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn high_water_mark(mut self, bytes: usize) -> Self {
        self.high_water_mark = bytes;
        self
    }

    /// Set the callback receiving errors that log calls cannot return
    ///
    /// Default: a `[LOGGER ERROR]` line on stderr.
    #[must_use = "builder methods return a new value"]
    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }

    /// Build the Logger
    ///
    /// Invalid levels, redaction paths, timestamp patterns and sink options
    /// are rejected here.
    pub fn build(self) -> Result<Logger> {
        self.time.validate()?;
        let levels =
            LevelMap::with_custom(self.custom_levels, self.use_only_custom_levels)?;
        let level = levels.resolve(self.level.as_str()).map_err(|e| {
            if levels.only_custom() {
                LoggerError::config(
                    "Logger",
                    format!(
                        "level '{}' is not one of the custom levels (use_only_custom_levels is set)",
                        self.level
                    ),
                )
            } else {
                e
            }
        })?;

        let redactor = match &self.redact {
            Some(redact) => Redactor::compile(redact)?,
            None => Redactor::disabled(),
        };

        let sink = match self.sink {
            Some(sink) => sink,
            None => {
                let destination = self
                    .destination
                    .unwrap_or_else(|| Box::new(ConsoleDestination::new()));
                let options = SinkOptions {
                    mode: self.mode,
                    high_water_mark: self.high_water_mark,
                    on_error: self.on_error,
                };
                Arc::new(DestinationSink::from_boxed(destination, options)?)
            }
        };

        let mut root = match self.base {
            BaseBindings::Default => default_base(),
            BaseBindings::Custom(fields) => fields,
            BaseBindings::Omit => Fields::new(),
        };
        if let Some(name) = self.name {
            root.insert("name", name);
        }
        record_faults(&sink, &self.serializers.apply(&mut root));
        if let Some(formatter) = &self.formatters.bindings {
            root = formatter(root);
        }

        let encoder = Encoder::new(self.encoder).with_level_formatter(self.formatters.level);
        let tree = Arc::new(Tree {
            sink,
            levels: Arc::new(levels),
            encoder,
            time: self.time,
            mixin: self.mixin,
            hook: self.hook,
            bindings_formatter: self.formatters.bindings,
            log_formatter: self.formatters.log,
            enabled: self.enabled,
            next_listener: AtomicU64::new(0),
        });

        Ok(Logger::from_parts(
            tree,
            level,
            Bindings::root(root),
            Arc::new(self.serializers),
            Arc::new(redactor),
            false,
        ))
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Called once with the error (if any) that ends the process
pub type FinalHandlerFn = Arc<dyn Fn(Option<&FieldValue>, &Logger) + Send + Sync>;

/// Last-chance logging before the process exits
///
/// Runs its handler with a final logger (one that flushes after every
/// line), then flushes and finalizes the sink. Only the first call to
/// [`FinalizeHandler::handle`] does anything.
///
/// Panics reach it through [`FinalizeHandler::install_panic_hook`].
/// Process-terminating signals are wired by the application: whatever
/// receives SIGINT or SIGTERM calls `handle(None)` before exiting.
///
/// # Example
///
/// ```no_run
/// use rust_structured_logger::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder()
///     .buffer_mode(SinkMode::Async { queue_capacity: 1024 })
///     .build()
///     .unwrap();
/// let handler = Arc::new(FinalizeHandler::with_default_handler(&logger));
/// handler.install_panic_hook();
///
/// // Called from the signal handling task, e.g. after
/// // `tokio::signal::ctrl_c().await` returns.
/// let on_terminate = {
///     let handler = Arc::clone(&handler);
///     move || {
///         handler.handle(None);
///         std::process::exit(0);
///     }
/// };
///
/// logger.info("serving");
/// on_terminate();
/// ```
pub struct FinalizeHandler {
    logger: Logger,
    handler: FinalHandlerFn,
    fired: AtomicBool,
}

impl FinalizeHandler {
    pub fn new<F>(logger: &Logger, handler: F) -> Self
    where
        F: Fn(Option<&FieldValue>, &Logger) + Send + Sync + 'static,
    {
        Self {
            logger: logger.final_logger(),
            handler: Arc::new(handler),
            fired: AtomicBool::new(false),
        }
    }

    /// Handler that logs the error, if there is one, at `fatal`
    pub fn with_default_handler(logger: &Logger) -> Self {
        Self::new(logger, |error, final_logger| {
            if let Some(error) = error {
                let message = error
                    .resolved()
                    .as_object()
                    .and_then(|fields| fields.get("message"))
                    .and_then(FieldValue::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| "final".to_string());
                let object = Fields::new().with_field("err", error.clone());
                final_logger.fatal(LogArgs::new().arg(object).arg(message));
            }
        })
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Run the handler, then flush and close the sink
    ///
    /// Returns `false` if the handler already ran.
    pub fn handle(&self, error: Option<FieldValue>) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }

        if catch_unwind(AssertUnwindSafe(|| (self.handler)(error.as_ref(), &self.logger))).is_err()
        {
            eprintln!("[LOGGER CRITICAL] Finalize handler panicked. Flushing anyway.");
        }

        match self.logger.flush() {
            Ok(()) | Err(LoggerError::SinkClosed) => {}
            Err(e) => self.logger.report(&e),
        }
        self.logger.finalize();
        true
    }

    /// Run this handler from the panic hook, then the previously installed hook
    pub fn install_panic_hook(self: &Arc<Self>) {
        let handler = Arc::clone(self);
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let mut error = Fields::new()
                .with_field("type", "Panic")
                .with_field("message", info.to_string());
            if let Some(location) = info.location() {
                error.insert("location", location.to_string());
            }
            handler.handle(Some(FieldValue::Object(error)));
            previous(info);
        }));
    }
}

impl fmt::Debug for FinalizeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinalizeHandler")
            .field("logger", &self.logger)
            .field("fired", &self.has_fired())
            .finish()
    }
}
