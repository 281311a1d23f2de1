//! Destination sink
//!
//! The sink is the one shared mutable resource of a logger tree. It accepts
//! whole encoded lines, buffers them according to its [`SinkMode`], hands
//! them to its [`Destination`] and reports backpressure to callers.
//!
//! Lifecycle: `Open -> Draining -> Closed`. Writes are accepted only while
//! open; `finalize` drains whatever is buffered or queued, flushes the
//! destination and closes the sink. Dropping the sink finalizes it.

use super::destination::Destination;
use super::error::{LoggerError, Result};
use super::metrics::SinkMetrics;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default time `finalize` waits for the async worker to drain (5 seconds)
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Pending bytes at which `write` starts signalling backpressure
pub const DEFAULT_HIGH_WATER_MARK: usize = 16 * 1024;

// Lines the async worker coalesces into one destination write
const BATCH_SIZE: u64 = 50;

/// Receives transport errors and other diagnostics that cannot be returned
/// to a caller
pub type ErrorCallback = Arc<dyn Fn(&LoggerError) + Send + Sync>;

/// Error callback used when none is configured: one line on stderr
pub fn default_error_callback() -> ErrorCallback {
    Arc::new(|err| eprintln!("[LOGGER ERROR] {}", err))
}

/// How the sink moves bytes to its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkMode {
    /// Every line is written through immediately
    #[default]
    Sync,
    /// Lines accumulate until the buffer holds at least `min_length` bytes
    Buffered { min_length: usize },
    /// A worker thread owns the destination and writes in batches; the
    /// bounded queue blocks writers when full
    Async { queue_capacity: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SinkState {
    Open = 0,
    Draining = 1,
    Closed = 2,
}

impl SinkState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => SinkState::Open,
            1 => SinkState::Draining,
            _ => SinkState::Closed,
        }
    }
}

/// Sink construction options
#[derive(Clone)]
pub struct SinkOptions {
    pub mode: SinkMode,
    pub high_water_mark: usize,
    pub on_error: Option<ErrorCallback>,
}

impl SinkOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mode(mut self, mode: SinkMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn high_water_mark(mut self, bytes: usize) -> Self {
        self.high_water_mark = bytes;
        self
    }

    #[must_use]
    pub fn on_error(mut self, callback: ErrorCallback) -> Self {
        self.on_error = Some(callback);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.high_water_mark == 0 {
            return Err(LoggerError::config(
                "DestinationSink",
                "high_water_mark must be greater than zero",
            ));
        }
        if let SinkMode::Async { queue_capacity: 0 } = self.mode {
            return Err(LoggerError::config(
                "DestinationSink",
                "async queue_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            mode: SinkMode::Sync,
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            on_error: None,
        }
    }
}

impl fmt::Debug for SinkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkOptions")
            .field("mode", &self.mode)
            .field("high_water_mark", &self.high_water_mark)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

pub struct DestinationSink {
    name: String,
    mode: SinkMode,
    state: AtomicU8,
    high_water_mark: usize,
    inner: SinkInner,
    metrics: Arc<SinkMetrics>,
    on_error: ErrorCallback,
}

enum SinkInner {
    Direct(Mutex<DirectState>),
    Worker(WorkerHandle),
}

struct DirectState {
    destination: Box<dyn Destination>,
    buffer: Vec<u8>,
    buffered_lines: u64,
    min_length: usize,
}

struct WorkerHandle {
    sender: RwLock<Option<Sender<Command>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    pending: Arc<AtomicUsize>,
}

enum Command {
    Line(String),
    Flush(Sender<()>),
    Reopen(Sender<Result<()>>),
}

impl DestinationSink {
    /// Synchronous sink with default options
    pub fn new<D: Destination + 'static>(destination: D) -> Self {
        Self::build(Box::new(destination), SinkOptions::default())
    }

    pub fn with_options<D: Destination + 'static>(
        destination: D,
        options: SinkOptions,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(Box::new(destination), options))
    }

    pub fn from_boxed(destination: Box<dyn Destination>, options: SinkOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self::build(destination, options))
    }

    fn build(destination: Box<dyn Destination>, options: SinkOptions) -> Self {
        let name = destination.name().to_string();
        let metrics = Arc::new(SinkMetrics::new());
        let on_error = options.on_error.unwrap_or_else(default_error_callback);

        let inner = match options.mode {
            SinkMode::Sync => SinkInner::Direct(Mutex::new(DirectState::new(destination, 0))),
            SinkMode::Buffered { min_length } => {
                SinkInner::Direct(Mutex::new(DirectState::new(destination, min_length)))
            }
            SinkMode::Async { queue_capacity } => SinkInner::Worker(WorkerHandle::spawn(
                destination,
                queue_capacity,
                Arc::clone(&metrics),
                Arc::clone(&on_error),
            )),
        };

        Self {
            name,
            mode: options.mode,
            state: AtomicU8::new(SinkState::Open as u8),
            high_water_mark: options.high_water_mark,
            inner,
            metrics,
            on_error,
        }
    }

    /// Append one encoded line
    ///
    /// The line is written as a unit; concurrent writers never interleave
    /// inside a line. Returns `true` when pending bytes reached the high-water
    /// mark and the caller should slow down.
    pub fn write(&self, line: &str) -> Result<bool> {
        let backpressure = match &self.inner {
            SinkInner::Direct(state) => {
                let (backpressure, error) = {
                    let mut state = state.lock();
                    // Checked under the lock so nothing lands after the final flush.
                    if self.state() != SinkState::Open {
                        drop(state);
                        return self.reject();
                    }
                    let error = state.append(line, &self.metrics);
                    (state.buffer.len() >= self.high_water_mark, error)
                };
                if let Some(err) = error {
                    self.report_error(&err);
                }
                backpressure
            }
            SinkInner::Worker(worker) => {
                let sender = worker.sender.read();
                let Some(sender) = sender.as_ref() else {
                    return self.reject();
                };
                if self.state() != SinkState::Open {
                    return self.reject();
                }
                worker.pending.fetch_add(line.len(), Ordering::AcqRel);
                if sender.send(Command::Line(line.to_string())).is_err() {
                    worker.pending.fetch_sub(line.len(), Ordering::AcqRel);
                    return Err(LoggerError::ChannelSendError);
                }
                worker.pending.load(Ordering::Acquire) >= self.high_water_mark
            }
        };

        if backpressure {
            self.metrics.record_backpressure();
        }
        Ok(backpressure)
    }

    fn reject(&self) -> Result<bool> {
        self.metrics.record_rejected();
        Err(LoggerError::SinkClosed)
    }

    /// Push everything buffered or queued to the destination and flush it
    ///
    /// Blocks until done. Transport errors go to the error callback.
    pub fn flush(&self) -> Result<()> {
        if self.state() == SinkState::Closed {
            return Err(LoggerError::SinkClosed);
        }
        match &self.inner {
            SinkInner::Direct(state) => {
                let errors = state.lock().drain(&self.metrics);
                for err in &errors {
                    self.report_error(err);
                }
                Ok(())
            }
            SinkInner::Worker(worker) => {
                let (ack_tx, ack_rx) = bounded(1);
                {
                    let sender = worker.sender.read();
                    // Gone while draining: finalize does the last flush.
                    let Some(sender) = sender.as_ref() else {
                        return Ok(());
                    };
                    sender
                        .send(Command::Flush(ack_tx))
                        .map_err(|_| LoggerError::ChannelSendError)?;
                }
                ack_rx.recv().map_err(|_| LoggerError::ChannelSendError)
            }
        }
    }

    /// Reopen the destination, e.g. after the log file was rotated away
    pub fn reopen(&self) -> Result<()> {
        if self.state() != SinkState::Open {
            return Err(LoggerError::SinkClosed);
        }
        match &self.inner {
            SinkInner::Direct(state) => {
                let (errors, result) = {
                    let mut state = state.lock();
                    let errors = state.drain(&self.metrics);
                    let name = self.name.clone();
                    let result = guarded(&name, "reopen", || state.destination.reopen());
                    (errors, result)
                };
                for err in &errors {
                    self.report_error(err);
                }
                result
            }
            SinkInner::Worker(worker) => {
                let (ack_tx, ack_rx) = bounded(1);
                {
                    let sender = worker.sender.read();
                    let Some(sender) = sender.as_ref() else {
                        return Err(LoggerError::SinkClosed);
                    };
                    sender
                        .send(Command::Reopen(ack_tx))
                        .map_err(|_| LoggerError::ChannelSendError)?;
                }
                ack_rx.recv().map_err(|_| LoggerError::ChannelSendError)?
            }
        }
    }

    /// Drain, flush and close the sink
    ///
    /// Re-entrant: only the first call does the work and returns `true`;
    /// later or concurrent calls return `false` immediately.
    pub fn finalize(&self) -> bool {
        if self
            .state
            .compare_exchange(
                SinkState::Open as u8,
                SinkState::Draining as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return false;
        }

        match &self.inner {
            SinkInner::Direct(state) => {
                let errors = state.lock().drain(&self.metrics);
                for err in &errors {
                    self.report_error(err);
                }
            }
            SinkInner::Worker(worker) => {
                // Closing the channel lets the worker drain and exit.
                drop(worker.sender.write().take());
                worker.join(DEFAULT_SHUTDOWN_TIMEOUT);
            }
        }

        self.state.store(SinkState::Closed as u8, Ordering::Release);
        true
    }

    pub fn state(&self) -> SinkState {
        SinkState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_open(&self) -> bool {
        self.state() == SinkState::Open
    }

    pub fn mode(&self) -> SinkMode {
        self.mode
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Bytes accepted but not yet handed to the destination
    pub fn pending_bytes(&self) -> usize {
        match &self.inner {
            SinkInner::Direct(state) => state.lock().buffer.len(),
            SinkInner::Worker(worker) => worker.pending.load(Ordering::Acquire),
        }
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Hand an error to the configured error callback
    pub fn report_error(&self, err: &LoggerError) {
        report(&self.on_error, err);
    }
}

impl Drop for DestinationSink {
    fn drop(&mut self) {
        self.finalize();

        let errors = self.metrics.write_errors();
        if errors > 0 {
            eprintln!(
                "[LOGGER WARNING] Sink '{}' closed after {} failed writes",
                self.name, errors
            );
        }
    }
}

impl fmt::Debug for DestinationSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationSink")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("state", &self.state())
            .field("high_water_mark", &self.high_water_mark)
            .finish()
    }
}

impl DirectState {
    fn new(destination: Box<dyn Destination>, min_length: usize) -> Self {
        Self {
            destination,
            buffer: Vec::with_capacity(min_length.max(256)),
            buffered_lines: 0,
            min_length,
        }
    }

    fn append(&mut self, line: &str, metrics: &SinkMetrics) -> Option<LoggerError> {
        self.buffer.extend_from_slice(line.as_bytes());
        self.buffered_lines += 1;
        if self.buffer.len() >= self.min_length {
            return self.write_buffer(metrics);
        }
        None
    }

    fn write_buffer(&mut self, metrics: &SinkMetrics) -> Option<LoggerError> {
        if self.buffer.is_empty() {
            return None;
        }
        let lines = std::mem::take(&mut self.buffered_lines);
        let bytes = self.buffer.len() as u64;
        let name = self.destination.name().to_string();
        let destination = &mut self.destination;
        let buffer = &self.buffer;
        let result = guarded(&name, "write", || destination.write(buffer));
        // Failed bytes are discarded, never retried.
        self.buffer.clear();
        match result {
            Ok(()) => {
                metrics.record_written(lines, bytes);
                None
            }
            Err(err) => {
                metrics.record_write_error();
                Some(err)
            }
        }
    }

    fn drain(&mut self, metrics: &SinkMetrics) -> Vec<LoggerError> {
        let mut errors = Vec::new();
        if let Some(err) = self.write_buffer(metrics) {
            errors.push(err);
        }
        let name = self.destination.name().to_string();
        let destination = &mut self.destination;
        if let Err(err) = guarded(&name, "flush", || destination.flush()) {
            metrics.record_write_error();
            errors.push(err);
        }
        errors
    }
}

impl WorkerHandle {
    fn spawn(
        destination: Box<dyn Destination>,
        queue_capacity: usize,
        metrics: Arc<SinkMetrics>,
        on_error: ErrorCallback,
    ) -> Self {
        let (sender, receiver) = bounded(queue_capacity);
        let pending = Arc::new(AtomicUsize::new(0));
        let mut worker = Worker {
            destination,
            batch: Vec::new(),
            batch_lines: 0,
            metrics,
            pending: Arc::clone(&pending),
            on_error,
        };

        let handle = thread::Builder::new()
            .name("log-sink-worker".to_string())
            .spawn(move || worker.run(receiver));

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                // Without a worker the queue is never read: report and refuse writes.
                eprintln!("[LOGGER ERROR] Failed to spawn sink worker thread: {}", e);
                None
            }
        };
        let sender = if handle.is_some() { Some(sender) } else { None };

        Self {
            sender: RwLock::new(sender),
            handle: Mutex::new(handle),
            pending,
        }
    }

    fn join(&self, timeout: Duration) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        // An error callback running on the worker may finalize the sink.
        if handle.thread().id() == thread::current().id() {
            return;
        }

        let start = Instant::now();
        loop {
            if handle.is_finished() {
                if let Err(e) = handle.join() {
                    eprintln!("[LOGGER ERROR] Sink worker thread panicked during shutdown: {:?}", e);
                }
                return;
            }

            if start.elapsed() >= timeout {
                eprintln!(
                    "[LOGGER WARNING] Sink worker did not finish within {:?} timeout. \
                     Some logs may be lost.",
                    timeout
                );
                return;
            }

            thread::sleep(Duration::from_millis(5));
        }
    }
}

struct Worker {
    destination: Box<dyn Destination>,
    batch: Vec<u8>,
    batch_lines: u64,
    metrics: Arc<SinkMetrics>,
    pending: Arc<AtomicUsize>,
    on_error: ErrorCallback,
}

impl Worker {
    fn run(&mut self, receiver: Receiver<Command>) {
        while let Ok(command) = receiver.recv() {
            let mut next = Some(command);
            while let Some(command) = next.take() {
                match command {
                    Command::Line(line) => {
                        self.batch.extend_from_slice(line.as_bytes());
                        self.batch_lines += 1;
                        // Collect more lines without blocking, up to a batch
                        if self.batch_lines < BATCH_SIZE {
                            next = receiver.try_recv().ok();
                        }
                    }
                    Command::Flush(ack) => {
                        self.write_batch();
                        self.flush_destination();
                        let _ = ack.send(());
                    }
                    Command::Reopen(ack) => {
                        self.write_batch();
                        let name = self.destination.name().to_string();
                        let destination = &mut self.destination;
                        let _ = ack.send(guarded(&name, "reopen", || destination.reopen()));
                    }
                }
            }
            self.write_batch();
        }

        // Channel closed: everything queued has been received.
        self.write_batch();
        self.flush_destination();
    }

    fn write_batch(&mut self) {
        if self.batch.is_empty() {
            return;
        }
        let bytes = self.batch.len();
        let lines = std::mem::take(&mut self.batch_lines);
        let name = self.destination.name().to_string();
        let destination = &mut self.destination;
        let batch = &self.batch;
        let result = guarded(&name, "write", || destination.write(batch));
        self.batch.clear();
        self.pending.fetch_sub(bytes, Ordering::AcqRel);

        match result {
            Ok(()) => self.metrics.record_written(lines, bytes as u64),
            Err(err) => {
                self.metrics.record_write_error();
                report(&self.on_error, &err);
            }
        }
    }

    fn flush_destination(&mut self) {
        let name = self.destination.name().to_string();
        let destination = &mut self.destination;
        if let Err(err) = guarded(&name, "flush", || destination.flush()) {
            self.metrics.record_write_error();
            report(&self.on_error, &err);
        }
    }
}

/// Run a destination call, turning a panic into a destination error
fn guarded<T>(name: &str, operation: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic_info) => {
            let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic_info.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            Err(LoggerError::destination(
                name,
                format!("panicked during {}: {}", operation, panic_msg),
            ))
        }
    }
}

fn report(callback: &ErrorCallback, err: &LoggerError) {
    // A panicking callback must not take the logging thread down with it.
    if catch_unwind(AssertUnwindSafe(|| callback(err))).is_err() {
        eprintln!("[LOGGER CRITICAL] Error callback panicked while reporting: {}", err);
    }
}
