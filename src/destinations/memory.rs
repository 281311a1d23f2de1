//! In-memory destination
//!
//! Captures everything written to it. Mostly useful in tests and for
//! handing log output to code that inspects it in-process.

use crate::core::{Destination, LoggerError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared view of a [`MemoryDestination`]'s contents
///
/// The destination itself is moved into a sink; keep a handle to read what
/// was written.
#[derive(Debug, Clone, Default)]
pub struct MemoryHandle {
    buffer: Arc<Mutex<Vec<u8>>>,
    flushes: Arc<AtomicUsize>,
    failing: Arc<AtomicBool>,
}

impl MemoryHandle {
    /// Everything written so far, as text
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Written lines without their terminators
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Written lines parsed as JSON
    pub fn json_lines(&self) -> Result<Vec<serde_json::Value>> {
        self.lines()
            .iter()
            .map(|line| serde_json::from_str(line).map_err(LoggerError::from))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    /// Number of times the destination was flushed
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Make subsequent writes fail, to exercise transport error handling
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
pub struct MemoryDestination {
    handle: MemoryHandle,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> MemoryHandle {
        self.handle.clone()
    }
}

impl Destination for MemoryDestination {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.handle.failing.load(Ordering::Relaxed) {
            return Err(LoggerError::destination("memory", "write refused"));
        }
        self.handle.buffer.lock().extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.handle.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
