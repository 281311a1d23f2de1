//! Sink metrics for observability
//!
//! Counters for monitoring logger health: throughput, transport failures,
//! backpressure and records that were altered because a field could not be
//! serialized.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics for a destination sink and the loggers writing to it
///
/// # Example
///
/// ```
/// use rust_structured_logger::SinkMetrics;
///
/// let metrics = SinkMetrics::new();
///
/// metrics.record_written(1, 42);
/// metrics.record_write_error();
///
/// assert_eq!(metrics.lines_written(), 1);
/// assert_eq!(metrics.bytes_written(), 42);
/// assert_eq!(metrics.write_errors(), 1);
/// ```
#[derive(Debug)]
pub struct SinkMetrics {
    /// Lines handed to the destination successfully
    lines_written: AtomicU64,

    /// Bytes handed to the destination successfully
    bytes_written: AtomicU64,

    /// Failed destination writes or flushes
    write_errors: AtomicU64,

    /// Writes that returned the backpressure signal
    backpressure_events: AtomicU64,

    /// Writes refused because the sink was draining or closed
    rejected_writes: AtomicU64,

    /// Fields replaced by a serialization error descriptor
    serialization_faults: AtomicU64,

    /// Calls that failed to encode
    encoding_errors: AtomicU64,
}

impl SinkMetrics {
    /// Create a new metrics instance with all counters at zero
    pub const fn new() -> Self {
        Self {
            lines_written: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
            backpressure_events: AtomicU64::new(0),
            rejected_writes: AtomicU64::new(0),
            serialization_faults: AtomicU64::new(0),
            encoding_errors: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn lines_written(&self) -> u64 {
        self.lines_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn backpressure_events(&self) -> u64 {
        self.backpressure_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rejected_writes(&self) -> u64 {
        self.rejected_writes.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn serialization_faults(&self) -> u64 {
        self.serialization_faults.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn encoding_errors(&self) -> u64 {
        self.encoding_errors.load(Ordering::Relaxed)
    }

    /// Record `lines` lines totalling `bytes` bytes reaching the destination
    #[inline]
    pub fn record_written(&self, lines: u64, bytes: u64) {
        self.lines_written.fetch_add(lines, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a failed write, returning the previous count
    #[inline]
    pub fn record_write_error(&self) -> u64 {
        self.write_errors.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_backpressure(&self) -> u64 {
        self.backpressure_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_rejected(&self) -> u64 {
        self.rejected_writes.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_serialization_faults(&self, count: u64) {
        if count > 0 {
            self.serialization_faults.fetch_add(count, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_encoding_error(&self) -> u64 {
        self.encoding_errors.fetch_add(1, Ordering::Relaxed)
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.lines_written.store(0, Ordering::Relaxed);
        self.bytes_written.store(0, Ordering::Relaxed);
        self.write_errors.store(0, Ordering::Relaxed);
        self.backpressure_events.store(0, Ordering::Relaxed);
        self.rejected_writes.store(0, Ordering::Relaxed);
        self.serialization_faults.store(0, Ordering::Relaxed);
        self.encoding_errors.store(0, Ordering::Relaxed);
    }
}

impl Default for SinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SinkMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            lines_written: AtomicU64::new(self.lines_written()),
            bytes_written: AtomicU64::new(self.bytes_written()),
            write_errors: AtomicU64::new(self.write_errors()),
            backpressure_events: AtomicU64::new(self.backpressure_events()),
            rejected_writes: AtomicU64::new(self.rejected_writes()),
            serialization_faults: AtomicU64::new(self.serialization_faults()),
            encoding_errors: AtomicU64::new(self.encoding_errors()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = SinkMetrics::new();
        assert_eq!(metrics.lines_written(), 0);
        assert_eq!(metrics.bytes_written(), 0);
        assert_eq!(metrics.write_errors(), 0);
        assert_eq!(metrics.backpressure_events(), 0);
        assert_eq!(metrics.rejected_writes(), 0);
    }

    #[test]
    fn test_metrics_record_write_error() {
        let metrics = SinkMetrics::new();
        assert_eq!(metrics.record_write_error(), 0); // Returns previous value
        assert_eq!(metrics.write_errors(), 1);
        metrics.record_write_error();
        assert_eq!(metrics.write_errors(), 2);
    }

    #[test]
    fn test_metrics_record_written() {
        let metrics = SinkMetrics::new();
        metrics.record_written(3, 90);
        metrics.record_written(1, 10);
        assert_eq!(metrics.lines_written(), 4);
        assert_eq!(metrics.bytes_written(), 100);
    }

    #[test]
    fn test_zero_faults_not_recorded() {
        let metrics = SinkMetrics::new();
        metrics.record_serialization_faults(0);
        metrics.record_serialization_faults(2);
        assert_eq!(metrics.serialization_faults(), 2);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = SinkMetrics::new();
        metrics.record_written(1, 1);
        metrics.record_rejected();
        metrics.record_encoding_error();

        metrics.reset();

        assert_eq!(metrics.lines_written(), 0);
        assert_eq!(metrics.rejected_writes(), 0);
        assert_eq!(metrics.encoding_errors(), 0);
    }

    #[test]
    fn test_metrics_clone() {
        let metrics = SinkMetrics::new();
        metrics.record_backpressure();
        metrics.record_written(2, 20);

        let snapshot = metrics.clone();
        assert_eq!(snapshot.backpressure_events(), 1);
        assert_eq!(snapshot.lines_written(), 2);

        // Original and clone are independent
        metrics.record_backpressure();
        assert_eq!(metrics.backpressure_events(), 2);
        assert_eq!(snapshot.backpressure_events(), 1);
    }
}
