//! Stress tests for concurrent logging
//!
//! These tests verify:
//! - Lines written from many threads never interleave
//! - The async worker delivers every accepted line before finalize returns
//! - Finalize racing with writers never loses or splits an accepted line
//! - Thread safety of level changes during heavy logging

use rust_structured_logger::core::{LoggerError, SinkMode, SinkState};
use rust_structured_logger::destinations::{FileDestination, MemoryDestination, MemoryHandle};
use rust_structured_logger::prelude::*;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

const THREADS: usize = 8;
const PER_THREAD: usize = 500;

fn memory_logger(mode: SinkMode) -> (Logger, MemoryHandle) {
    let memory = MemoryDestination::new();
    let handle = memory.handle();
    let logger = Logger::builder()
        .destination(memory)
        .buffer_mode(mode)
        .level("trace")
        .build()
        .expect("Failed to build logger");
    (logger, handle)
}

fn hammer(logger: &Logger, threads: usize, per_thread: usize) {
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let logger = logger.child(fields! { "thread" => t }).unwrap();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..per_thread {
                    // A long payload makes torn writes visible.
                    logger.info(log_args!(
                        { "seq" => i, "payload" => "x".repeat(200) },
                        "thread %d line %d",
                        t,
                        i
                    ));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("logging thread panicked");
    }
}

fn assert_complete(output: &MemoryHandle, threads: usize, per_thread: usize) {
    let lines = output.json_lines().expect("every line must be valid JSON");
    assert_eq!(lines.len(), threads * per_thread);

    let seen: HashSet<(u64, u64)> = lines
        .iter()
        .map(|line| {
            (
                line["thread"].as_u64().unwrap(),
                line["seq"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(seen.len(), threads * per_thread, "duplicate lines");
}

#[test]
fn test_concurrent_sync_writes_stay_whole() {
    let (logger, output) = memory_logger(SinkMode::Sync);
    hammer(&logger, THREADS, PER_THREAD);
    assert_complete(&output, THREADS, PER_THREAD);
}

#[test]
fn test_concurrent_buffered_writes_stay_whole() {
    let (logger, output) = memory_logger(SinkMode::Buffered { min_length: 8192 });
    hammer(&logger, THREADS, PER_THREAD);
    logger.flush().unwrap();
    assert_complete(&output, THREADS, PER_THREAD);
}

#[test]
fn test_concurrent_async_writes_are_all_delivered() {
    let (logger, output) = memory_logger(SinkMode::Async { queue_capacity: 32 });
    hammer(&logger, THREADS, PER_THREAD);
    assert!(logger.finalize());

    assert_complete(&output, THREADS, PER_THREAD);
    assert_eq!(logger.metrics().lines_written(), (THREADS * PER_THREAD) as u64);
    assert_eq!(logger.metrics().write_errors(), 0);
}

#[test]
fn test_per_thread_order_is_preserved() {
    let (logger, output) = memory_logger(SinkMode::Async { queue_capacity: 16 });
    hammer(&logger, 4, 200);
    logger.flush().unwrap();

    let mut last = vec![None::<u64>; 4];
    for line in output.json_lines().unwrap() {
        let t = line["thread"].as_u64().unwrap() as usize;
        let seq = line["seq"].as_u64().unwrap();
        if let Some(prev) = last[t] {
            assert!(seq > prev, "thread {} went from {} to {}", t, prev, seq);
        }
        last[t] = Some(seq);
    }
}

#[test]
fn test_finalize_racing_with_writers() {
    let (logger, output) = memory_logger(SinkMode::Async { queue_capacity: 8 });
    let accepted = Arc::new(AtomicUsize::new(0));
    let rejected = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = logger.clone();
            let accepted = Arc::clone(&accepted);
            let rejected = Arc::clone(&rejected);
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    match logger.try_log("info", log_args!("t%d i%d", t, i)) {
                        Ok(_) => {
                            accepted.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(LoggerError::SinkClosed) => {
                            rejected.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => panic!("unexpected error: {}", e),
                    }
                }
            })
        })
        .collect();

    thread::sleep(std::time::Duration::from_millis(5));
    logger.finalize();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(logger.sink().state(), SinkState::Closed);
    assert_eq!(
        accepted.load(Ordering::Relaxed) + rejected.load(Ordering::Relaxed),
        THREADS * PER_THREAD
    );
    // Every accepted line reached the destination intact.
    assert_eq!(output.json_lines().unwrap().len(), accepted.load(Ordering::Relaxed));
    assert_eq!(
        logger.metrics().rejected_writes(),
        rejected.load(Ordering::Relaxed) as u64
    );
}

#[test]
fn test_level_changes_during_logging() {
    let (logger, output) = memory_logger(SinkMode::Sync);
    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    logger.on_level_change(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    let writer = {
        let logger = logger.clone();
        thread::spawn(move || {
            for i in 0..2000 {
                logger.debug(log_args!("debug %d", i));
                logger.error(log_args!("error %d", i));
            }
        })
    };

    for i in 0..200 {
        let level = if i % 2 == 0 { "error" } else { "debug" };
        logger.set_level(level).unwrap();
    }
    writer.join().unwrap();

    assert_eq!(changes.load(Ordering::Relaxed), 200);
    let lines = output.json_lines().unwrap();
    let errors = lines.iter().filter(|l| l["level"] == 50).count();
    assert_eq!(errors, 2000);
}

#[test]
fn test_concurrent_file_logging() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("concurrent.log");

    {
        let logger = Logger::builder()
            .destination(FileDestination::new(&log_file).expect("Failed to open log file"))
            .buffer_mode(SinkMode::Async { queue_capacity: 128 })
            .build()
            .unwrap();
        hammer(&logger, 4, 250);
    }

    let content = std::fs::read_to_string(&log_file).expect("Failed to read log file");
    let mut count = 0;
    for line in content.lines() {
        let value: serde_json::Value = serde_json::from_str(line).expect("torn line");
        assert_eq!(value["payload"].as_str().map(str::len), Some(200));
        count += 1;
    }
    assert_eq!(count, 1000);
}
