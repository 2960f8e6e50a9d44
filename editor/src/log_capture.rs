//! Logger that forwards to `env_logger` and keeps recent warnings and
//! errors in a ring buffer.
//!
//! Operation failures are logged on whichever thread hit them and never
//! surface at the call site, so the driver inspects this buffer at the end
//! of a session.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

use crate::error::EditorResult;

/// Default number of records kept.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub timestamp: Instant,
}

/// Fixed-capacity ring buffer of captured records.
#[derive(Debug)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
    dropped: u64,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            dropped: 0,
        }
    }

    fn push(&mut self, entry: LogEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.dropped += 1;
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> &VecDeque<LogEntry> {
        &self.entries
    }

    /// Records evicted to make room for newer ones.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dropped = 0;
    }
}

/// Shared handle to the capture buffer.
pub type SharedLogBuffer = Arc<Mutex<LogBuffer>>;

/// Wraps an `env_logger` and copies records at or above `capture_level`
/// into the buffer.
pub struct LogCapture {
    inner: env_logger::Logger,
    buffer: SharedLogBuffer,
    capture_level: LevelFilter,
}

impl LogCapture {
    pub fn new(inner: env_logger::Logger, buffer: SharedLogBuffer, capture_level: LevelFilter) -> Self {
        Self {
            inner,
            buffer,
            capture_level,
        }
    }
}

impl Log for LogCapture {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata) || metadata.level() <= self.capture_level
    }

    fn log(&self, record: &Record) {
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
        if record.level() <= self.capture_level {
            self.buffer.lock().push(LogEntry {
                level: record.level(),
                target: record.target().to_owned(),
                message: record.args().to_string(),
                timestamp: Instant::now(),
            });
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Installs the capturing logger as the global logger.
///
/// `RUST_LOG` overrides the default filter (`info`, or `debug` when
/// `verbose`). Warnings and errors are always captured.
pub fn install(verbose: bool) -> EditorResult<SharedLogBuffer> {
    let default_filter = if verbose { "debug" } else { "info" };
    let inner =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
            .build();
    let max_level = inner.filter().max(LevelFilter::Warn);
    let buffer = Arc::new(Mutex::new(LogBuffer::new(DEFAULT_CAPACITY)));

    log::set_boxed_logger(Box::new(LogCapture::new(inner, buffer.clone(), LevelFilter::Warn)))?;
    log::set_max_level(max_level);
    Ok(buffer)
}
