//! Asynchronous batching writer
//!
//! [`AsyncBatchWriter`] decorates another writer. Producers append a copy of
//! each record to a queue and return immediately; one background worker per
//! writer drains the queue into the inner writer with a single `write_batch`
//! call. A drain starts when
//!
//! - the queue reaches `batch_size` records,
//! - the quiet period (`flush_timeout`, restarted by every enqueue) elapses, or
//! - the writer is flushed or closed.
//!
//! Inner writer faults surface on the worker only. They are handed to the batch
//! writer's error handler, which by default suppresses them and reports them on
//! stderr. A logger built with `batched` hands the worker its own policy.
//!
//! # Example
//!
//! ```
//! use rust_event_logger::prelude::*;
//! use std::time::Duration;
//!
//! let memory = MemoryWriter::new();
//! let batch = AsyncBatchWriter::builder(WriterHandle::concurrent(memory.clone()))
//!     .batch_size(10)
//!     .flush_timeout(Duration::ZERO)
//!     .build()
//!     .unwrap();
//!
//! let record = EventRecord::new(Severity::Information, "queued");
//! for _ in 0..3 {
//!     batch.write(&record).unwrap();
//! }
//! assert!(memory.is_empty());
//!
//! batch.close().unwrap(); // drains the partial batch
//! assert_eq!(memory.len(), 3);
//! ```

use crate::core::config::{BatchConfig, DEFAULT_BATCH_SIZE, DEFAULT_FLUSH_TIMEOUT, DEFAULT_SHUTDOWN_TIMEOUT};
use crate::core::{
    ConcurrentWriter, ErrorHandler, ErrorPolicy, EventRecord, LoggerError, Result, WriterHandle,
};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Counters for a batch writer
#[derive(Debug, Default)]
pub struct BatchMetrics {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    batches: AtomicU64,
}

impl BatchMetrics {
    /// Records accepted by `write`
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Records the inner writer accepted
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Records in batches the inner writer rejected
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Drains handed to the inner writer
    pub fn batches(&self) -> u64 {
        self.batches.load(Ordering::Relaxed)
    }
}

/// Queue state guarded by the shared mutex
///
/// `queue[..queued]` holds pending records; slots past `queued` are cleared
/// records kept for reuse.
struct BatchState {
    queue: Vec<EventRecord>,
    queued: usize,
    deadline: Option<Instant>,
    drain_requested: bool,
    draining: bool,
    shutdown: bool,
    worker_alive: bool,
}

struct BatchShared {
    inner: WriterHandle,
    state: Mutex<BatchState>,
    wake: Condvar,
    drained: Condvar,
    batch_size: usize,
    flush_timeout: Duration,
    error_handler: Arc<dyn ErrorHandler>,
    metrics: BatchMetrics,
}

impl BatchShared {
    fn enqueue(&self, record: &EventRecord) -> Result<()> {
        let mut state = self.state.lock();
        if state.shutdown {
            return Err(LoggerError::LoggerStopped);
        }

        let slot = state.queued;
        if slot < state.queue.len() {
            state.queue[slot].copy_from(record);
        } else {
            state.queue.push(record.clone());
        }
        state.queued += 1;
        self.metrics.enqueued.fetch_add(1, Ordering::Relaxed);

        if state.queued >= self.batch_size {
            state.drain_requested = true;
            self.wake.notify_one();
        } else if !self.flush_timeout.is_zero() {
            let idle = state.deadline.is_none();
            state.deadline = Some(Instant::now() + self.flush_timeout);
            if idle {
                self.wake.notify_one();
            }
        }
        Ok(())
    }

    /// Body of the background worker
    fn run(&self) {
        let _exit = WorkerExit(self);
        let mut buffer: Vec<EventRecord> = Vec::with_capacity(self.batch_size);
        loop {
            let mut state = self.state.lock();
            loop {
                if state.shutdown || state.drain_requested {
                    break;
                }
                match state.deadline {
                    Some(deadline) if Instant::now() >= deadline => break,
                    Some(deadline) => {
                        self.wake.wait_until(&mut state, deadline);
                    }
                    None => self.wake.wait(&mut state),
                }
            }

            std::mem::swap(&mut state.queue, &mut buffer);
            let count = std::mem::take(&mut state.queued);
            state.deadline = None;
            state.drain_requested = false;
            state.draining = count > 0;
            let shutting_down = state.shutdown;
            drop(state);

            if count > 0 {
                self.deliver(&buffer[..count]);
                for record in &mut buffer[..count] {
                    record.clear();
                }
            }

            let mut state = self.state.lock();
            state.draining = false;
            if shutting_down && state.queued == 0 {
                break;
            }
            self.drained.notify_all();
        }
    }

    fn deliver(&self, records: &[EventRecord]) {
        self.metrics.batches.fetch_add(1, Ordering::Relaxed);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.inner.write_batch(records)
        }));

        let fault = match result {
            Ok(Ok(())) => {
                self.metrics
                    .delivered
                    .fetch_add(records.len() as u64, Ordering::Relaxed);
                return;
            }
            Ok(Err(e)) => e,
            Err(panic_info) => LoggerError::writer(
                self.inner.name(),
                LoggerError::panicked("batch delivery", panic_info),
            ),
        };

        self.metrics
            .failed
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        // Verdict is ignored; no producer waits on it
        let handler = &self.error_handler;
        if let Err(panic_info) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            handler.report_error(&fault)
        })) {
            eprintln!(
                "[LOGGER CRITICAL] {}. Suppressing: {}",
                LoggerError::panicked("error handler", panic_info),
                fault
            );
        }
    }

    /// Block until nothing is queued or being delivered
    fn wait_drained(&self) {
        let mut state = self.state.lock();
        while state.queued > 0 || state.draining {
            if !state.worker_alive {
                break;
            }
            state.drain_requested = true;
            self.wake.notify_one();
            self.drained.wait(&mut state);
        }
    }
}

/// Marks the worker gone on every exit path, waking blocked flushers
struct WorkerExit<'a>(&'a BatchShared);

impl Drop for WorkerExit<'_> {
    fn drop(&mut self) {
        let mut state = self.0.state.lock();
        state.worker_alive = false;
        state.draining = false;
        self.0.drained.notify_all();
    }
}

/// Decorator that delivers records to an inner writer in batches
///
/// Thread-safe: wrap it with [`WriterHandle::concurrent`] or
/// [`WriterHandle::shared`]. Dropping the writer closes it.
pub struct AsyncBatchWriter {
    name: String,
    shared: Arc<BatchShared>,
    worker: Mutex<Option<thread::JoinHandle<()>>>,
    shutdown_timeout: Duration,
}

impl AsyncBatchWriter {
    pub fn builder(inner: WriterHandle) -> AsyncBatchWriterBuilder {
        AsyncBatchWriterBuilder::new(inner)
    }

    /// Build a batch writer from a [`BatchConfig`]
    pub fn from_config(inner: WriterHandle, config: &BatchConfig) -> Result<Self> {
        Self::builder(inner)
            .batch_size(config.batch_size)
            .flush_timeout(config.flush_timeout())
            .shutdown_timeout(config.shutdown_timeout())
            .build()
    }

    pub fn batch_size(&self) -> usize {
        self.shared.batch_size
    }

    pub fn flush_timeout(&self) -> Duration {
        self.shared.flush_timeout
    }

    /// Number of records waiting for the worker
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queued
    }

    pub fn metrics(&self) -> &BatchMetrics {
        &self.shared.metrics
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().shutdown
    }

    /// Stop the worker after its final drain, waiting at most `timeout`
    ///
    /// Returns `true` if the worker finished in time. The inner writer is
    /// closed only in that case.
    pub fn shutdown(&self, timeout: Duration) -> Result<bool> {
        {
            let mut state = self.shared.state.lock();
            if state.shutdown {
                return Ok(true);
            }
            state.shutdown = true;
            self.shared.wake.notify_all();
        }

        if let Some(handle) = self.worker.lock().take() {
            let start = Instant::now();
            loop {
                if handle.is_finished() {
                    if let Err(e) = handle.join() {
                        eprintln!(
                            "[LOGGER ERROR] Batch worker for '{}' panicked during shutdown: {:?}",
                            self.name, e
                        );
                    }
                    break;
                }

                if start.elapsed() >= timeout {
                    eprintln!(
                        "[LOGGER WARNING] Batch worker for '{}' did not finish within {:?}. \
                         {} queued records may be lost.",
                        self.name,
                        timeout,
                        self.pending()
                    );
                    return Ok(false);
                }

                thread::sleep(Duration::from_millis(1));
            }
        }

        self.shared.inner.close()?;
        Ok(true)
    }
}

impl ConcurrentWriter for AsyncBatchWriter {
    fn write(&self, record: &EventRecord) -> Result<()> {
        self.shared.enqueue(record)
    }

    fn write_batch(&self, records: &[EventRecord]) -> Result<()> {
        for record in records {
            self.shared.enqueue(record)?;
        }
        Ok(())
    }

    /// Drain everything queued so far, then flush the inner writer
    fn flush(&self) -> Result<()> {
        self.shared.wait_drained();
        self.shared.inner.flush()
    }

    fn close(&self) -> Result<()> {
        if self.shutdown(self.shutdown_timeout)? {
            Ok(())
        } else {
            Err(LoggerError::other(format!(
                "batch worker for '{}' did not finish within {:?}",
                self.name, self.shutdown_timeout
            )))
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for AsyncBatchWriter {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown(self.shutdown_timeout) {
            eprintln!("[LOGGER ERROR] Failed to close '{}' during drop: {}", self.name, e);
        }
    }
}

impl fmt::Debug for AsyncBatchWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncBatchWriter")
            .field("name", &self.name)
            .field("inner", &self.shared.inner)
            .field("batch_size", &self.shared.batch_size)
            .field("flush_timeout", &self.shared.flush_timeout)
            .field("pending", &self.pending())
            .finish()
    }
}

/// Builder for [`AsyncBatchWriter`]
pub struct AsyncBatchWriterBuilder {
    inner: WriterHandle,
    name: Option<String>,
    batch_size: usize,
    flush_timeout: Duration,
    shutdown_timeout: Duration,
    error_handler: Arc<dyn ErrorHandler>,
}

impl AsyncBatchWriterBuilder {
    fn new(inner: WriterHandle) -> Self {
        Self {
            inner,
            name: None,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            error_handler: Arc::new(ErrorPolicy::suppress()),
        }
    }

    /// Name reported by the writer; defaults to `batch(<inner name>)`
    #[must_use = "builder methods return a new value"]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Quiet period after the last enqueue; `Duration::ZERO` disables the timer
    #[must_use = "builder methods return a new value"]
    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout = timeout;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Handler receiving inner writer faults raised on the worker
    #[must_use = "builder methods return a new value"]
    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Share an existing handler, typically the owning logger's policy
    #[must_use = "builder methods return a new value"]
    pub fn shared_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = handler;
        self
    }

    pub fn build(self) -> Result<AsyncBatchWriter> {
        if self.batch_size == 0 {
            return Err(LoggerError::config("batch_writer", "batch size must be greater than zero"));
        }

        let name = self
            .name
            .unwrap_or_else(|| format!("batch({})", self.inner.name()));

        let shared = Arc::new(BatchShared {
            inner: self.inner,
            state: Mutex::new(BatchState {
                queue: Vec::with_capacity(self.batch_size),
                queued: 0,
                deadline: None,
                drain_requested: false,
                draining: false,
                shutdown: false,
                worker_alive: true,
            }),
            wake: Condvar::new(),
            drained: Condvar::new(),
            batch_size: self.batch_size,
            flush_timeout: self.flush_timeout,
            error_handler: self.error_handler,
            metrics: BatchMetrics::default(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("event-batch-writer".to_string())
            .spawn(move || worker_shared.run())?;

        Ok(AsyncBatchWriter {
            name,
            shared,
            worker: Mutex::new(Some(handle)),
            shutdown_timeout: self.shutdown_timeout,
        })
    }
}
